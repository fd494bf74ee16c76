//! Automation coordinator — decides, per actionable prediction, whether a
//! command is issued, and issues it with retries.
//!
//! Decisions for the same device are serialized: the device's ledger lock is
//! held from the first check until the command has completed, so two
//! predictions racing for one device can never both pass the cooldown check.
//! Different devices proceed independently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Deserialize;

use lightsout_domain::decision::{AutomationDecision, CommandOutcome, Verdict};
use lightsout_domain::error::SinkError;
use lightsout_domain::id::DeviceId;
use lightsout_domain::prediction::{Action, Prediction, Urgency};
use lightsout_domain::time::{Timestamp, saturating_add};

use crate::automation_log::AutomationLog;
use crate::detector::seconds;
use crate::ports::{CommandSink, Notification, NotificationPublisher};
use crate::retry::{Clock, RetryPolicy};
use crate::state_cache::DeviceStateCache;

/// Safety settings for automatic execution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutomationPolicy {
    /// Master switch. When off, every prediction is recorded but none executed.
    pub enabled: bool,
    /// Decide normally but never call the sink.
    pub dry_run: bool,
    /// Minimum delay between two commands to the same device.
    pub cooldown_secs: u64,
    /// Upper bound on a single sink call.
    pub command_timeout_ms: u64,
    pub retry: RetryPolicy,
    /// How many decisions the in-memory log keeps.
    pub log_capacity: usize,
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            dry_run: true,
            cooldown_secs: 300,
            command_timeout_ms: 5_000,
            retry: RetryPolicy::default(),
            log_capacity: 500,
        }
    }
}

#[derive(Debug, Default)]
struct DeviceLedger {
    last_issued: Option<Timestamp>,
}

/// Applies the automation policy to predictions.
pub struct AutomationCoordinator<S, C, P> {
    sink: S,
    clock: C,
    publisher: P,
    policy: AutomationPolicy,
    states: Arc<DeviceStateCache>,
    log: Arc<AutomationLog>,
    ledgers: Mutex<HashMap<DeviceId, Arc<tokio::sync::Mutex<DeviceLedger>>>>,
    shutting_down: AtomicBool,
}

impl<S, C, P> AutomationCoordinator<S, C, P>
where
    S: CommandSink + Send + Sync,
    C: Clock + Send + Sync,
    P: NotificationPublisher + Send + Sync,
{
    pub fn new(
        sink: S,
        clock: C,
        publisher: P,
        policy: AutomationPolicy,
        states: Arc<DeviceStateCache>,
        log: Arc<AutomationLog>,
    ) -> Self {
        Self {
            sink,
            clock,
            publisher,
            policy,
            states,
            log,
            ledgers: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &AutomationPolicy {
        &self.policy
    }

    pub fn log(&self) -> &Arc<AutomationLog> {
        &self.log
    }

    /// Stop retrying and refuse new predictions. In-flight attempts finish.
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Submit predictions in order, returning one decision per prediction
    /// that was considered.
    pub async fn submit_all(&self, predictions: &[Prediction]) -> Vec<AutomationDecision> {
        let mut decisions = Vec::new();
        for prediction in predictions {
            if let Some(decision) = self.submit(prediction.clone()).await {
                decisions.push(decision);
            }
        }
        decisions
    }

    /// Decide on one prediction.
    ///
    /// Returns `None` when the prediction is not actionable, already past its
    /// deadline, or the coordinator is shutting down.
    #[tracing::instrument(skip_all, fields(action = %prediction.action))]
    pub async fn submit(&self, prediction: Prediction) -> Option<AutomationDecision> {
        if !prediction.is_actionable() {
            return None;
        }
        if self.is_shutting_down() {
            tracing::debug!("shutting down, prediction ignored");
            return None;
        }
        if let Urgency::Before { deadline } = prediction.urgency
            && self.clock.now() > deadline
        {
            tracing::debug!(%deadline, "prediction expired");
            return None;
        }

        let ledger = self.ledger(&prediction.action.device_id);
        let mut ledger = ledger.lock().await;
        let decision = self.decide(prediction, &mut ledger).await;
        drop(ledger);

        self.record(&decision).await;
        Some(decision)
    }

    fn ledger(&self, device_id: &DeviceId) -> Arc<tokio::sync::Mutex<DeviceLedger>> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(ledgers.entry(device_id.clone()).or_default())
    }

    async fn decide(&self, prediction: Prediction, ledger: &mut DeviceLedger) -> AutomationDecision {
        let now = self.clock.now();
        let action = &prediction.action;

        if !self.policy.enabled {
            return AutomationDecision::skipped(prediction, Verdict::SkippedDryRun, now)
                .with_detail("automation disabled");
        }
        let Some(current) = self.states.current(&action.device_id, &action.attribute) else {
            return AutomationDecision::skipped(prediction, Verdict::SkippedUnreachable, now)
                .with_detail("state unknown until the next poll");
        };
        if current == action.value {
            return AutomationDecision::skipped(prediction, Verdict::SkippedAlreadyInState, now);
        }
        if self.states.is_unreachable(&action.device_id) {
            return AutomationDecision::skipped(prediction, Verdict::SkippedUnreachable, now);
        }
        if let Some(last) = ledger.last_issued {
            let until = saturating_add(last, seconds(self.policy.cooldown_secs));
            if now < until {
                return AutomationDecision::skipped(prediction, Verdict::SkippedCooldown, now)
                    .with_detail(format!("cooling down until {until}"));
            }
        }
        if self.policy.dry_run {
            ledger.last_issued = Some(now);
            return AutomationDecision::skipped(prediction, Verdict::SkippedDryRun, now)
                .with_detail("dry run");
        }

        let result = self.issue(action).await;
        let decided_at = self.clock.now();
        match result {
            Ok(attempts) => {
                ledger.last_issued = Some(decided_at);
                let outcome = CommandOutcome {
                    attempts,
                    error: None,
                };
                AutomationDecision::issued(prediction, Verdict::Executed, outcome, decided_at)
            }
            Err((attempts, err)) => {
                // a rejection proves the bridge answered
                if err.is_retryable() {
                    self.states.mark_unreachable(action.device_id.clone());
                }
                let outcome = CommandOutcome {
                    attempts,
                    error: Some(err.to_string()),
                };
                AutomationDecision::issued(prediction, Verdict::Failed, outcome, decided_at)
            }
        }
    }

    /// Call the sink, retrying retryable failures with backoff.
    ///
    /// Returns the number of attempts made, along with the last error on
    /// failure.
    async fn issue(&self, action: &Action) -> Result<u32, (u32, SinkError)> {
        let max_attempts = self.policy.retry.attempts();
        let timeout = Duration::from_millis(self.policy.command_timeout_ms);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(timeout, self.sink.execute(action)).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Timeout {
                    millis: self.policy.command_timeout_ms,
                }),
            };
            let Err(err) = result else {
                return Ok(attempt);
            };
            tracing::warn!(attempt, error = %err, "command failed");
            if !err.is_retryable() || attempt >= max_attempts || self.is_shutting_down() {
                return Err((attempt, err));
            }
            self.clock.sleep(self.policy.retry.backoff(attempt)).await;
            attempt += 1;
        }
    }

    async fn record(&self, decision: &AutomationDecision) {
        match decision.verdict {
            Verdict::Executed => tracing::info!(
                action = %decision.prediction.action,
                confidence = decision.prediction.confidence,
                "automation executed"
            ),
            Verdict::Failed => tracing::warn!(
                action = %decision.prediction.action,
                error = ?decision.outcome.as_ref().and_then(|o| o.error.as_deref()),
                "automation failed"
            ),
            verdict => tracing::debug!(
                action = %decision.prediction.action,
                %verdict,
                "automation skipped"
            ),
        }
        self.log.push(decision.clone());
        if let Err(err) = self
            .publisher
            .publish(Notification::DecisionRecorded {
                decision: decision.clone(),
            })
            .await
        {
            tracing::warn!(error = %err, "failed to publish decision");
        }
    }
}
