//! In-memory fakes of every port, shared by the unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use lightsout_domain::error::{LightsOutError, SinkError};
use lightsout_domain::event::{StateChange, StateChangeEvent};
use lightsout_domain::pattern::Pattern;
use lightsout_domain::prediction::Action;
use lightsout_domain::state::StateSnapshot;
use lightsout_domain::time::{TimeWindow, Timestamp};

use crate::ports::{
    CommandSink, EventStore, Notification, NotificationPublisher, PatternCache, PollSource,
};
use crate::retry::Clock;

fn storage_error(message: &str) -> LightsOutError {
    LightsOutError::Storage(Box::new(std::io::Error::other(message.to_string())))
}

#[derive(Default)]
pub(crate) struct InMemoryEventStore {
    events: Mutex<Vec<StateChangeEvent>>,
    pub(crate) failing: AtomicBool,
}

impl InMemoryEventStore {
    pub(crate) fn all(&self) -> Vec<StateChangeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Store events verbatim, bypassing sequence assignment.
    pub(crate) fn seed(&self, events: Vec<StateChangeEvent>) {
        self.events.lock().unwrap().extend(events);
    }
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        changes: Vec<StateChange>,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(storage_error("disk full"))
        } else {
            let mut events = self.events.lock().unwrap();
            let mut next = events.last().map_or(1, |e| e.sequence + 1);
            let stored: Vec<StateChangeEvent> = changes
                .into_iter()
                .map(|change| {
                    let event = change.into_event(next);
                    next += 1;
                    event
                })
                .collect();
            events.extend(stored.iter().cloned());
            Ok(stored)
        };
        async move { result }
    }

    fn query(
        &self,
        window: TimeWindow,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(storage_error("disk gone"))
        } else {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| window.contains(e.timestamp))
                .cloned()
                .collect())
        };
        async move { result }
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        let events: Vec<StateChangeEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect();
        async move { Ok(events) }
    }

    fn purge_before(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, LightsOutError>> + Send {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.timestamp >= cutoff);
        let removed = (before - events.len()) as u64;
        async move { Ok(removed) }
    }

    fn count(&self) -> impl Future<Output = Result<u64, LightsOutError>> + Send {
        let count = self.events.lock().unwrap().len() as u64;
        async move { Ok(count) }
    }
}

#[derive(Default)]
pub(crate) struct InMemoryPatternCache {
    pub(crate) patterns: Mutex<Vec<Pattern>>,
    pub(crate) saves: AtomicUsize,
}

impl PatternCache for InMemoryPatternCache {
    fn load(&self) -> impl Future<Output = Result<Vec<Pattern>, LightsOutError>> + Send {
        let patterns = self.patterns.lock().unwrap().clone();
        async move { Ok(patterns) }
    }

    fn save(
        &self,
        patterns: Vec<Pattern>,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send {
        *self.patterns.lock().unwrap() = patterns;
        self.saves.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    }
}

/// Poll source replaying a script of snapshots; repeats the last one forever.
#[derive(Default)]
pub(crate) struct ScriptedPollSource {
    script: Mutex<VecDeque<Result<StateSnapshot, String>>>,
    last: Mutex<StateSnapshot>,
}

impl ScriptedPollSource {
    pub(crate) fn push(&self, snapshot: StateSnapshot) {
        self.script.lock().unwrap().push_back(Ok(snapshot));
    }

    pub(crate) fn push_error(&self, message: &str) {
        self.script.lock().unwrap().push_back(Err(message.to_string()));
    }
}

impl PollSource for ScriptedPollSource {
    fn poll(&self) -> impl Future<Output = Result<StateSnapshot, LightsOutError>> + Send {
        let result = match self.script.lock().unwrap().pop_front() {
            Some(Ok(snapshot)) => {
                *self.last.lock().unwrap() = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(message)) => Err(LightsOutError::Poll(Box::new(std::io::Error::other(
                message,
            )))),
            None => Ok(self.last.lock().unwrap().clone()),
        };
        async move { result }
    }
}

/// Command sink recording every call, answering from a script (default `Ok`).
#[derive(Default)]
pub(crate) struct FakeSink {
    calls: Mutex<Vec<Action>>,
    script: Mutex<VecDeque<Result<(), SinkError>>>,
    pub(crate) delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSink {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn answer(&self, result: Result<(), SinkError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<Action> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CommandSink for FakeSink {
    fn execute(&self, action: &Action) -> impl Future<Output = Result<(), SinkError>> + Send {
        let action = action.clone();
        async move {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(action);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }
}

/// Clock that only moves when told to (or when something sleeps on it).
pub(crate) struct ManualClock {
    now: Mutex<Timestamp>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(crate) fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        *self.now.lock().unwrap() += by;
    }

    pub(crate) fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        self.slept.lock().unwrap().push(duration);
        self.advance(chrono::Duration::from_std(duration).unwrap());
        async {}
    }
}

#[derive(Default)]
pub(crate) struct SpyPublisher {
    pub(crate) published: Mutex<Vec<Notification>>,
}

impl SpyPublisher {
    pub(crate) fn published(&self) -> Vec<Notification> {
        self.published.lock().unwrap().clone()
    }
}

impl NotificationPublisher for SpyPublisher {
    fn publish(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send {
        self.published.lock().unwrap().push(notification);
        async { Ok(()) }
    }
}
