//! Bounded in-memory history of automation decisions.

use std::collections::VecDeque;
use std::sync::Mutex;

use lightsout_domain::decision::AutomationDecision;

/// Ring buffer of the most recent decisions; the oldest fall off first.
#[derive(Debug)]
pub struct AutomationLog {
    capacity: usize,
    entries: Mutex<VecDeque<AutomationDecision>>,
}

impl AutomationLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, decision: AutomationDecision) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(decision);
    }

    /// Up to `limit` decisions, newest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<AutomationDecision> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.iter().rev().take(limit).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightsout_domain::decision::Verdict;
    use lightsout_domain::id::{DeviceId, PatternId};
    use lightsout_domain::pattern::PatternKind;
    use lightsout_domain::prediction::{Action, Prediction, Urgency};
    use lightsout_domain::state::Transition;
    use lightsout_domain::time::now;

    fn decision(device: &str) -> AutomationDecision {
        let prediction = Prediction {
            pattern_id: PatternId::derive(device),
            kind: PatternKind::TimeBased,
            action: Action::reach(DeviceId::new(device), &Transition::turned_on()),
            urgency: Urgency::Now,
            confidence: 0.9,
            actionable: true,
            reason: String::new(),
        };
        AutomationDecision::skipped(prediction, Verdict::SkippedDryRun, now())
    }

    #[test]
    fn should_return_newest_first() {
        let log = AutomationLog::new(10);
        log.push(decision("a"));
        log.push(decision("b"));
        let recent = log.recent(10);
        assert_eq!(recent[0].prediction.action.device_id.as_str(), "b");
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn should_drop_oldest_when_full() {
        let log = AutomationLog::new(2);
        for device in ["a", "b", "c"] {
            log.push(decision(device));
        }
        let devices: Vec<String> = log
            .recent(5)
            .into_iter()
            .map(|d| d.prediction.action.device_id.to_string())
            .collect();
        assert_eq!(devices, vec!["c", "b"]);
    }
}
