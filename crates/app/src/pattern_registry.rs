//! Pattern registry — the single, atomically replaced set of active patterns.
//!
//! Readers take an [`Arc<PatternSet>`] snapshot and keep using it for as long
//! as they like; a detection run publishing a new set never disturbs them.
//! Subscribers of [`PatternRegistry::subscribe`] wake up on every swap.

use std::sync::Arc;

use tokio::sync::watch;

use lightsout_domain::id::PatternId;
use lightsout_domain::pattern::Pattern;
use lightsout_domain::time::Timestamp;

/// An immutable, versioned collection of patterns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternSet {
    /// Starts at `0` (empty registry) and grows by one per swap.
    pub version: u64,
    /// Time of the detection run (or cache restore) that produced the set.
    pub generated_at: Option<Timestamp>,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Patterns sorted by descending confidence, then id.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    #[must_use]
    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Holder of the current [`PatternSet`].
#[derive(Debug)]
pub struct PatternRegistry {
    sender: watch::Sender<Arc<PatternSet>>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRegistry {
    /// An empty registry at version `0`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sender: watch::Sender::new(Arc::new(PatternSet::default())),
        }
    }

    /// The current set. Cheap: clones an [`Arc`].
    #[must_use]
    pub fn snapshot(&self) -> Arc<PatternSet> {
        Arc::clone(&self.sender.borrow())
    }

    /// Replace the whole set in one step and return the new snapshot.
    pub fn replace(&self, mut patterns: Vec<Pattern>, generated_at: Timestamp) -> Arc<PatternSet> {
        patterns.sort_by(Pattern::rank);
        let mut published = None;
        self.sender.send_modify(|current| {
            let next = Arc::new(PatternSet {
                version: current.version + 1,
                generated_at: Some(generated_at),
                patterns,
            });
            published = Some(Arc::clone(&next));
            *current = next;
        });
        published.unwrap_or_else(|| self.snapshot())
    }

    /// Receive every future swap.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<PatternSet>> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightsout_domain::id::DeviceId;
    use lightsout_domain::pattern::{PatternParams, TimeBasedParams, WeekdayClass};
    use lightsout_domain::state::Transition;
    use lightsout_domain::time::now;

    fn pattern(device: &str, confidence: f64) -> Pattern {
        let ts = now();
        Pattern::new(
            PatternParams::TimeBased(TimeBasedParams {
                device_id: DeviceId::new(device),
                transition: Transition::turned_on(),
                weekday_class: WeekdayClass::Weekdays,
                mean_minute: 420.0,
                dispersion_minutes: 2.0,
            }),
            confidence,
            5,
            ts,
            ts,
        )
        .unwrap()
    }

    #[test]
    fn should_start_empty_at_version_zero() {
        let registry = PatternRegistry::new();
        let set = registry.snapshot();
        assert_eq!(set.version, 0);
        assert!(set.is_empty());
        assert!(set.generated_at.is_none());
    }

    #[test]
    fn should_bump_version_and_sort_on_replace() {
        let registry = PatternRegistry::new();
        let set = registry.replace(vec![pattern("a", 0.6), pattern("b", 0.9)], now());
        assert_eq!(set.version, 1);
        assert_eq!(set.patterns()[0].confidence, 0.9);
        assert_eq!(registry.snapshot().version, 1);

        let set = registry.replace(Vec::new(), now());
        assert_eq!(set.version, 2);
        assert!(set.is_empty());
    }

    #[test]
    fn should_leave_old_snapshots_untouched() {
        let registry = PatternRegistry::new();
        registry.replace(vec![pattern("a", 0.7)], now());
        let held = registry.snapshot();
        registry.replace(vec![pattern("b", 0.8), pattern("c", 0.9)], now());

        assert_eq!(held.version, 1);
        assert_eq!(held.len(), 1);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn should_find_pattern_by_id() {
        let registry = PatternRegistry::new();
        let p = pattern("a", 0.7);
        let id = p.id;
        let set = registry.replace(vec![p], now());
        assert!(set.get(id).is_some());
    }

    #[tokio::test]
    async fn should_notify_subscribers_on_swap() {
        let registry = PatternRegistry::new();
        let mut rx = registry.subscribe();
        registry.replace(vec![pattern("a", 0.7)], now());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().version, 1);
    }

    #[test]
    fn should_never_expose_partial_sets_to_concurrent_readers() {
        let registry = Arc::new(PatternRegistry::new());
        let reader = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    let set = registry.snapshot();
                    // every published set has exactly `version` patterns
                    assert_eq!(set.len() as u64, set.version);
                }
            })
        };
        for n in 1..=50 {
            let patterns = (0..n).map(|i| pattern(&format!("d{i}"), 0.7)).collect();
            registry.replace(patterns, now());
        }
        reader.join().unwrap();
    }
}
