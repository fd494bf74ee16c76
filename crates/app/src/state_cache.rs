//! Device state cache — the last polled value of every attribute, plus the
//! set of devices that stopped answering commands.

use std::collections::BTreeSet;
use std::sync::RwLock;

use lightsout_domain::event::StateChange;
use lightsout_domain::id::DeviceId;
use lightsout_domain::state::{AttributeValue, StateSnapshot};
use lightsout_domain::time::Timestamp;

#[derive(Debug, Default)]
struct Inner {
    snapshot: StateSnapshot,
    unreachable: BTreeSet<DeviceId>,
    last_recorded: Option<Timestamp>,
}

/// Shared, thread-safe view of the household's current state.
#[derive(Debug, Default)]
pub struct DeviceStateCache {
    inner: RwLock<Inner>,
}

impl DeviceStateCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Changes between the cached state and `polled`. Never seen devices or
    /// attributes produce nothing.
    #[must_use]
    pub fn diff(&self, polled: &StateSnapshot, at: Timestamp) -> Vec<StateChange> {
        self.read().snapshot.changes_to(polled, at)
    }

    /// Fold a poll into the cache. Every device present is reachable again.
    pub fn commit(&self, polled: &StateSnapshot) {
        let mut inner = self.write();
        inner.snapshot.merge(polled);
        for device_id in polled.devices() {
            inner.unreachable.remove(device_id);
        }
    }

    /// Timestamp for changes observed at `at`. Never earlier than the last
    /// recorded one, so the event log stays ordered when the wall clock steps
    /// back.
    #[must_use]
    pub fn stamp(&self, at: Timestamp) -> Timestamp {
        self.read().last_recorded.map_or(at, |last| last.max(at))
    }

    /// Remember that events up to `at` were stored.
    pub fn record_stamp(&self, at: Timestamp) {
        let mut inner = self.write();
        if inner.last_recorded.is_none_or(|last| last < at) {
            inner.last_recorded = Some(at);
        }
    }

    #[must_use]
    pub fn last_recorded(&self) -> Option<Timestamp> {
        self.read().last_recorded
    }

    /// Copy of the whole cached state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        self.read().snapshot.clone()
    }

    #[must_use]
    pub fn current(&self, device_id: &DeviceId, attribute: &str) -> Option<AttributeValue> {
        self.read().snapshot.get(device_id, attribute).cloned()
    }

    pub fn mark_unreachable(&self, device_id: DeviceId) {
        self.write().unreachable.insert(device_id);
    }

    #[must_use]
    pub fn is_unreachable(&self, device_id: &DeviceId) -> bool {
        self.read().unreachable.contains(device_id)
    }

    #[must_use]
    pub fn unreachable(&self) -> Vec<DeviceId> {
        self.read().unreachable.iter().cloned().collect()
    }
}
