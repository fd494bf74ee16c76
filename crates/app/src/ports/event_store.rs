//! Event store port — the ordered, appendable log of state changes.

use std::future::Future;
use std::sync::Arc;

use lightsout_domain::error::LightsOutError;
use lightsout_domain::event::{StateChange, StateChangeEvent};
use lightsout_domain::time::{TimeWindow, Timestamp};

/// Append-only log of [`StateChangeEvent`]s with range queries.
pub trait EventStore {
    /// Persist new changes, assigning each a fresh, increasing sequence number.
    ///
    /// Returns the stored events in the order given.
    fn append(
        &self,
        changes: Vec<StateChange>,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send;

    /// Events whose timestamp falls inside `window`, ordered by sequence.
    fn query(
        &self,
        window: TimeWindow,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send;

    /// The most recent events, ordered newest-first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send;

    /// Delete every event older than `cutoff`, returning how many were removed.
    fn purge_before(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, LightsOutError>> + Send;

    /// Total number of stored events.
    fn count(&self) -> impl Future<Output = Result<u64, LightsOutError>> + Send;
}

impl<T: EventStore + Send + Sync> EventStore for Arc<T> {
    fn append(
        &self,
        changes: Vec<StateChange>,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        (**self).append(changes)
    }

    fn query(
        &self,
        window: TimeWindow,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        (**self).query(window)
    }

    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StateChangeEvent>, LightsOutError>> + Send {
        (**self).get_recent(limit)
    }

    fn purge_before(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, LightsOutError>> + Send {
        (**self).purge_before(cutoff)
    }

    fn count(&self) -> impl Future<Output = Result<u64, LightsOutError>> + Send {
        (**self).count()
    }
}
