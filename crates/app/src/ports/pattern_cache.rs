//! Pattern cache port — last computed pattern set, for fast restart.
//!
//! The cache is never authoritative: patterns are always recomputable from
//! the event log.

use std::future::Future;
use std::sync::Arc;

use lightsout_domain::error::LightsOutError;
use lightsout_domain::pattern::Pattern;

/// Persists the most recent pattern set.
pub trait PatternCache {
    /// Load the cached set (empty when nothing was saved yet).
    fn load(&self) -> impl Future<Output = Result<Vec<Pattern>, LightsOutError>> + Send;

    /// Replace the cached set with `patterns`.
    fn save(
        &self,
        patterns: Vec<Pattern>,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send;
}

impl<T: PatternCache + Send + Sync> PatternCache for Arc<T> {
    fn load(&self) -> impl Future<Output = Result<Vec<Pattern>, LightsOutError>> + Send {
        (**self).load()
    }

    fn save(
        &self,
        patterns: Vec<Pattern>,
    ) -> impl Future<Output = Result<(), LightsOutError>> + Send {
        (**self).save(patterns)
    }
}
