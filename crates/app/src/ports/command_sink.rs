//! Command sink port — applies a lighting action on the bridge.

use std::future::Future;
use std::sync::Arc;

use lightsout_domain::error::SinkError;
use lightsout_domain::prediction::Action;

/// Sends actions to devices.
///
/// Implementations may block on network I/O; callers bound every call with
/// a timeout.
pub trait CommandSink {
    /// Apply `action`.
    ///
    /// Return [`SinkError::Transport`] for failures worth retrying and
    /// [`SinkError::Rejected`] when the bridge refuses the command outright.
    fn execute(&self, action: &Action) -> impl Future<Output = Result<(), SinkError>> + Send;
}

impl<T: CommandSink + Send + Sync> CommandSink for Arc<T> {
    fn execute(&self, action: &Action) -> impl Future<Output = Result<(), SinkError>> + Send {
        (**self).execute(action)
    }
}
