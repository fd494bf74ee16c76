//! Poll source port — current attribute values of every device.

use std::future::Future;
use std::sync::Arc;

use lightsout_domain::error::LightsOutError;
use lightsout_domain::state::StateSnapshot;

/// Reads the bridge's current view of all devices.
pub trait PollSource {
    /// Take one snapshot. Every device present is considered reachable.
    fn poll(&self) -> impl Future<Output = Result<StateSnapshot, LightsOutError>> + Send;
}

impl<T: PollSource + Send + Sync> PollSource for Arc<T> {
    fn poll(&self) -> impl Future<Output = Result<StateSnapshot, LightsOutError>> + Send {
        (**self).poll()
    }
}
