//! # lightsout-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `PollSource` — read the bridge's current device states
//!   - `EventStore` — append & query state-change events
//!   - `CommandSink` — apply a lighting action
//!   - `PatternCache` — persist the last computed pattern set
//!   - `NotificationPublisher` — broadcast detection results and decisions
//! - Mine patterns (`detector`), hold them (`pattern_registry`), predict
//!   (`predictor`) and act safely on predictions (`automation_coordinator`)
//! - Provide **driving/inbound ports** as service structs:
//!   - `IngestionService` — poll, diff, append, purge
//!   - `DetectionService` — run detection, restore the cache
//!   - `PredictionService` — predictor tick and hand-off to the coordinator
//! - Provide **in-process infrastructure** (event bus, scheduler) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `lightsout-domain` only (plus `tokio` for sync, timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation_coordinator;
pub mod automation_log;
pub mod detector;
pub mod event_bus;
pub mod event_summary;
pub mod pattern_registry;
pub mod ports;
pub mod predictor;
pub mod retry;
pub mod scheduler;
pub mod services;
pub mod state_cache;

#[cfg(test)]
pub(crate) mod testing;
