//! # lightsout-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **read-only JSON API** over the active patterns, the latest
//!   predictions, the automation log, recent events and engine status
//! - Accept an on-demand **detection trigger** (`POST /api/detection`)
//! - Stream core notifications as **Server-Sent Events** (`/api/stream`)
//!
//! ## Dependency rule
//! Depends on `lightsout-app` (for port traits and services) and
//! `lightsout-domain` (for domain types used in response mapping). Never
//! leaks axum types into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
