//! # lightsout-domain
//!
//! Pure domain model for the lightsout lighting-habit engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **device state** (attribute values, snapshots, transitions)
//! - Define **state-change events** (the immutable facts mined for patterns)
//! - Define **patterns** (time-based, sequence, correlation regularities)
//! - Define **predictions** and **automation decisions**
//! - Contain all invariant enforcement and pure domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod decision;
pub mod event;
pub mod pattern;
pub mod prediction;
pub mod state;
