//! # lightsout-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `EventStore` and `PatternCache` port traits defined in
//!   `lightsout-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `lightsout-app` (for port traits) and `lightsout-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod event_store;
mod pattern_cache;
mod pool;

pub use error::StorageError;
pub use event_store::SqliteEventStore;
pub use pattern_cache::SqlitePatternCache;
pub use pool::{Config, Database};
