//! # fieldnode-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `FlagStore` port trait defined in `fieldnode-app::ports`
//! - Manage `SQLite` connection pool lifecycle with full synchronous writes
//! - Run database migrations (using sqlx embedded migrations)
//!
//! ## Dependency rule
//! Depends on `fieldnode-app` (for port traits) and `fieldnode-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod flag_store;
pub mod pool;

pub use flag_store::SqliteFlagStore;
pub use pool::{Config, Database};
