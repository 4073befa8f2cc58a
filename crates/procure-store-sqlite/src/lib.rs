//! SQLite backend for the procurement solicitation store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The same store also answers the
//! requester-directory and catalog lookups the lifecycle engine needs.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
