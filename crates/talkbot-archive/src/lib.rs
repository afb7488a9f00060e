//! `talkbot-archive` — SQLite store for archived messages and ignored channels.
//!
//! The store is the only component that writes either table. Every method
//! locks the connection, runs synchronously and releases the lock before
//! returning, so callers never hold it across an `.await`.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{ArchiveError, Result};
pub use store::ArchiveStore;
pub use types::{BatchReport, InsertOutcome, StoredMessage};
