//! Shared configuration, errors and platform-neutral message types.

pub mod config;
pub mod error;
pub mod types;

pub use config::TalkbotConfig;
pub use error::{Result, TalkbotError};
