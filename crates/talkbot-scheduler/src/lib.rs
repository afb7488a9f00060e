//! `talkbot-scheduler` — posts a generated phrase on a fixed interval.
//!
//! # Overview
//!
//! [`engine::PhraseScheduler`] runs one loop: generate a phrase, hand it to
//! a [`types::PhraseSink`], then sleep for the interval. Generation failures
//! are logged and retried on the next cycle. Shutdown is observed only
//! while sleeping, so a phrase in flight is always delivered.

pub mod engine;
pub mod error;
pub mod types;

pub use engine::{PhraseScheduler, SchedulerStats};
pub use error::SinkError;
pub use types::{DeliverySink, PhraseDelivery, PhraseSink, PhraseSource};
