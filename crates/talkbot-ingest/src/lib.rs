//! Message ingestion: normalization of raw platform messages, bulk history
//! import and the live ingest consumer task.

pub mod consumer;
pub mod error;
pub mod importer;
pub mod normalize;

pub use consumer::{run_ingest, IngestStats, INGEST_QUEUE_CAPACITY};
pub use error::{FetchError, IngestError};
pub use importer::{HistorySource, ImportReport, Importer};
pub use normalize::{MentionResolver, Normalizer, Rejection, Verdict};
