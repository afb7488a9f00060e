use std::sync::Arc;

use talkbot_archive::{ArchiveStore, InsertOutcome};
use talkbot_core::types::RawMessage;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::normalize::{Normalizer, Verdict};

/// Capacity of the inbound message queue between the platform handler and
/// [`run_ingest`].
pub const INGEST_QUEUE_CAPACITY: usize = 256;

/// Totals reported when the consumer exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub stored: u64,
    pub rejected: u64,
    pub failed: u64,
}

/// Consume live messages until the queue closes or `shutdown` turns `true`.
pub async fn run_ingest(
    store: Arc<ArchiveStore>,
    normalizer: Arc<Normalizer>,
    mut rx: mpsc::Receiver<RawMessage>,
    mut shutdown: watch::Receiver<bool>,
) -> IngestStats {
    info!("ingest consumer started");
    let mut stats = IngestStats::default();

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let Some(raw) = msg else {
                    info!("ingest queue closed");
                    break;
                };
                ingest_one(&store, &normalizer, &raw, &mut stats);
            }
            changed = shutdown.changed() => {
                // A dropped sender counts as shutdown.
                if changed.is_err() || *shutdown.borrow() {
                    info!("ingest consumer shutting down");
                    break;
                }
            }
        }
    }

    info!(
        received = stats.received,
        stored = stats.stored,
        rejected = stats.rejected,
        failed = stats.failed,
        "ingest consumer stopped"
    );
    stats
}

fn ingest_one(
    store: &ArchiveStore,
    normalizer: &Normalizer,
    raw: &RawMessage,
    stats: &mut IngestStats,
) {
    stats.received += 1;

    let ignored = match store.ignored_channels() {
        Ok(set) => set,
        Err(e) => {
            error!(message_id = raw.id, error = %e, "could not read ignored channels");
            stats.failed += 1;
            return;
        }
    };

    let record = match normalizer.normalize(raw, &ignored, &raw.mentions) {
        Verdict::Accepted(record) => record,
        Verdict::Rejected(reason) => {
            debug!(message_id = raw.id, reason = reason.as_str(), "message not archived");
            stats.rejected += 1;
            return;
        }
    };

    match store.insert(&record) {
        Ok(InsertOutcome::ChannelIgnored) => stats.rejected += 1,
        Ok(_) => {
            debug!(message_id = raw.id, channel_id = raw.channel.id, "message archived");
            stats.stored += 1;
        }
        Err(e) => {
            error!(message_id = raw.id, error = %e, "failed to archive message");
            stats.failed += 1;
        }
    }
}
