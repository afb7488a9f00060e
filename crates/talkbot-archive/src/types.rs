use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row of the `messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub message_id: Option<u64>,
    pub content: String,
    pub author_name: String,
    pub author_id: u64,
    pub channel_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Result of persisting a single live message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// The `message_id` already existed; only `content` was rewritten.
    Updated,
    /// The channel was ignored at commit time; nothing was written.
    ChannelIgnored,
}

/// Counts produced by one [`ArchiveStore::upsert_batch`](crate::ArchiveStore::upsert_batch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    /// Records skipped because their channel was ignored at commit time.
    pub ignored: usize,
}

impl BatchReport {
    pub fn upserted(&self) -> usize {
        self.inserted + self.updated
    }
}
