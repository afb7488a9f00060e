use thiserror::Error;

/// Failure to retrieve one channel's history. Recovered by skipping the channel.
#[derive(Debug, Error)]
#[error("failed to fetch history of channel {channel_id}: {reason}")]
pub struct FetchError {
    pub channel_id: u64,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("archive error: {0}")]
    Archive(#[from] talkbot_archive::ArchiveError),

    /// The blocking batch commit task panicked or was cancelled.
    #[error("batch commit task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
