/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("archive error: {0}")]
    Archive(#[from] talkbot_archive::ArchiveError),

    #[error("import error: {0}")]
    Ingest(#[from] talkbot_ingest::IngestError),
}
