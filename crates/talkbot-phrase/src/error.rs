use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhraseError {
    /// No words stored, or the walk reached a word with no successor.
    #[error("insufficient data to generate a phrase: {reason}")]
    InsufficientData { reason: String },

    #[error("archive error: {0}")]
    Store(#[from] talkbot_archive::ArchiveError),
}

impl PhraseError {
    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        PhraseError::InsufficientData {
            reason: reason.into(),
        }
    }
}
