use thiserror::Error;

#[derive(Debug, Error)]
pub enum TalkbotError {
    /// Missing or malformed setting. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TalkbotError>;
