use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use talkbot_phrase::{PhraseError, PhraseGenerator};
use tokio::sync::mpsc;

use crate::error::SinkError;

/// Anything that can produce a phrase of `word_count + 1` words.
pub trait PhraseSource: Send + Sync {
    fn generate(&self, word_count: usize) -> Result<String, PhraseError>;
}

impl PhraseSource for PhraseGenerator {
    fn generate(&self, word_count: usize) -> Result<String, PhraseError> {
        self.generate_phrase(word_count)
    }
}

/// Destination of generated phrases.
#[async_trait]
pub trait PhraseSink: Send + Sync {
    async fn send(&self, phrase: String) -> Result<(), SinkError>;
}

/// A phrase addressed to a platform channel, queued for the delivery task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseDelivery {
    pub channel_id: u64,
    pub text: String,
}

/// Sink that queues phrases for a platform delivery task.
pub struct DeliverySink {
    channel_id: u64,
    tx: mpsc::Sender<PhraseDelivery>,
}

impl DeliverySink {
    pub fn new(channel_id: u64, tx: mpsc::Sender<PhraseDelivery>) -> Self {
        Self { channel_id, tx }
    }
}

#[async_trait]
impl PhraseSink for DeliverySink {
    async fn send(&self, phrase: String) -> Result<(), SinkError> {
        self.tx
            .send(PhraseDelivery {
                channel_id: self.channel_id,
                text: phrase,
            })
            .await
            .map_err(|_| SinkError::Closed)
    }
}
