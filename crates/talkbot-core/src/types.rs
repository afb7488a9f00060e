use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of channel a message was sent in, reduced to what archival cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Thread,
    /// Announcement channel.
    News,
    Voice,
    /// Direct or group DM.
    Private,
    Other,
}

impl ChannelKind {
    /// Channels whose messages may be archived and imported.
    pub fn bears_text(self) -> bool {
        matches!(self, ChannelKind::Text | ChannelKind::Thread)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: u64,
    pub name: String,
    pub kind: ChannelKind,
    /// Age-restricted channel; never archived.
    pub nsfw: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub name: String,
    pub bot: bool,
}

/// Display names for the mentions found in one message, resolved by the
/// platform adapter when the message was received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionTable {
    pub users: HashMap<u64, String>,
    pub roles: HashMap<u64, String>,
}

/// A message as delivered by the chat platform, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: u64,
    pub content: String,
    pub author: Author,
    pub channel: ChannelInfo,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mentions: MentionTable,
}

/// A normalized message ready to be committed to the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: Option<u64>,
    pub content: String,
    pub author_name: String,
    pub author_id: u64,
    pub channel_id: Option<u64>,
    pub timestamp: DateTime<Utc>,
}
