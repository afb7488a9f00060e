use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use talkbot_archive::ArchiveStore;
use talkbot_core::types::{ChannelInfo, RawMessage};
use tracing::{debug, info, warn};

use crate::error::{FetchError, IngestError};
use crate::normalize::{Normalizer, Verdict};

/// Platform capability: fetch a channel's most recent messages, newest first.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_recent(
        &self,
        channel: &ChannelInfo,
        limit: usize,
    ) -> Result<Vec<RawMessage>, FetchError>;
}

/// Outcome of one [`Importer::import_history`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub channels_scanned: usize,
    /// Channels whose kind does not carry archivable text.
    pub channels_skipped: usize,
    pub channels_failed: usize,
    pub scanned: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub upserted: usize,
    pub upsert_failed: usize,
}

impl std::fmt::Display for ImportReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} channel(s) scanned ({} failed), {} message(s) read, {} accepted, {} rejected, {} saved, {} failed to save",
            self.channels_scanned,
            self.channels_failed,
            self.scanned,
            self.accepted,
            self.rejected,
            self.upserted,
            self.upsert_failed
        )
    }
}

/// Walks channel history and upserts every accepted message.
pub struct Importer {
    store: Arc<ArchiveStore>,
    normalizer: Arc<Normalizer>,
}

impl Importer {
    pub fn new(store: Arc<ArchiveStore>, normalizer: Arc<Normalizer>) -> Self {
        Self { store, normalizer }
    }

    /// Import up to `per_channel_limit` recent messages from each channel.
    ///
    /// Fetch failures skip the channel. The accepted records are committed
    /// as one batch; per-record failures are counted, not fatal. The ignore
    /// list is checked while scanning and again for every record at commit,
    /// so a channel ignored mid-import is never written.
    pub async fn import_history(
        &self,
        source: &dyn HistorySource,
        channels: &[ChannelInfo],
        per_channel_limit: usize,
    ) -> Result<ImportReport, IngestError> {
        let mut report = ImportReport::default();
        let ignored = self.store.ignored_channels()?;
        let mut batch = Vec::new();

        for channel in channels {
            if !channel.kind.bears_text() {
                report.channels_skipped += 1;
                continue;
            }

            let messages = match source.fetch_recent(channel, per_channel_limit).await {
                Ok(m) => m,
                Err(e) => {
                    warn!(channel_id = channel.id, channel = %channel.name, error = %e, "history fetch failed, skipping channel");
                    report.channels_failed += 1;
                    continue;
                }
            };
            report.channels_scanned += 1;

            let before = report.accepted;
            for raw in messages.iter().take(per_channel_limit) {
                report.scanned += 1;
                match self.normalizer.normalize(raw, &ignored, &raw.mentions) {
                    Verdict::Accepted(record) => {
                        report.accepted += 1;
                        batch.push(record);
                    }
                    Verdict::Rejected(reason) => {
                        report.rejected += 1;
                        debug!(message_id = raw.id, reason = reason.as_str(), "history message rejected");
                    }
                }
            }
            debug!(
                channel_id = channel.id,
                fetched = messages.len(),
                accepted = report.accepted - before,
                "channel scanned"
            );
        }

        if !batch.is_empty() {
            let store = Arc::clone(&self.store);
            let batch_report =
                tokio::task::spawn_blocking(move || store.upsert_batch(&batch)).await??;
            report.upserted = batch_report.upserted();
            report.upsert_failed = batch_report.failed;
            // Channels ignored while the history was being fetched.
            report.accepted -= batch_report.ignored;
            report.rejected += batch_report.ignored;
        }

        info!(
            channels = report.channels_scanned,
            failed_channels = report.channels_failed,
            scanned = report.scanned,
            accepted = report.accepted,
            upserted = report.upserted,
            upsert_failed = report.upsert_failed,
            "history import finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rusqlite::Connection;
    use std::collections::HashMap;
    use talkbot_core::types::{Author, ChannelKind, MentionTable};

    struct FakeHistory {
        channels: HashMap<u64, Vec<RawMessage>>,
    }

    #[async_trait]
    impl HistorySource for FakeHistory {
        async fn fetch_recent(
            &self,
            channel: &ChannelInfo,
            limit: usize,
        ) -> Result<Vec<RawMessage>, FetchError> {
            match self.channels.get(&channel.id) {
                Some(msgs) => Ok(msgs.iter().take(limit).cloned().collect()),
                None => Err(FetchError {
                    channel_id: channel.id,
                    reason: "missing access".into(),
                }),
            }
        }
    }

    fn channel(id: u64, kind: ChannelKind) -> ChannelInfo {
        ChannelInfo {
            id,
            name: format!("c{id}"),
            kind,
            nsfw: false,
        }
    }

    fn msg(id: u64, channel_id: u64, content: &str) -> RawMessage {
        RawMessage {
            id,
            content: content.into(),
            author: Author {
                id: 1,
                name: "bob".into(),
                bot: false,
            },
            channel: channel(channel_id, ChannelKind::Text),
            timestamp: Utc::now(),
            mentions: MentionTable::default(),
        }
    }

    fn importer() -> (Importer, Arc<ArchiveStore>) {
        let store = Arc::new(ArchiveStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let normalizer = Arc::new(Normalizer::new(vec!["!".into()]));
        (Importer::new(Arc::clone(&store), normalizer), store)
    }

    #[tokio::test]
    async fn failed_channel_is_skipped() {
        let (importer, store) = importer();
        let source = FakeHistory {
            channels: HashMap::from([(2, vec![msg(20, 2, "second channel message")])]),
        };
        let channels = vec![channel(1, ChannelKind::Text), channel(2, ChannelKind::Text)];

        let report = importer.import_history(&source, &channels, 10).await.unwrap();
        assert_eq!(report.channels_failed, 1);
        assert_eq!(report.channels_scanned, 1);
        assert_eq!(report.upserted, 1);
        assert_eq!(store.message_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn non_text_channels_are_not_fetched() {
        let (importer, _store) = importer();
        // Fetching the voice channel would fail; it must never be attempted.
        let source = FakeHistory {
            channels: HashMap::new(),
        };
        let channels = vec![channel(3, ChannelKind::Voice), channel(4, ChannelKind::News)];

        let report = importer.import_history(&source, &channels, 10).await.unwrap();
        assert_eq!(report.channels_skipped, 2);
        assert_eq!(report.channels_failed, 0);
    }

    #[tokio::test]
    async fn counts_accepted_and_rejected() {
        let (importer, _store) = importer();
        let source = FakeHistory {
            channels: HashMap::from([(
                1,
                vec![
                    msg(10, 1, "a perfectly fine message"),
                    msg(11, 1, "short"),
                    msg(12, 1, "!command with arguments"),
                ],
            )]),
        };

        let report = importer
            .import_history(&source, &[channel(1, ChannelKind::Text)], 10)
            .await
            .unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.accepted, 1);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.upserted, 1);
        assert_eq!(report.upsert_failed, 0);
    }

    #[tokio::test]
    async fn limit_bounds_each_channel() {
        let (importer, store) = importer();
        let msgs = (0..20)
            .map(|i| msg(100 + i, 1, &format!("numbered message {i}")))
            .collect();
        let source = FakeHistory {
            channels: HashMap::from([(1, msgs)]),
        };

        let report = importer
            .import_history(&source, &[channel(1, ChannelKind::Text)], 5)
            .await
            .unwrap();
        assert_eq!(report.scanned, 5);
        assert_eq!(store.message_count().unwrap(), 5);
    }
}
