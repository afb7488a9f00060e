//! Shared state handed to the event handler and command dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use talkbot_archive::ArchiveStore;
use talkbot_core::types::RawMessage;
use talkbot_core::TalkbotConfig;
use talkbot_ingest::{Importer, Normalizer};
use tokio::sync::mpsc;

/// Everything the Discord side needs, built once in `main` and passed in.
pub struct BotContext {
    pub config: TalkbotConfig,
    pub store: Arc<ArchiveStore>,
    pub importer: Importer,
    /// Live messages queued for the ingest consumer.
    pub ingest_tx: mpsc::Sender<RawMessage>,
    startup_import_claimed: AtomicBool,
}

impl BotContext {
    pub fn new(
        config: TalkbotConfig,
        store: Arc<ArchiveStore>,
        normalizer: Arc<Normalizer>,
        ingest_tx: mpsc::Sender<RawMessage>,
    ) -> Self {
        let importer = Importer::new(Arc::clone(&store), normalizer);
        Self {
            config,
            store,
            importer,
            ingest_tx,
            startup_import_claimed: AtomicBool::new(false),
        }
    }

    /// True exactly once per process. `ready` fires again after every
    /// reconnect, but the startup import must only run on the first one.
    pub fn claim_startup_import(&self) -> bool {
        !self.startup_import_claimed.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use talkbot_core::config::DiscordConfig;

    fn context() -> BotContext {
        let config = TalkbotConfig {
            discord: DiscordConfig {
                bot_token: "token".into(),
                prefix: "!".into(),
                fallback_prefixes: vec![],
                messages_channel_id: 1,
            },
            database: Default::default(),
            phrase: Default::default(),
            import: Default::default(),
        };
        let store = Arc::new(ArchiveStore::new(Connection::open_in_memory().unwrap()).unwrap());
        let normalizer = Arc::new(Normalizer::new(config.discord.command_prefixes()));
        let (tx, _rx) = mpsc::channel(1);
        BotContext::new(config, store, normalizer, tx)
    }

    #[test]
    fn startup_import_is_claimed_once() {
        let ctx = context();
        assert!(ctx.claim_startup_import());
        assert!(!ctx.claim_startup_import());
    }
}
