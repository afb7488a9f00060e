use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::info;

use talkbot_archive::ArchiveStore;
use talkbot_core::TalkbotConfig;
use talkbot_discord::{BotContext, DiscordAdapter};
use talkbot_ingest::{run_ingest, Normalizer, INGEST_QUEUE_CAPACITY};
use talkbot_phrase::PhraseGenerator;
use talkbot_scheduler::{DeliverySink, PhraseDelivery, PhraseScheduler};

/// Discord bot that archives channel chatter and posts Markov-chain phrases.
#[derive(Debug, Parser)]
#[command(name = "talkbot", version)]
struct Cli {
    /// Path to talkbot.toml. Falls back to TALKBOT_CONFIG, then ~/.talkbot/talkbot.toml.
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "talkbot=info,talkbot_ingest=info,talkbot_scheduler=info,talkbot_discord=info,serenity=warn".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("TALKBOT_CONFIG").ok());
    let config =
        TalkbotConfig::load(config_path.as_deref()).context("configuration is invalid")?;
    info!(sha = env!("TALKBOT_GIT_SHA"), "talkbot starting");

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let store = Arc::new(ArchiveStore::new(open_db(db_path)?)?);
    // The generator reads on its own connection so a long import batch does
    // not block phrase generation behind the store's lock.
    let corpus = Arc::new(ArchiveStore::new(open_db(db_path)?)?);
    info!(messages = store.message_count()?, "archive ready");

    let normalizer = Arc::new(Normalizer::new(config.discord.command_prefixes()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Live messages: Discord handler → ingest consumer.
    let (ingest_tx, ingest_rx) = mpsc::channel(INGEST_QUEUE_CAPACITY);
    let ingest = tokio::spawn(run_ingest(
        Arc::clone(&store),
        Arc::clone(&normalizer),
        ingest_rx,
        shutdown_rx.clone(),
    ));

    // Phrases: scheduler → Discord delivery task.
    let (delivery_tx, delivery_rx) = mpsc::channel::<PhraseDelivery>(16);
    let scheduler = PhraseScheduler::new(
        Arc::new(PhraseGenerator::new(corpus)),
        DeliverySink::new(config.discord.messages_channel_id, delivery_tx),
        Duration::from_secs(config.phrase.interval_secs),
        config.phrase.word_count,
    );
    let scheduler = tokio::spawn(scheduler.run(shutdown_rx));

    let app = Arc::new(BotContext::new(config, store, normalizer, ingest_tx));
    tokio::spawn(DiscordAdapter::new(app).run(delivery_rx));
    info!("Discord bot started");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);

    let ingest_stats = ingest.await?;
    let scheduler_stats = scheduler.await?;
    info!(
        stored = ingest_stats.stored,
        rejected = ingest_stats.rejected,
        phrases_sent = scheduler_stats.sent,
        "talkbot stopped"
    );
    Ok(())
}

fn open_db(path: &str) -> anyhow::Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)
        .with_context(|| format!("cannot open database at {path}"))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
