use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use talkbot_scheduler::PhraseDelivery;

use crate::context::BotContext;
use crate::handler::TalkbotHandler;

/// Discord adapter.
///
/// Wraps a serenity `Client` and reconnects whenever the gateway drops.
pub struct DiscordAdapter {
    app: Arc<BotContext>,
}

impl DiscordAdapter {
    pub fn new(app: Arc<BotContext>) -> Self {
        Self { app }
    }

    /// Connect and keep reconnecting. Never returns.
    ///
    /// The phrase delivery task is spawned once on the first client's
    /// `Arc<Http>`, which stays valid across gateway reconnects.
    pub async fn run(self, delivery_rx: mpsc::Receiver<PhraseDelivery>) {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = self.connect(intents, "initial connect").await;

        let http = Arc::clone(&client.http);
        tokio::spawn(crate::proactive::run_phrase_delivery(http, delivery_rx));

        loop {
            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
            client = self.connect(intents, "reconnect").await;
        }
    }

    /// Build a client, retrying every 30s until it succeeds.
    async fn connect(&self, intents: GatewayIntents, stage: &str) -> Client {
        loop {
            match self.build_client(intents).await {
                Ok(c) => return c,
                Err(e) => {
                    error!("Discord: {stage} failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = TalkbotHandler {
            app: Arc::clone(&self.app),
            owner_id: OnceLock::new(),
        };

        Client::builder(&self.app.config.discord.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
