use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{GuildId, UserId};
use serenity::prelude::{Context, EventHandler};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{error, info, warn};

use crate::context::BotContext;
use crate::history::{self, DiscordHistory};
use crate::{commands, convert};

/// Serenity event handler: commands are dispatched, everything else is
/// queued for the ingest consumer.
pub struct TalkbotHandler {
    pub app: Arc<BotContext>,
    pub owner_id: OnceLock<UserId>,
}

#[async_trait]
impl EventHandler for TalkbotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, guilds = ready.guilds.len(), "Discord bot connected");

        if self.owner_id.get().is_none() {
            match ctx.http.get_current_application_info().await {
                Ok(info) => {
                    let owner = info
                        .owner
                        .map(|u| u.id)
                        .or_else(|| info.team.map(|t| t.owner_user_id));
                    if let Some(id) = owner {
                        self.owner_id.set(id).ok();
                    }
                }
                Err(e) => warn!(error = %e, "could not fetch application owner"),
            }
        }

        if self.app.config.import.on_startup && self.app.claim_startup_import() {
            let guilds: Vec<GuildId> = ready.guilds.iter().map(|g| g.id).collect();
            tokio::spawn(startup_import(Arc::clone(&self.app), ctx, guilds));
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Some(parsed) = commands::parse(&msg.content, &self.app.config.discord.prefix) {
            let owner = self.owner_id.get().copied();
            commands::dispatch(&self.app, &ctx, &msg, owner, parsed).await;
            return;
        }

        let Some(channel) = convert::resolve_channel(&ctx, &msg).await else {
            return;
        };
        let mentions = convert::mention_table(&ctx.cache, msg.guild_id, &msg);
        let raw = convert::to_raw(&msg, channel, mentions);

        match self.app.ingest_tx.try_send(raw) {
            Ok(()) => {}
            Err(TrySendError::Full(raw)) => {
                warn!(message_id = raw.id, "ingest queue full, dropping message")
            }
            Err(TrySendError::Closed(raw)) => {
                warn!(message_id = raw.id, "ingest queue closed, dropping message")
            }
        }
    }
}

/// Import the recent history of every guild the bot is in, one at a time.
async fn startup_import(app: Arc<BotContext>, ctx: Context, guilds: Vec<GuildId>) {
    info!(guilds = guilds.len(), "startup import begins");
    for guild_id in guilds {
        let channels = match history::guild_channels(&ctx.http, &ctx.cache, guild_id).await {
            Ok(c) => c,
            Err(e) => {
                warn!(guild_id = %guild_id, error = %e, "could not list guild channels");
                continue;
            }
        };

        let source = DiscordHistory::new(Arc::clone(&ctx.http), Arc::clone(&ctx.cache), guild_id);
        match app
            .importer
            .import_history(&source, &channels, app.config.import.per_channel_limit)
            .await
        {
            Ok(report) => info!(guild_id = %guild_id, %report, "startup import finished"),
            Err(e) => error!(guild_id = %guild_id, error = %e, "startup import failed"),
        }
    }
}
