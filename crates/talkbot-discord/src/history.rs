use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::GetMessages;
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use tracing::debug;

use talkbot_core::types::{ChannelInfo, RawMessage};
use talkbot_ingest::{FetchError, HistorySource};

use crate::convert;

/// Every channel of the guild plus the threads the cache knows about.
///
/// Threads inherit the age restriction of their parent.
pub async fn guild_channels(
    http: &Http,
    cache: &Cache,
    guild_id: GuildId,
) -> Result<Vec<ChannelInfo>, serenity::Error> {
    let channels = guild_id.channels(http).await?;
    let mut out: Vec<ChannelInfo> = channels.values().map(convert::channel_info).collect();

    if let Some(guild) = cache.guild(guild_id) {
        for thread in &guild.threads {
            let mut info = convert::channel_info(thread);
            if let Some(parent) = thread.parent_id.and_then(|p| channels.get(&p)) {
                info.nsfw |= parent.nsfw;
            }
            out.push(info);
        }
    }

    out.sort_by_key(|c| c.id);
    Ok(out)
}

/// Discord caps one history request at 100 messages.
const PAGE_SIZE: usize = 100;

/// Channel history of one guild, read page by page over REST.
pub struct DiscordHistory {
    http: Arc<Http>,
    cache: Arc<Cache>,
    guild_id: GuildId,
}

impl DiscordHistory {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, guild_id: GuildId) -> Self {
        Self {
            http,
            cache,
            guild_id,
        }
    }
}

#[async_trait]
impl HistorySource for DiscordHistory {
    async fn fetch_recent(
        &self,
        channel: &ChannelInfo,
        limit: usize,
    ) -> Result<Vec<RawMessage>, FetchError> {
        let channel_id = ChannelId::new(channel.id);
        let mut out = Vec::with_capacity(limit.min(PAGE_SIZE));
        let mut before: Option<MessageId> = None;

        while out.len() < limit {
            let page = (limit - out.len()).min(PAGE_SIZE);
            let mut request = GetMessages::new().limit(page as u8);
            if let Some(id) = before {
                request = request.before(id);
            }

            let batch = channel_id
                .messages(self.http.as_ref(), request)
                .await
                .map_err(|e| FetchError {
                    channel_id: channel.id,
                    reason: e.to_string(),
                })?;

            // Pages come newest first, so the last entry is the next cursor.
            before = batch.last().map(|m| m.id);
            let received = batch.len();
            out.extend(batch.iter().map(|m| {
                let mentions = convert::mention_table(&self.cache, Some(self.guild_id), m);
                convert::to_raw(m, channel.clone(), mentions)
            }));

            if received < page {
                break;
            }
        }

        debug!(channel_id = channel.id, fetched = out.len(), "channel history read");
        Ok(out)
    }
}
