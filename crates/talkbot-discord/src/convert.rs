//! serenity model → platform-neutral `talkbot_core` types.

use chrono::{DateTime, Utc};
use serenity::cache::Cache;
use serenity::model::channel::{Channel, ChannelType, GuildChannel, Message};
use serenity::model::id::{ChannelId, GuildId};
use serenity::model::Timestamp;
use serenity::prelude::Context;
use tracing::warn;

use talkbot_core::types::{Author, ChannelInfo, ChannelKind, MentionTable, RawMessage};

pub fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread => {
            ChannelKind::Thread
        }
        ChannelType::News => ChannelKind::News,
        ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
        ChannelType::Private | ChannelType::GroupDm => ChannelKind::Private,
        _ => ChannelKind::Other,
    }
}

pub fn channel_info(channel: &GuildChannel) -> ChannelInfo {
    ChannelInfo {
        id: channel.id.get(),
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
        nsfw: channel.nsfw,
    }
}

/// Direct-message channels have no name or age flag of their own.
fn private_channel(id: ChannelId) -> ChannelInfo {
    ChannelInfo {
        id: id.get(),
        name: "direct-message".to_string(),
        kind: ChannelKind::Private,
        nsfw: false,
    }
}

/// Look a guild channel (or thread) up in the cache.
///
/// Threads inherit the age restriction of their parent.
pub fn cached_channel(cache: &Cache, guild_id: GuildId, channel_id: ChannelId) -> Option<ChannelInfo> {
    let guild = cache.guild(guild_id)?;
    let channel = guild
        .channels
        .get(&channel_id)
        .or_else(|| guild.threads.iter().find(|t| t.id == channel_id))?;

    let mut info = channel_info(channel);
    if let Some(parent) = channel.parent_id.and_then(|p| guild.channels.get(&p)) {
        info.nsfw |= parent.nsfw;
    }
    Some(info)
}

/// Resolve the channel a live message arrived in: cache first, REST second.
pub async fn resolve_channel(ctx: &Context, msg: &Message) -> Option<ChannelInfo> {
    let Some(guild_id) = msg.guild_id else {
        return Some(private_channel(msg.channel_id));
    };
    if let Some(info) = cached_channel(&ctx.cache, guild_id, msg.channel_id) {
        return Some(info);
    }

    match msg.channel_id.to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => Some(channel_info(&channel)),
        Ok(Channel::Private(_)) => Some(private_channel(msg.channel_id)),
        Ok(_) => None,
        Err(e) => {
            warn!(channel_id = %msg.channel_id, error = %e, "could not resolve channel");
            None
        }
    }
}

/// Display-name precedence: guild nickname, global name, username.
pub fn display_name(nick: Option<&str>, global_name: Option<&str>, username: &str) -> String {
    nick.or(global_name).unwrap_or(username).to_string()
}

/// Names for every user and role the message mentions.
///
/// Guild members come from the cache when present; otherwise the partial
/// member attached to the mention supplies the nickname.
pub fn mention_table(cache: &Cache, guild_id: Option<GuildId>, msg: &Message) -> MentionTable {
    let mut table = MentionTable::default();
    let guild = guild_id.and_then(|g| cache.guild(g));

    for user in &msg.mentions {
        let cached_nick = guild
            .as_ref()
            .and_then(|g| g.members.get(&user.id))
            .and_then(|m| m.nick.clone());
        let partial_nick = user.member.as_ref().and_then(|m| m.nick.clone());
        let name = display_name(
            cached_nick.or(partial_nick).as_deref(),
            user.global_name.as_deref(),
            &user.name,
        );
        table.users.insert(user.id.get(), name);
    }

    if let Some(guild) = guild.as_ref() {
        for role_id in &msg.mention_roles {
            if let Some(role) = guild.roles.get(role_id) {
                table.roles.insert(role_id.get(), role.name.clone());
            }
        }
    }

    table
}

pub fn timestamp(ts: &Timestamp) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_default()
}

pub fn to_raw(msg: &Message, channel: ChannelInfo, mentions: MentionTable) -> RawMessage {
    RawMessage {
        id: msg.id.get(),
        content: msg.content.clone(),
        author: Author {
            id: msg.author.id.get(),
            name: msg.author.name.clone(),
            bot: msg.author.bot,
        },
        channel,
        timestamp: timestamp(&msg.timestamp),
        mentions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_text_and_threads_bear_text() {
        let bearing: Vec<ChannelType> = [
            ChannelType::Text,
            ChannelType::News,
            ChannelType::Voice,
            ChannelType::Stage,
            ChannelType::PublicThread,
            ChannelType::PrivateThread,
            ChannelType::Category,
            ChannelType::Forum,
            ChannelType::Private,
        ]
        .into_iter()
        .filter(|k| channel_kind(*k).bears_text())
        .collect();
        assert_eq!(
            bearing,
            vec![
                ChannelType::Text,
                ChannelType::PublicThread,
                ChannelType::PrivateThread
            ]
        );
    }

    #[test]
    fn nickname_wins_over_global_name() {
        assert_eq!(display_name(Some("Nick"), Some("Global"), "user"), "Nick");
        assert_eq!(display_name(None, Some("Global"), "user"), "Global");
        assert_eq!(display_name(None, None, "user"), "user");
    }

    #[test]
    fn timestamp_keeps_seconds() {
        let ts = Timestamp::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(timestamp(&ts).timestamp(), 1_700_000_000);
    }
}
