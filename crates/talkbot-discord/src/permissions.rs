use serenity::model::id::{GuildId, UserId};
use serenity::model::Permissions;
use serenity::prelude::Context;
use tracing::warn;

/// Who may run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    ManageChannels,
    Owner,
}

impl Requirement {
    /// Reply sent when the invoking user does not meet the requirement.
    pub fn denial(self) -> &'static str {
        match self {
            Requirement::Anyone => "",
            Requirement::ManageChannels => {
                "You need the following permissions to do that: ***Manage Channels***"
            }
            Requirement::Owner => "This command can only be used by the bot's owner.",
        }
    }
}

/// Whether `user_id` holds Manage Channels in `guild_id`.
///
/// Guild owners and administrators always pass. A guild missing from the
/// cache denies.
pub async fn has_manage_channels(
    ctx: &Context,
    guild_id: GuildId,
    user_id: UserId,
) -> Result<bool, serenity::Error> {
    let member = guild_id.member(ctx, user_id).await?;
    let Some(guild) = ctx.cache.guild(guild_id) else {
        warn!(guild_id = %guild_id, "guild not cached, denying permission check");
        return Ok(false);
    };
    Ok(guild
        .member_permissions(&member)
        .contains(Permissions::MANAGE_CHANNELS))
}
