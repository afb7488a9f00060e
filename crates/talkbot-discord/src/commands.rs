//! Prefix commands: `ignore`, `unignore`, `import`, `clean_db`, `help`.
//!
//! Parsing is pure and tested on its own; [`dispatch`] runs the guild,
//! permission and argument checks in that order before the handler.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serenity::model::channel::{Channel, Message};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::prelude::Context;
use tracing::{error, info, warn};

use crate::context::BotContext;
use crate::error::DiscordError;
use crate::history::{self, DiscordHistory};
use crate::permissions::{self, Requirement};
use crate::send;

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Argument placeholder shown in usage lines.
    pub args: &'static str,
    pub about: &'static str,
    pub requirement: Requirement,
    pub guild_only: bool,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "ignore",
        aliases: &["ignore_channel"],
        args: "<channel>",
        about: "Stop archiving messages from a channel.",
        requirement: Requirement::ManageChannels,
        guild_only: true,
    },
    CommandSpec {
        name: "unignore",
        aliases: &["unignore_channel"],
        args: "<channel>",
        about: "Archive messages from a channel again.",
        requirement: Requirement::ManageChannels,
        guild_only: true,
    },
    CommandSpec {
        name: "import",
        aliases: &["reimport"],
        args: "",
        about: "Re-import this server's channel history.",
        requirement: Requirement::Owner,
        guild_only: true,
    },
    CommandSpec {
        name: "clean_db",
        aliases: &["cleandb"],
        args: "",
        about: "Delete every archived message, then re-import this server.",
        requirement: Requirement::Owner,
        guild_only: true,
    },
    CommandSpec {
        name: "help",
        aliases: &[],
        args: "",
        about: "List commands.",
        requirement: Requirement::Anyone,
        guild_only: false,
    },
];

const NO_PRIVATE: &str = "This command can not be used in private messages.";
const UNKNOWN_ERROR: &str =
    "Unknown error. The logs of this error have been sent to a Dev and will be fixed shortly.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ignore { channel: String },
    Unignore { channel: String },
    Import,
    CleanDb,
    Help,
}

impl Command {
    pub fn spec(&self) -> &'static CommandSpec {
        let name = match self {
            Command::Ignore { .. } => "ignore",
            Command::Unignore { .. } => "unignore",
            Command::Import => "import",
            Command::CleanDb => "clean_db",
            Command::Help => "help",
        };
        lookup(name).unwrap_or(&COMMANDS[COMMANDS.len() - 1])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingArgument(&'static CommandSpec),
}

impl PartialEq for CommandSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CommandSpec {}

/// Find a command by name or alias, ignoring case.
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    let name = name.to_lowercase();
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.aliases.contains(&name.as_str()))
}

/// Parse `content` as a command invocation under `prefix`.
///
/// `None` when the message is not addressed to a known command.
pub fn parse(content: &str, prefix: &str) -> Option<Result<Command, ParseError>> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let spec = lookup(words.next()?)?;
    let arg = words.next().map(str::to_string);

    let command = match spec.name {
        "ignore" | "unignore" => {
            let Some(channel) = arg else {
                return Some(Err(ParseError::MissingArgument(spec)));
            };
            if spec.name == "ignore" {
                Command::Ignore { channel }
            } else {
                Command::Unignore { channel }
            }
        }
        "import" => Command::Import,
        "clean_db" => Command::CleanDb,
        _ => Command::Help,
    };
    Some(Ok(command))
}

/// First run of digits in `arg`, as in `<#546528012430999552>`.
pub fn parse_channel_id(arg: &str) -> Option<u64> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("valid regex"));
    re.find(arg)
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .filter(|id| *id != 0)
}

pub fn usage(prefix: &str, spec: &CommandSpec) -> String {
    format!(
        "Usage of command '{name}': `{prefix}{name} {args}`\n`<argument>` : Obligatory",
        name = spec.name,
        args = spec.args
    )
}

pub fn help_text(prefix: &str) -> String {
    let mut out = String::from("**Commands**\n");
    for spec in COMMANDS {
        let head = if spec.args.is_empty() {
            format!("{prefix}{}", spec.name)
        } else {
            format!("{prefix}{} {}", spec.name, spec.args)
        };
        out.push_str(&format!("`{head}`: {}", spec.about));
        if !spec.aliases.is_empty() {
            out.push_str(&format!(" (aliases: {})", spec.aliases.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// Run a parsed command and reply in the invoking channel.
pub async fn dispatch(
    app: &Arc<BotContext>,
    ctx: &Context,
    msg: &Message,
    owner: Option<UserId>,
    parsed: Result<Command, ParseError>,
) {
    let spec = match &parsed {
        Ok(cmd) => cmd.spec(),
        Err(ParseError::MissingArgument(spec)) => *spec,
    };
    info!(
        command = spec.name,
        author = %msg.author.name,
        content = %msg.content,
        "command invoked"
    );

    let reply = match check(ctx, msg, owner, spec).await {
        Err(denial) => denial,
        Ok(guild_id) => match parsed {
            Err(ParseError::MissingArgument(spec)) => usage(&app.config.discord.prefix, spec),
            Ok(cmd) => match run(app, ctx, msg, guild_id, cmd).await {
                Ok(text) => text,
                Err(e) => {
                    error!(command = spec.name, error = %e, "command failed");
                    UNKNOWN_ERROR.to_string()
                }
            },
        },
    };

    if let Err(e) = send::send_chunked(&ctx.http, msg.channel_id, &reply).await {
        warn!(command = spec.name, error = %e, "command reply failed");
    }
}

/// Guild and permission gate. Returns the invoking guild, if any.
async fn check(
    ctx: &Context,
    msg: &Message,
    owner: Option<UserId>,
    spec: &CommandSpec,
) -> Result<Option<GuildId>, String> {
    if spec.guild_only && msg.guild_id.is_none() {
        return Err(NO_PRIVATE.to_string());
    }

    let allowed = match spec.requirement {
        Requirement::Anyone => true,
        Requirement::Owner => owner == Some(msg.author.id),
        Requirement::ManageChannels => match msg.guild_id {
            Some(guild_id) => {
                match permissions::has_manage_channels(ctx, guild_id, msg.author.id).await {
                    Ok(allowed) => allowed,
                    Err(e) => {
                        warn!(error = %e, "permission lookup failed");
                        false
                    }
                }
            }
            None => false,
        },
    };

    if allowed {
        Ok(msg.guild_id)
    } else {
        Err(spec.requirement.denial().to_string())
    }
}

async fn run(
    app: &Arc<BotContext>,
    ctx: &Context,
    msg: &Message,
    guild_id: Option<GuildId>,
    cmd: Command,
) -> Result<String, DiscordError> {
    let prefix = &app.config.discord.prefix;
    let Some(guild_id) = guild_id else {
        return Ok(match cmd {
            Command::Help => help_text(prefix),
            _ => NO_PRIVATE.to_string(),
        });
    };

    match cmd {
        Command::Ignore { channel } => ignore(app, ctx, guild_id, &channel).await,
        Command::Unignore { channel } => unignore(app, &channel),
        Command::Import => import(app, ctx, guild_id).await,
        Command::CleanDb => {
            send::send_chunked(&ctx.http, msg.channel_id, "Cleaning the bot's database...")
                .await?;
            let purged = app.store.purge_messages()?;
            info!(purged, guild_id = %guild_id, "archive purged");
            let summary = import(app, ctx, guild_id).await?;
            Ok(format!("Successfully cleaned the bot's database.\n{summary}"))
        }
        Command::Help => Ok(help_text(prefix)),
    }
}

async fn ignore(
    app: &BotContext,
    ctx: &Context,
    guild_id: GuildId,
    arg: &str,
) -> Result<String, DiscordError> {
    let Some(id) = parse_channel_id(arg) else {
        return Ok(format!("Invalid Channel: {arg}"));
    };

    let owner_guild = match ChannelId::new(id).to_channel(ctx).await {
        Ok(Channel::Guild(channel)) => Some(channel.guild_id),
        Ok(_) => None,
        Err(e) => {
            warn!(channel_id = id, error = %e, "ignore target not found");
            None
        }
    };
    match owner_guild {
        None => Ok(format!("Invalid Channel: {arg}")),
        Some(g) if g != guild_id => Ok(
            "You can only ignore channels from the same server you're sending this command."
                .to_string(),
        ),
        Some(_) => {
            if app.store.ignore_channel(id)? {
                Ok(format!("Channel <#{id}> ignored successfully."))
            } else {
                Ok(format!("Channel <#{id}> is already ignored."))
            }
        }
    }
}

fn unignore(app: &BotContext, arg: &str) -> Result<String, DiscordError> {
    let Some(id) = parse_channel_id(arg) else {
        return Ok(format!("Invalid Channel: {arg}"));
    };
    if app.store.unignore_channel(id)? {
        Ok(format!("Channel <#{id}> is no longer being ignored."))
    } else {
        Ok(format!("Channel <#{id}> is already not being ignored."))
    }
}

async fn import(app: &BotContext, ctx: &Context, guild_id: GuildId) -> Result<String, DiscordError> {
    let channels = history::guild_channels(&ctx.http, &ctx.cache, guild_id).await?;
    let source = DiscordHistory::new(Arc::clone(&ctx.http), Arc::clone(&ctx.cache), guild_id);
    let report = app
        .importer
        .import_history(&source, &channels, app.config.import.per_channel_limit)
        .await?;
    info!(guild_id = %guild_id, %report, "guild import finished");
    Ok(format!("Import finished: {report}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_and_aliases_are_case_insensitive() {
        assert_eq!(
            parse("!IGNORE <#42>", "!"),
            Some(Ok(Command::Ignore {
                channel: "<#42>".into()
            }))
        );
        assert_eq!(
            parse("!unignore_channel 42", "!"),
            Some(Ok(Command::Unignore {
                channel: "42".into()
            }))
        );
        assert_eq!(parse("!ReImport", "!"), Some(Ok(Command::Import)));
        assert_eq!(parse("!cleandb", "!"), Some(Ok(Command::CleanDb)));
        assert_eq!(parse("!help", "!"), Some(Ok(Command::Help)));
    }

    #[test]
    fn non_commands_are_not_parsed() {
        assert_eq!(parse("hello there", "!"), None);
        assert_eq!(parse("!dance", "!"), None);
        assert_eq!(parse("!", "!"), None);
        assert_eq!(parse("?help", "!"), None);
        assert_eq!(parse("help", ""), None);
    }

    #[test]
    fn missing_channel_argument_reports_usage() {
        let parsed = parse("!ignore", "!").unwrap();
        let Err(ParseError::MissingArgument(spec)) = parsed else {
            panic!("expected missing argument, got {parsed:?}");
        };
        assert_eq!(spec.name, "ignore");
        assert!(usage("!", spec).contains("`!ignore <channel>`"));
    }

    #[test]
    fn custom_prefix_is_honoured() {
        assert_eq!(parse("tb!import", "tb!"), Some(Ok(Command::Import)));
        assert_eq!(parse("!import", "tb!"), None);
    }

    #[test]
    fn channel_id_is_first_digit_run() {
        assert_eq!(parse_channel_id("<#546528012430999552>"), Some(546528012430999552));
        assert_eq!(parse_channel_id("chan 12 then 34"), Some(12));
        assert_eq!(parse_channel_id("general"), None);
        assert_eq!(parse_channel_id("0"), None);
        assert_eq!(parse_channel_id("99999999999999999999999"), None);
    }

    #[test]
    fn every_command_maps_back_to_its_spec() {
        let commands = [
            Command::Ignore {
                channel: String::new(),
            },
            Command::Unignore {
                channel: String::new(),
            },
            Command::Import,
            Command::CleanDb,
            Command::Help,
        ];
        let names: Vec<&str> = commands.iter().map(|c| c.spec().name).collect();
        assert_eq!(names, ["ignore", "unignore", "import", "clean_db", "help"]);
    }

    #[test]
    fn help_lists_all_commands_with_prefix() {
        let text = help_text("$");
        for spec in COMMANDS {
            assert!(text.contains(&format!("`${}", spec.name)), "{} missing", spec.name);
        }
        assert!(text.contains("ignore_channel"));
    }
}
