use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TalkbotError};

pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_INTERVAL_SECS: u64 = 300; // one phrase every 5 minutes
pub const DEFAULT_WORD_COUNT: usize = 30;
pub const DEFAULT_PER_CHANNEL_LIMIT: usize = 5000;

/// Top-level config (talkbot.toml + TALKBOT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TalkbotConfig {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub phrase: PhraseConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: String,
    /// Active command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Prefixes of other bots; messages starting with one are never archived.
    #[serde(default = "default_fallback_prefixes")]
    pub fallback_prefixes: Vec<String>,
    /// Channel that receives generated phrases.
    pub messages_channel_id: u64,
}

impl DiscordConfig {
    /// Active prefix followed by the fallback set, empty entries removed.
    pub fn command_prefixes(&self) -> Vec<String> {
        std::iter::once(&self.prefix)
            .chain(self.fallback_prefixes.iter())
            .filter(|p| !p.is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseConfig {
    /// Seconds between two generated phrases.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Number of words appended after the seed word.
    #[serde(default = "default_word_count")]
    pub word_count: usize,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            word_count: DEFAULT_WORD_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Import every visible text channel's history once the bot is ready.
    #[serde(default = "bool_true")]
    pub on_startup: bool,
    /// Most recent messages fetched per channel.
    #[serde(default = "default_per_channel_limit")]
    pub per_channel_limit: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            on_startup: true,
            per_channel_limit: DEFAULT_PER_CHANNEL_LIMIT,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}
fn default_fallback_prefixes() -> Vec<String> {
    ["?", "/", ".", "$", ">"].iter().map(|p| p.to_string()).collect()
}
fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}
fn default_word_count() -> usize {
    DEFAULT_WORD_COUNT
}
fn default_per_channel_limit() -> usize {
    DEFAULT_PER_CHANNEL_LIMIT
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.talkbot/talkbot.db", home)
}

impl TalkbotConfig {
    /// Load config from a TOML file with TALKBOT_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `TALKBOT_DISCORD__BOT_TOKEN` or `TALKBOT_PHRASE__INTERVAL_SECS`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("TALKBOT_").split("__")),
        )
    }

    /// Extract and validate a config from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: TalkbotConfig = figment
            .extract()
            .map_err(|e| TalkbotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.trim().is_empty() {
            return Err(TalkbotError::Config("discord.bot_token is empty".into()));
        }
        if self.discord.prefix.is_empty() {
            return Err(TalkbotError::Config("discord.prefix is empty".into()));
        }
        if self.discord.messages_channel_id == 0 {
            return Err(TalkbotError::Config(
                "discord.messages_channel_id must be a channel id".into(),
            ));
        }
        if self.phrase.interval_secs == 0 {
            return Err(TalkbotError::Config(
                "phrase.interval_secs must be greater than zero".into(),
            ));
        }
        if self.import.per_channel_limit == 0 {
            return Err(TalkbotError::Config(
                "import.per_channel_limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.talkbot/talkbot.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Result<TalkbotConfig> {
        TalkbotConfig::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let cfg = parse(
            r#"
            [discord]
            bot_token = "abc"
            messages_channel_id = 42
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.discord.prefix, "!");
        assert_eq!(cfg.phrase.interval_secs, 300);
        assert_eq!(cfg.phrase.word_count, 30);
        assert_eq!(cfg.import.per_channel_limit, 5000);
        assert!(cfg.import.on_startup);
    }

    #[test]
    fn non_numeric_interval_is_config_error() {
        let err = parse(
            r#"
            [discord]
            bot_token = "abc"
            messages_channel_id = 42
            [phrase]
            interval_secs = "soon"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, TalkbotError::Config(_)));
    }

    #[test]
    fn missing_channel_is_config_error() {
        let err = parse(
            r#"
            [discord]
            bot_token = "abc"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("messages_channel_id"), "{err}");
    }

    #[test]
    fn zero_interval_rejected() {
        let err = parse(
            r#"
            [discord]
            bot_token = "abc"
            messages_channel_id = 42
            [phrase]
            interval_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("interval_secs"));
    }

    #[test]
    fn command_prefixes_skip_empty_entries() {
        let cfg = parse(
            r#"
            [discord]
            bot_token = "abc"
            messages_channel_id = 42
            prefix = "tb!"
            fallback_prefixes = ["", "?"]
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.discord.command_prefixes(), vec!["tb!", "?"]);
    }
}
