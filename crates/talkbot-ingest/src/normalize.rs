use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use talkbot_core::types::{MentionTable, MessageRecord, RawMessage};

/// Messages shorter than this (in characters) are never archived.
pub const MIN_CONTENT_CHARS: usize = 10;

/// Resolves mention ids to the names shown in place of the mention.
///
/// `None` means the id is unknown; the mention is then dropped.
pub trait MentionResolver: Send + Sync {
    fn user_name(&self, user_id: u64) -> Option<String>;
    fn role_name(&self, role_id: u64) -> Option<String>;
}

impl MentionResolver for MentionTable {
    fn user_name(&self, user_id: u64) -> Option<String> {
        self.users.get(&user_id).cloned()
    }

    fn role_name(&self, role_id: u64) -> Option<String> {
        self.roles.get(&role_id).cloned()
    }
}

/// Why a message was not archived. A filtering outcome, never shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BotAuthor,
    RestrictedChannel,
    TooShort,
    Command,
    IgnoredChannel,
    EmptyAfterCleaning,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::BotAuthor => "bot_author",
            Rejection::RestrictedChannel => "restricted_channel",
            Rejection::TooShort => "too_short",
            Rejection::Command => "command",
            Rejection::IgnoredChannel => "ignored_channel",
            Rejection::EmptyAfterCleaning => "empty_after_cleaning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(MessageRecord),
    Rejected(Rejection),
}

/// Filters raw messages and cleans accepted content.
#[derive(Debug, Clone)]
pub struct Normalizer {
    prefixes: Vec<String>,
}

impl Normalizer {
    /// `prefixes` is the active command prefix followed by the fallback set.
    /// Empty prefixes are dropped, they would match every message.
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Apply the rejection rules in order, then clean the content.
    pub fn normalize(
        &self,
        raw: &RawMessage,
        ignored: &HashSet<u64>,
        resolver: &dyn MentionResolver,
    ) -> Verdict {
        if let Some(rejection) = self.check(raw, ignored) {
            return Verdict::Rejected(rejection);
        }

        let content = clean_content(&raw.content, resolver);
        if content.is_empty() {
            return Verdict::Rejected(Rejection::EmptyAfterCleaning);
        }

        Verdict::Accepted(MessageRecord {
            message_id: Some(raw.id),
            content,
            author_name: raw.author.name.clone(),
            author_id: raw.author.id,
            channel_id: Some(raw.channel.id),
            timestamp: raw.timestamp,
        })
    }

    fn check(&self, raw: &RawMessage, ignored: &HashSet<u64>) -> Option<Rejection> {
        if raw.author.bot {
            return Some(Rejection::BotAuthor);
        }
        if raw.channel.nsfw || !raw.channel.kind.bears_text() {
            return Some(Rejection::RestrictedChannel);
        }
        if raw.content.chars().count() < MIN_CONTENT_CHARS {
            return Some(Rejection::TooShort);
        }
        if self.is_command(&raw.content) {
            return Some(Rejection::Command);
        }
        if ignored.contains(&raw.channel.id) {
            return Some(Rejection::IgnoredChannel);
        }
        None
    }

    pub fn is_command(&self, content: &str) -> bool {
        self.prefixes.iter().any(|p| content.starts_with(p.as_str()))
    }
}

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<@([!&]?)(\d+)>").expect("mention pattern is valid"))
}

fn broadcast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@(everyone|here)").expect("broadcast pattern is valid"))
}

/// Substitute user and role mentions, then neutralise broadcast mentions.
///
/// A dropped mention takes one neighbouring space with it, so
/// `"hi <@1> there"` becomes `"hi there"`.
pub fn clean_content(content: &str, resolver: &dyn MentionResolver) -> String {
    let mut out = String::with_capacity(content.len());
    let mut last = 0;

    for caps in mention_re().captures_iter(content) {
        let (Some(whole), Some(kind), Some(id)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        out.push_str(&content[last..whole.start()]);
        last = whole.end();

        let name = id.as_str().parse::<u64>().ok().and_then(|id| {
            if kind.as_str() == "&" {
                resolver.role_name(id)
            } else {
                resolver.user_name(id)
            }
        });

        match name {
            Some(name) => out.push_str(&name),
            None => {
                if out.ends_with(' ') && content[last..].starts_with(' ') {
                    last += 1;
                }
            }
        }
    }
    out.push_str(&content[last..]);

    // Inline code keeps the text visible but never pings when re-posted.
    broadcast_re()
        .replace_all(out.trim(), "`@$1`")
        .into_owned()
}
