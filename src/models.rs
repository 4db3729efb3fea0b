use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    Error,
}

impl Sender {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
            Self::Error => "Error",
        }
    }
}

/// One rendered entry of the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub sent_at: DateTime<Local>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            sent_at: Local::now(),
        }
    }

    /// Content split into display lines. `\r\n` and `\n` both break.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Icon for the toggle control; shows the mode a toggle switches to.
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Light => "☾",
            Self::Dark => "☀",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => anyhow::bail!("unknown theme '{other}'"),
        }
    }
}

/// Which server contract the client speaks. The two are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiProfile {
    /// `POST /send_message`, replies shaped `{choices: [{message: {content}}]}`.
    Completions,
    /// `POST /chat`, replies shaped `{reply}` or `{error}`.
    #[default]
    Reply,
}

impl ApiProfile {
    pub const fn chat_path(self) -> &'static str {
        match self {
            Self::Completions => "/send_message",
            Self::Reply => "/chat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub server_url: String,
    #[serde(default)]
    pub profile: ApiProfile,
    /// No timeout when unset; requests run until they complete or fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hello! How can I help you today?".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".to_string(),
            profile: ApiProfile::default(),
            request_timeout_secs: None,
            greeting: default_greeting(),
        }
    }
}
