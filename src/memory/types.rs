//! Core memory type definitions.
//!
//! [`MemoryType`] and [`SourceType`] are open enums: the well-known labels get
//! their own variants, anything else round-trips through storage untouched via
//! `Other`. [`FilterType`] is closed because it selects behavior.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// What kind of statement a memory holds. Chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryType {
    Preference,
    Fact,
    Setting,
    Skill,
    Reminder,
    Note,
    /// Any label not listed above, stored verbatim.
    Other(String),
}

impl MemoryType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Setting => "setting",
            Self::Skill => "skill",
            Self::Reminder => "reminder",
            Self::Note => "note",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "preference" => Self::Preference,
            "fact" => Self::Fact,
            "setting" => Self::Setting,
            "skill" => Self::Skill,
            "reminder" => Self::Reminder,
            "note" => Self::Note,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Default for MemoryType {
    fn default() -> Self {
        Self::Fact
    }
}

/// Who produced the statement a memory was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceType {
    UserStatement,
    AssistantResponse,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::UserStatement => "user_statement",
            Self::AssistantResponse => "assistant_response",
            Self::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "user_statement" => Self::UserStatement,
            "assistant_response" => Self::AssistantResponse,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Default for SourceType {
    fn default() -> Self {
        Self::UserStatement
    }
}

macro_rules! string_enum_impls {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<&str> for $ty {
            fn from(s: &str) -> Self {
                Self::parse(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::parse(&s))
            }
        }
    };
}

string_enum_impls!(MemoryType);
string_enum_impls!(SourceType);

/// Which sources a search considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Only `user_statement` memories, so the assistant's own echoes stay out.
    #[default]
    UserOnly,
    AssistantOnly,
    /// Every memory of the user, whatever its source.
    All,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserOnly => "user_only",
            Self::AssistantOnly => "assistant_only",
            Self::All => "all",
        }
    }

    /// Source type a memory must have to pass, or `None` for no restriction.
    pub fn source(&self) -> Option<SourceType> {
        match self {
            Self::UserOnly => Some(SourceType::UserStatement),
            Self::AssistantOnly => Some(SourceType::AssistantResponse),
            Self::All => None,
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_only" => Ok(Self::UserOnly),
            "assistant_only" => Ok(Self::AssistantOnly),
            "all" => Ok(Self::All),
            _ => Err(format!(
                "unknown filter_type: {s} (expected user_only, assistant_only or all)"
            )),
        }
    }
}

/// A memory record, matching the `memories` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub source_type: SourceType,
    /// RFC 3339 creation timestamp.
    #[serde(rename = "timestamp")]
    pub created_at: String,
}

/// Input to [`crate::memory::store::add_memory`].
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub source_type: SourceType,
    pub user_id: String,
}

impl NewMemory {
    pub fn new(content: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            memory_type: MemoryType::default(),
            source_type: SourceType::default(),
            user_id: user_id.into(),
        }
    }

    pub fn memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }
}

/// A logged chat exchange.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: String,
    pub message: String,
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timestamp: String,
}
