//! Shared types used across promptgate crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a conversation turn is attributed to.
///
/// Unknown roles are kept verbatim in [`Role::Other`] so nothing is lost when
/// a provider introduces a new role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Function,
    Developer,
    Other(String),
}

/// Ordering group a role belongs to when turns are sent to a detector.
///
/// Groups sort ascending: system content first, then user content, then
/// everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderGroup {
    System = 0,
    User = 1,
    Context = 2,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Function => "function",
            Role::Developer => "developer",
            Role::Other(name) => name,
        }
    }

    /// Canonical ordering group for this role.
    pub fn order_group(&self) -> OrderGroup {
        match self {
            Role::System => OrderGroup::System,
            Role::User => OrderGroup::User,
            Role::Assistant | Role::Tool | Role::Function | Role::Developer | Role::Other(_) => {
                OrderGroup::Context
            }
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            "function" => Role::Function,
            "developer" => Role::Developer,
            other => Role::Other(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match Role::from(s.as_str()) {
            Role::Other(_) => Role::Other(s),
            known => known,
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation ID tying log lines of one guardrail invocation together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generate a fresh random correlation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an ID supplied by the gateway (e.g. an `x-request-id` header)
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
