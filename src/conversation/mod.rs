//! Relay wire types shared by the server, the provider client and the live chat client

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entries forwarded to the provider after truncation
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Map a client-supplied role string.
    ///
    /// Only `"assistant"` is honoured verbatim; anything else (including
    /// `"system"`) is treated as a visitor turn so clients cannot smuggle
    /// instructions ahead of the persona prompt.
    pub fn from_client(role: &str) -> Self {
        match role {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body sent by the live chat client: `{ "messages": [...] }`
#[derive(Debug, Clone, Serialize)]
pub struct RelayRequest {
    pub messages: Vec<Message>,
}

/// Body returned by every relay response, success or failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayReply {
    pub message: String,
}

/// Shape check for an untyped relay body.
///
/// Returns `None` unless `messages` is an array whose entries all carry a
/// string `role` and a string `content`.
pub fn validate_history(body: &Value) -> Option<Vec<Message>> {
    let entries = body.get("messages")?.as_array()?;

    entries
        .iter()
        .map(|entry| {
            let role = entry.get("role")?.as_str()?;
            let content = entry.get("content")?.as_str()?;
            Some(Message {
                role: Role::from_client(role),
                content: content.to_string(),
            })
        })
        .collect()
}

/// Keep only the most recent `limit` entries, preserving order
pub fn truncate_history(mut history: Vec<Message>, limit: usize) -> Vec<Message> {
    if history.len() > limit {
        history.drain(..history.len() - limit);
    }
    history
}
