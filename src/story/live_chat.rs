//! Free-form chat once the terminal exchange is reached
//!
//! A submit appends the visitor turn, posts the whole live transcript to the
//! relay and appends whatever comes back. Failures never surface raw: the
//! narrator apologises in character instead.

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Persona;
use crate::conversation::{Message as WireMessage, RelayReply, RelayRequest};
use crate::core::replies;

use super::state::{Speaker, StoryStore};

/// Prompts offered as chips above the live chat input
pub const LIVE_SUGGESTIONS: [&str; 6] = [
    "Tell me about storyATL",
    "Who are the five voices?",
    "How does the booth work?",
    "Tell me about Creative Context",
    "What is the PAFL application?",
    "Tell me about Atlanta",
];

/// Narrator line used when the relay can't be reached or read
pub const FALLBACK_REPLY: &str = replies::TROUBLE_CONNECTING;

#[derive(Debug, thiserror::Error)]
pub enum RelayClientError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unreadable reply (status {status}): {reason}")]
    InvalidReply { status: u16, reason: String },
}

/// Sends a live transcript to a relay persona
#[async_trait]
pub trait RelayClient: Send + Sync {
    async fn send(
        &self,
        persona: Persona,
        request: &RelayRequest,
    ) -> Result<RelayReply, RelayClientError>;
}

/// Relay client over HTTP
pub struct HttpRelayClient {
    base_url: String,
    client: Client,
}

impl HttpRelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, RelayClientError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn endpoint(&self, persona: Persona) -> String {
        format!("{}/relay/{}", self.base_url, persona.segment())
    }
}

#[async_trait]
impl RelayClient for HttpRelayClient {
    async fn send(
        &self,
        persona: Persona,
        request: &RelayRequest,
    ) -> Result<RelayReply, RelayClientError> {
        let response = self
            .client
            .post(self.endpoint(persona))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        // Error bodies carry an in-character message too, so show them
        let reply: RelayReply =
            serde_json::from_slice(&body).map_err(|e| RelayClientError::InvalidReply {
                status: status.as_u16(),
                reason: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::warn!(
                persona = %persona,
                status = status.as_u16(),
                "relay answered with an error"
            );
        }

        Ok(reply)
    }
}

/// Client-side state of the live chat
#[derive(Debug, Clone)]
pub struct LiveChat {
    persona: Persona,
    pending: bool,
}

impl Default for LiveChat {
    fn default() -> Self {
        Self::new(Persona::Story)
    }
}

impl LiveChat {
    pub fn new(persona: Persona) -> Self {
        Self {
            persona,
            pending: false,
        }
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// A request is in flight; further submits are refused
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record the visitor turn and build the relay request.
    ///
    /// Returns `None` for blank input, while a request is pending, or before
    /// the terminal exchange.
    pub fn begin_submit(&mut self, store: &mut StoryStore, text: &str) -> Option<RelayRequest> {
        let text = text.trim();
        if text.is_empty() || self.pending {
            return None;
        }
        if store.state().current_exchange != store.script().terminal() {
            return None;
        }

        let mut messages: Vec<WireMessage> = store
            .state()
            .live_chat_messages
            .iter()
            .map(|m| match m.speaker {
                Speaker::Visitor => WireMessage::user(m.text.as_str()),
                Speaker::Narrator => WireMessage::assistant(m.text.as_str()),
            })
            .collect();
        messages.push(WireMessage::user(text));

        store.add_live_message(Speaker::Visitor, text);
        store.set_typing(true);
        self.pending = true;

        Some(RelayRequest { messages })
    }

    /// Append the narrator's answer and clear the pending state, whatever the outcome
    pub fn finish_submit(
        &mut self,
        store: &mut StoryStore,
        outcome: Result<RelayReply, RelayClientError>,
    ) {
        let text = match outcome {
            Ok(reply) => reply.message,
            Err(err) => {
                tracing::warn!(error = %err, "live chat relay failed");
                FALLBACK_REPLY.to_string()
            }
        };
        store.add_live_message(Speaker::Narrator, text);
        self.pending = false;
        store.set_typing(false);
    }

    /// Submit and wait for the reply; false if the submit was refused
    pub async fn submit(
        &mut self,
        store: &mut StoryStore,
        client: &dyn RelayClient,
        text: &str,
    ) -> bool {
        let Some(request) = self.begin_submit(store, text) else {
            return false;
        };
        let outcome = client.send(self.persona, &request).await;
        self.finish_submit(store, outcome);
        true
    }
}
