//! Stateless relay from a visitor conversation to the completion provider
//!
//! The RelayEngine is the whole backend contract. For each request it:
//! 1. Applies the per-client rate limit
//! 2. Refuses to call out when no credential is configured
//! 3. Parses and shape-checks the body
//! 4. Keeps the last ten turns and prepends the persona's cached system prompt
//! 5. Calls the provider and returns exactly one reply
//!
//! Every failure collapses into a [`RelayError`] carrying one fixed,
//! in-character message. Provider payloads never reach the visitor.

use std::sync::Arc;

use crate::config::{Config, Persona, PersonaRegistry};
use crate::conversation::{self, Message, RelayReply, HISTORY_LIMIT};
use crate::providers::{CompletionProvider, CompletionSettings, ProviderError};

use super::rate_limit::RateLimiter;

/// Fixed visitor-facing replies
pub mod replies {
    pub const INVALID_BODY: &str = "Invalid request body.";
    pub const INVALID_FORMAT: &str = "Invalid messages format.";
    pub const RATE_LIMITED: &str =
        "I'm getting a lot of questions right now. Give me a moment and try again.";
    pub const NOT_CONFIGURED: &str =
        "I'm having trouble connecting right now. The API key hasn't been configured yet.";
    pub const AUTH_ISSUE: &str =
        "I'm having trouble connecting right now. There's an authentication issue on my end.";
    pub const TROUBLE_CONNECTING: &str =
        "I'm having trouble connecting right now. Try again in a moment.";
    pub const LOST_WORDS: &str = "I'm here, but I lost my words for a moment. Ask me again.";
    pub const NOT_FOUND: &str = "Not found.";
}

/// Errors from the relay, each tied to one status and one message
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("request body is not valid JSON")]
    InvalidBody,

    #[error("messages array failed the shape check")]
    InvalidFormat,

    #[error("client exceeded the local rate limit")]
    RateLimited,

    #[error("provider credential missing")]
    NotConfigured,

    #[error("provider rejected the credential")]
    UpstreamAuth,

    #[error("provider rate limited the relay")]
    UpstreamRateLimited,

    #[error("provider call failed")]
    Upstream,
}

impl RelayError {
    pub fn status(&self) -> u16 {
        match self {
            RelayError::InvalidBody | RelayError::InvalidFormat => 400,
            RelayError::RateLimited | RelayError::UpstreamRateLimited => 429,
            RelayError::NotConfigured => 503,
            RelayError::UpstreamAuth => 401,
            RelayError::Upstream => 500,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            RelayError::InvalidBody => replies::INVALID_BODY,
            RelayError::InvalidFormat => replies::INVALID_FORMAT,
            RelayError::RateLimited | RelayError::UpstreamRateLimited => replies::RATE_LIMITED,
            RelayError::NotConfigured => replies::NOT_CONFIGURED,
            RelayError::UpstreamAuth => replies::AUTH_ISSUE,
            RelayError::Upstream => replies::TROUBLE_CONNECTING,
        }
    }
}

impl From<ProviderError> for RelayError {
    fn from(err: ProviderError) -> Self {
        if let ProviderError::NotConfigured(_) = err {
            return RelayError::NotConfigured;
        }
        match err.status() {
            Some(401) => RelayError::UpstreamAuth,
            Some(429) => RelayError::UpstreamRateLimited,
            _ => RelayError::Upstream,
        }
    }
}

/// The relay shared by every persona endpoint
pub struct RelayEngine {
    config: Config,
    personas: PersonaRegistry,
    limiter: RateLimiter,
    provider: Arc<dyn CompletionProvider>,
}

impl RelayEngine {
    pub fn new(
        config: Config,
        personas: PersonaRegistry,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            config,
            personas,
            limiter: RateLimiter::default(),
            provider,
        }
    }

    /// Replace the default limiter
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process one relay request for `persona` from `client_key`
    pub async fn relay(
        &self,
        persona: Persona,
        client_key: &str,
        body: &[u8],
    ) -> Result<RelayReply, RelayError> {
        if self.limiter.check(client_key).limited {
            tracing::warn!(client = %client_key, persona = %persona, "rate limited");
            return Err(RelayError::RateLimited);
        }

        if self.config.credential().is_none() {
            tracing::warn!(persona = %persona, "relay called without a provider credential");
            return Err(RelayError::NotConfigured);
        }

        let body: serde_json::Value = serde_json::from_slice(body).map_err(|_| {
            tracing::debug!(persona = %persona, "rejected unparsable body");
            RelayError::InvalidBody
        })?;

        let history = conversation::validate_history(&body).ok_or_else(|| {
            tracing::debug!(persona = %persona, "rejected malformed messages");
            RelayError::InvalidFormat
        })?;

        let prompt = self.personas.get(persona).ok_or_else(|| {
            tracing::error!(persona = %persona, "no system prompt assembled for persona");
            RelayError::Upstream
        })?;

        let recent = conversation::truncate_history(history, HISTORY_LIMIT);
        let turns = recent.len();

        let mut messages = Vec::with_capacity(turns + 1);
        messages.push(Message::system(prompt.system_prompt.as_str()));
        messages.extend(recent);

        let settings = CompletionSettings {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens_for(prompt.max_tokens),
            temperature: self.config.temperature,
        };

        let reply = self
            .provider
            .complete(&messages, &settings)
            .await
            .map_err(|e| {
                tracing::error!(
                    persona = %persona,
                    status = ?e.status(),
                    error = %e,
                    "provider call failed"
                );
                RelayError::from(e)
            })?;

        let message = reply
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| replies::LOST_WORDS.to_string());

        tracing::debug!(persona = %persona, turns, "relayed reply");

        Ok(RelayReply { message })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::personas::PersonaPrompt;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider stub that records what it was sent
    pub(crate) struct StubProvider {
        pub outcome: Mutex<Option<Result<Option<String>, ProviderError>>>,
        pub seen: Mutex<Vec<(Vec<Message>, CompletionSettings)>>,
    }

    impl StubProvider {
        pub fn replying(text: &str) -> Arc<Self> {
            Self::with(Ok(Some(text.to_string())))
        }

        pub fn with(outcome: Result<Option<String>, ProviderError>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Mutex::new(Some(outcome)),
                seen: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(
            &self,
            messages: &[Message],
            settings: &CompletionSettings,
        ) -> Result<Option<String>, ProviderError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), settings.clone()));
            self.outcome
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Ok(Some("again".to_string())))
        }
    }

    pub(crate) fn test_personas() -> PersonaRegistry {
        PersonaRegistry::from_prompts(Persona::ALL.map(|persona| PersonaPrompt {
            persona,
            name: persona.to_string(),
            system_prompt: format!("prompt for {}", persona),
            max_tokens: if persona == Persona::About { 400 } else { 300 },
        }))
    }

    pub(crate) fn configured() -> Config {
        Config {
            openai_api_key: Some("sk-test".into()),
            ..Config::default()
        }
    }

    fn engine(config: Config, provider: Arc<StubProvider>) -> RelayEngine {
        RelayEngine::new(config, test_personas(), provider)
    }

    const HI: &[u8] = br#"{"messages":[{"role":"user","content":"hi"}]}"#;

    #[tokio::test]
    async fn test_missing_credential_is_503() {
        let provider = StubProvider::replying("unused");
        let relay = engine(Config::default(), provider.clone());

        let err = relay.relay(Persona::Story, "1.2.3.4", HI).await.unwrap_err();
        assert_eq!(err, RelayError::NotConfigured);
        assert_eq!(err.status(), 503);
        assert_eq!(
            err.user_message(),
            "I'm having trouble connecting right now. The API key hasn't been configured yet."
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let relay = engine(configured(), StubProvider::replying("unused"));

        let err = relay.relay(Persona::Story, "ip", b"{not json").await.unwrap_err();
        assert_eq!(err, RelayError::InvalidBody);
        assert_eq!(err.status(), 400);
        assert_eq!(err.user_message(), "Invalid request body.");
    }

    #[tokio::test]
    async fn test_bad_shape_is_400() {
        let relay = engine(configured(), StubProvider::replying("unused"));

        let err = relay
            .relay(Persona::Wiki, "ip", br#"{"messages":[{"role":"user"}]}"#)
            .await
            .unwrap_err();
        assert_eq!(err, RelayError::InvalidFormat);
        assert_eq!(err.user_message(), "Invalid messages format.");
    }

    #[tokio::test]
    async fn test_success_prepends_prompt_and_truncates() {
        let provider = StubProvider::replying("My neighborhoods remember.");
        let relay = engine(configured(), provider.clone());

        let turns: Vec<_> = (0..12)
            .map(|i| serde_json::json!({ "role": "user", "content": format!("q{}", i) }))
            .collect();
        let body = serde_json::to_vec(&serde_json::json!({ "messages": turns })).unwrap();

        let reply = relay.relay(Persona::About, "ip", &body).await.unwrap();
        assert_eq!(reply.message, "My neighborhoods remember.");

        let seen = provider.seen.lock().unwrap();
        let (messages, settings) = &seen[0];
        assert_eq!(messages.len(), 11);
        assert_eq!(messages[0], Message::system("prompt for about"));
        assert_eq!(messages[1].content, "q2");
        assert_eq!(settings.max_tokens, 400);
        assert_eq!(settings.model, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_empty_reply_replaced() {
        for outcome in [Ok(None), Ok(Some("   ".to_string()))] {
            let relay = engine(configured(), StubProvider::with(outcome));
            let reply = relay.relay(Persona::Story, "ip", HI).await.unwrap();
            assert_eq!(reply.message, replies::LOST_WORDS);
        }
    }

    #[tokio::test]
    async fn test_upstream_failures_are_masked() {
        let cases = [
            (401, RelayError::UpstreamAuth, 401),
            (429, RelayError::UpstreamRateLimited, 429),
            (500, RelayError::Upstream, 500),
            (404, RelayError::Upstream, 500),
        ];

        for (upstream, expected, status) in cases {
            let provider = StubProvider::with(Err(ProviderError::Upstream {
                status: upstream,
                message: "secret provider detail".into(),
            }));
            let relay = engine(configured(), provider);

            let err = relay.relay(Persona::Story, "ip", HI).await.unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(err.status(), status);
            assert!(!err.user_message().contains("secret"));
        }
    }

    #[tokio::test]
    async fn test_upstream_rate_limit_matches_local_wording() {
        assert_eq!(
            RelayError::UpstreamRateLimited.user_message(),
            RelayError::RateLimited.user_message()
        );
    }

    #[tokio::test]
    async fn test_rate_limit_applies_before_everything() {
        let relay = engine(Config::default(), StubProvider::replying("unused"));

        for _ in 0..20 {
            assert_eq!(
                relay.relay(Persona::Story, "9.9.9.9", b"junk").await.unwrap_err(),
                RelayError::NotConfigured
            );
        }
        assert_eq!(
            relay.relay(Persona::Story, "9.9.9.9", b"junk").await.unwrap_err(),
            RelayError::RateLimited
        );
    }

    #[test]
    fn test_invalid_response_maps_to_generic() {
        let err = RelayError::from(ProviderError::InvalidResponse("bad".into()));
        assert_eq!(err, RelayError::Upstream);
    }
}
