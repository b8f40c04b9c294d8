//! Application configuration

pub mod personas;

use std::env;

use serde::{Deserialize, Serialize};

pub use personas::{Persona, PersonaError, PersonaRegistry, PersonaTemplate};

/// Value shipped in `.env.example`; treated the same as a missing key
pub const PLACEHOLDER_API_KEY: &str = "sk-your-key-here";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub model: String,
    /// Overrides every persona's default when set
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: env::var("OPENAI_MODEL")
                .ok()
                .filter(|model| !model.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            max_tokens: parse_nonzero(env::var("OPENAI_MAX_TOKENS").ok()),
            temperature: parse_nonzero(env::var("OPENAI_TEMPERATURE").ok())
                .unwrap_or(DEFAULT_TEMPERATURE),
        })
    }

    /// The provider credential, unless it is missing, blank or the placeholder
    pub fn credential(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != PLACEHOLDER_API_KEY)
    }

    /// Token ceiling for a persona: explicit override, else the persona default
    pub fn max_tokens_for(&self, persona_default: u32) -> u32 {
        self.max_tokens.unwrap_or(persona_default)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            openai_api_key: None,
            openai_base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: None,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Zero and unparsable values fall back to the default, matching the
/// deployed "value or default" behaviour.
fn parse_nonzero<T>(raw: Option<String>) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    raw.and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value != T::default())
}
