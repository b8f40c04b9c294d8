//! storyATL - guided conversation core and LLM relay
//!
//! The [`story`] module is the client-side core: a scripted ten-exchange
//! conversation, its reducer, timed choreography and live chat. The rest of
//! the crate is the relay service the live chat talks to: persona prompts
//! assembled from static knowledge, a rate-limited handler and an
//! OpenAI-compatible provider.

use std::sync::Arc;

pub mod config;
pub mod conversation;
pub mod core;
pub mod knowledge;
pub mod providers;
pub mod routes;
pub mod story;

use crate::core::RelayEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayEngine>,
}
