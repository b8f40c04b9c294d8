//! Conversation state and the reducer that transitions it
//!
//! [`apply`] is the only way state changes. It is pure, synchronous and
//! total: out-of-range input is clamped, never rejected, so no sequence of
//! actions can leave the story in a broken position.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::script::{clamp_index, ExchangeScript, RichComponent};

/// Who is speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Visitor,
    Narrator,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Visitor => f.write_str("visitor"),
            Speaker::Narrator => f.write_str("narrator"),
        }
    }
}

/// One chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub speaker: Speaker,
    pub text: String,
    /// Exchange section this message renders in
    pub exchange: usize,
    #[serde(default)]
    pub component: Option<RichComponent>,
    /// Already fully shown; the view must not replay a reveal animation
    #[serde(default)]
    pub revealed: bool,
}

impl Message {
    /// A message produced by the live choreography
    pub fn scripted(
        speaker: Speaker,
        text: impl Into<String>,
        exchange: usize,
        component: Option<RichComponent>,
    ) -> Self {
        Self {
            id: format!("{}-{}-{}", speaker, exchange, Uuid::new_v4()),
            speaker,
            text: text.into(),
            exchange,
            component,
            revealed: false,
        }
    }

    /// A free-form live chat turn
    pub fn live(speaker: Speaker, text: impl Into<String>, terminal: usize) -> Self {
        Self {
            id: format!("live-{}-{}", speaker, Uuid::new_v4()),
            speaker,
            text: text.into(),
            exchange: terminal,
            component: None,
            revealed: true,
        }
    }

    /// A canned message synthesized when skipping ahead
    fn populated(
        speaker: Speaker,
        text: &str,
        exchange: usize,
        component: Option<RichComponent>,
    ) -> Self {
        Self {
            id: format!("{}-{}-pop", speaker, exchange),
            speaker,
            text: text.to_string(),
            exchange,
            component,
            revealed: true,
        }
    }
}

/// A clicked suggestion being typed back into the visitor bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSuggestion {
    pub text: String,
    /// The exchange whose suggestion chip was clicked
    pub exchange_id: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }
}

/// The single mutable aggregate of one conversation session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub current_exchange: usize,
    /// Exchange whose visual is displayed; may trail `current_exchange` while scrolling
    pub visual_exchange: usize,
    /// Furthest exchange unlocked by forward navigation
    pub highest_reached: usize,
    pub messages: Vec<Message>,
    pub live_chat_messages: Vec<Message>,
    pub is_narrator_typing: bool,
    /// Gates the first suggestion chip until the greeting has finished revealing
    pub auto_type_complete: bool,
    pub pending_suggestion: Option<PendingSuggestion>,
    pub theme: ThemeMode,
}

impl ConversationState {
    pub fn has_message(&self, exchange: usize, speaker: Speaker) -> bool {
        self.messages
            .iter()
            .any(|m| m.exchange == exchange && m.speaker == speaker)
    }

    pub fn has_narrator_message(&self, exchange: usize) -> bool {
        self.has_message(exchange, Speaker::Narrator)
    }
}

/// The closed set of transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Step forward one exchange after a scripted reveal
    Advance,
    /// Revisit an already unlocked exchange
    Jump(isize),
    /// Skip to an exchange, back-filling any history it passes over
    PopulateAndJump(isize),
    AddMessage(Message),
    AddLiveMessage(Message),
    SetTyping(bool),
    SetAutoTypeComplete(bool),
    SetPendingSuggestion(Option<PendingSuggestion>),
    /// Scroll-driven visual selection; ignored on the terminal exchange
    SetVisualExchange(isize),
    ToggleTheme,
    SetTheme(ThemeMode),
    /// Back to a fresh conversation, keeping the theme
    Reset,
}

/// Apply one action, returning the next state
pub fn apply(
    script: &ExchangeScript,
    mut state: ConversationState,
    action: Action,
) -> ConversationState {
    let terminal = script.terminal();

    match action {
        Action::Advance => {
            let next = (state.current_exchange + 1).min(terminal);
            state.current_exchange = next;
            state.visual_exchange = next;
            state.highest_reached = state.highest_reached.max(next);
        }
        Action::Jump(raw) => {
            let target = clamp_index(raw, state.highest_reached);
            if target == 0 && state.current_exchange > 0 && state.has_narrator_message(0) {
                // Returning to a greeting that has already been delivered
                state.auto_type_complete = true;
            }
            state.current_exchange = target;
            state.visual_exchange = target;
        }
        Action::PopulateAndJump(raw) => {
            let target = script.clamp(raw);
            for exchange in script.iter().take(target + 1) {
                if state.has_narrator_message(exchange.id) {
                    continue;
                }
                if let Some(question) = exchange.visitor_question() {
                    if !state.has_message(exchange.id, Speaker::Visitor) {
                        state.messages.push(Message::populated(
                            Speaker::Visitor,
                            question,
                            exchange.id,
                            None,
                        ));
                    }
                }
                state.messages.push(Message::populated(
                    Speaker::Narrator,
                    &exchange.scripted_response,
                    exchange.id,
                    exchange.component,
                ));
            }
            state.current_exchange = target;
            state.visual_exchange = target;
            state.highest_reached = state.highest_reached.max(target);
            state.auto_type_complete = true;
        }
        Action::AddMessage(message) => {
            // One visitor turn and one narrator turn per exchange
            if !state.has_message(message.exchange, message.speaker) {
                state.messages.push(message);
            }
        }
        Action::AddLiveMessage(mut message) => {
            message.exchange = terminal;
            state.live_chat_messages.push(message);
        }
        Action::SetTyping(typing) => state.is_narrator_typing = typing,
        Action::SetAutoTypeComplete(complete) => state.auto_type_complete = complete,
        Action::SetPendingSuggestion(pending) => state.pending_suggestion = pending,
        Action::SetVisualExchange(raw) => {
            if state.current_exchange != terminal {
                state.visual_exchange = clamp_index(raw, terminal);
            }
        }
        Action::ToggleTheme => state.theme = state.theme.toggled(),
        Action::SetTheme(theme) => state.theme = theme,
        Action::Reset => {
            state = ConversationState {
                theme: state.theme,
                ..ConversationState::default()
            };
        }
    }

    state
}

/// Owns one session's script and state; every mutation goes through [`apply`]
#[derive(Debug, Clone)]
pub struct StoryStore {
    script: Arc<ExchangeScript>,
    state: ConversationState,
}

impl StoryStore {
    pub fn new(script: Arc<ExchangeScript>) -> Self {
        Self {
            script,
            state: ConversationState::default(),
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn script(&self) -> &ExchangeScript {
        &self.script
    }

    pub fn shared_script(&self) -> Arc<ExchangeScript> {
        Arc::clone(&self.script)
    }

    pub fn dispatch(&mut self, action: Action) {
        tracing::trace!(?action, "dispatch");
        let state = std::mem::take(&mut self.state);
        self.state = apply(&self.script, state, action);
    }

    pub fn advance(&mut self) {
        self.dispatch(Action::Advance);
    }

    /// Timeline dot: revisit an unlocked exchange
    pub fn jump_to(&mut self, exchange: isize) {
        self.dispatch(Action::Jump(exchange));
    }

    pub fn go_back(&mut self) {
        let target = self.state.current_exchange as isize - 1;
        self.dispatch(Action::Jump(target));
    }

    pub fn go_forward(&mut self) {
        if self.state.current_exchange < self.script.terminal() {
            let target = self.state.current_exchange as isize + 1;
            self.dispatch(Action::PopulateAndJump(target));
        }
    }

    pub fn add_message(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        exchange: usize,
        component: Option<RichComponent>,
    ) {
        self.dispatch(Action::AddMessage(Message::scripted(
            speaker, text, exchange, component,
        )));
    }

    pub fn add_live_message(&mut self, speaker: Speaker, text: impl Into<String>) {
        let terminal = self.script.terminal();
        self.dispatch(Action::AddLiveMessage(Message::live(speaker, text, terminal)));
    }

    pub fn set_typing(&mut self, typing: bool) {
        self.dispatch(Action::SetTyping(typing));
    }

    pub fn toggle_theme(&mut self) {
        self.dispatch(Action::ToggleTheme);
    }

    pub fn reset(&mut self) {
        self.dispatch(Action::Reset);
    }
}
