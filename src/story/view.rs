//! Pure selectors the presentation layer renders from
//!
//! Nothing here mutates state. Rich components and per-exchange visuals are
//! supplied by the host through [`RenderTargets`].

use std::collections::{BTreeMap, HashMap};

use super::script::{Exchange, ExchangeScript, RichComponent};
use super::state::{ConversationState, Message, Speaker};

pub const PLACEHOLDER_THINKING: &str = "Atlanta is thinking...";
pub const PLACEHOLDER_CONTINUE: &str = "Keep asking...";
pub const PLACEHOLDER_FIRST: &str = "Ask Atlanta anything...";

/// Which "someone is typing" affordance is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThinkingIndicator {
    None,
    NarratorTyping,
    /// A clicked suggestion is typing itself out
    VisitorTyping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineDot<'a> {
    pub exchange: usize,
    pub label: &'a str,
    pub active: bool,
}

/// Exchanges rendered in the thread
pub fn visible_exchanges<'a>(
    script: &'a ExchangeScript,
    state: &ConversationState,
) -> impl Iterator<Item = &'a Exchange> + 'a {
    let current = state.current_exchange;
    script.iter().filter(move |e| e.id <= current)
}

pub fn messages_by_exchange(state: &ConversationState) -> BTreeMap<usize, Vec<&Message>> {
    let mut grouped: BTreeMap<usize, Vec<&Message>> = BTreeMap::new();
    for message in &state.messages {
        grouped.entry(message.exchange).or_default().push(message);
    }
    grouped
}

/// Whether the suggestion chip under `exchange_id` is offered
pub fn show_suggestion(
    script: &ExchangeScript,
    state: &ConversationState,
    exchange_id: usize,
) -> bool {
    let Some(exchange) = script.get(exchange_id) else {
        return false;
    };
    exchange_id == state.current_exchange
        && exchange.suggestion.is_some()
        && state.has_narrator_message(exchange_id)
        && !state.has_narrator_message(exchange_id + 1)
        && !state.is_narrator_typing
        && state.pending_suggestion.is_none()
        && (exchange_id != 0 || state.auto_type_complete)
}

/// The typing indicator inside an exchange section
pub fn show_exchange_typing(
    script: &ExchangeScript,
    state: &ConversationState,
    exchange_id: usize,
) -> bool {
    state.is_narrator_typing
        && exchange_id == state.current_exchange
        && !(exchange_id == script.terminal() && !state.live_chat_messages.is_empty())
}

/// The typing indicator under the live chat transcript
pub fn show_live_typing(script: &ExchangeScript, state: &ConversationState) -> bool {
    state.is_narrator_typing
        && state.current_exchange == script.terminal()
        && !state.live_chat_messages.is_empty()
}

pub fn thinking_indicator(state: &ConversationState) -> ThinkingIndicator {
    if state.is_narrator_typing {
        ThinkingIndicator::NarratorTyping
    } else if state.pending_suggestion.is_some() {
        ThinkingIndicator::VisitorTyping
    } else {
        ThinkingIndicator::None
    }
}

/// Whether the greeting bubble should run its reveal animation
pub fn is_animated_greeting(state: &ConversationState, message: &Message) -> bool {
    message.exchange == 0
        && message.speaker == Speaker::Narrator
        && !message.revealed
        && !state.auto_type_complete
}

pub fn can_go_back(state: &ConversationState) -> bool {
    state.current_exchange > 0
}

pub fn can_go_forward(script: &ExchangeScript, state: &ConversationState) -> bool {
    state.current_exchange < script.terminal()
}

/// `n/N` with a one-based `n`
pub fn counter(script: &ExchangeScript, state: &ConversationState) -> String {
    format!("{}/{}", state.current_exchange + 1, script.len())
}

/// Timeline fill, `0.0` on the first exchange and `1.0` on the terminal
pub fn progress(script: &ExchangeScript, state: &ConversationState) -> f64 {
    let terminal = script.terminal();
    if terminal == 0 {
        return 1.0;
    }
    state.current_exchange as f64 / terminal as f64
}

pub fn timeline<'a>(script: &'a ExchangeScript, state: &ConversationState) -> Vec<TimelineDot<'a>> {
    script
        .iter()
        .map(|e| TimelineDot {
            exchange: e.id,
            label: &e.label,
            active: e.id == state.visual_exchange,
        })
        .collect()
}

/// Inline visuals only render within one exchange of the visual panel
pub fn is_near_visual(state: &ConversationState, exchange_id: usize) -> bool {
    exchange_id.abs_diff(state.visual_exchange) <= 1
}

pub fn show_live_input(script: &ExchangeScript, state: &ConversationState) -> bool {
    state.current_exchange == script.terminal()
}

pub fn live_placeholder(state: &ConversationState, loading: bool) -> &'static str {
    if loading {
        PLACEHOLDER_THINKING
    } else if state.live_chat_messages.is_empty() {
        PLACEHOLDER_FIRST
    } else {
        PLACEHOLDER_CONTINUE
    }
}

/// Presentation-supplied values keyed by exchange id and rich component tag
#[derive(Debug, Clone)]
pub struct RenderTargets<T> {
    visuals: HashMap<usize, T>,
    components: HashMap<RichComponent, T>,
}

impl<T> Default for RenderTargets<T> {
    fn default() -> Self {
        Self {
            visuals: HashMap::new(),
            components: HashMap::new(),
        }
    }
}

impl<T> RenderTargets<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_visual(mut self, exchange: usize, target: T) -> Self {
        self.visuals.insert(exchange, target);
        self
    }

    pub fn with_component(mut self, component: RichComponent, target: T) -> Self {
        self.components.insert(component, target);
        self
    }

    pub fn visual(&self, exchange: usize) -> Option<&T> {
        self.visuals.get(&exchange)
    }

    pub fn component(&self, component: RichComponent) -> Option<&T> {
        self.components.get(&component)
    }

    /// The rich content attached to a message, if the host supplied one
    pub fn for_message(&self, message: &Message) -> Option<&T> {
        message.component.and_then(|c| self.component(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::state::{apply, Action, PendingSuggestion};

    fn script() -> ExchangeScript {
        ExchangeScript::storyatl()
    }

    fn state_after(actions: impl IntoIterator<Item = Action>) -> ConversationState {
        let script = script();
        actions
            .into_iter()
            .fold(ConversationState::default(), |s, a| apply(&script, s, a))
    }

    fn greeting() -> Action {
        Action::AddMessage(Message::scripted(Speaker::Narrator, "Ask Atlanta a question.", 0, None))
    }

    #[test]
    fn test_greeting_suggestion_waits_for_auto_type() {
        let script = script();
        let state = state_after([greeting()]);
        assert!(!show_suggestion(&script, &state, 0));

        let state = state_after([greeting(), Action::SetAutoTypeComplete(true)]);
        assert!(show_suggestion(&script, &state, 0));
        assert!(!show_suggestion(&script, &state, 1));
    }

    #[test]
    fn test_suggestion_hidden_while_busy() {
        let script = script();
        let state = state_after([Action::PopulateAndJump(3), Action::SetTyping(true)]);
        assert!(!show_suggestion(&script, &state, 3));

        let state = state_after([
            Action::PopulateAndJump(3),
            Action::SetPendingSuggestion(Some(PendingSuggestion {
                text: "What protects the stories and storytellers?".into(),
                exchange_id: 3,
            })),
        ]);
        assert!(!show_suggestion(&script, &state, 3));
        assert_eq!(thinking_indicator(&state), ThinkingIndicator::VisitorTyping);
    }

    #[test]
    fn test_revisited_exchange_offers_no_suggestion() {
        let script = script();
        let state = state_after([Action::PopulateAndJump(4), Action::Jump(2)]);
        assert!(!show_suggestion(&script, &state, 2));
        assert!(!show_suggestion(&script, &state, 9));
    }

    #[test]
    fn test_thinking_indicator_is_exclusive() {
        let state = state_after([
            Action::SetTyping(true),
            Action::SetPendingSuggestion(Some(PendingSuggestion {
                text: "x".into(),
                exchange_id: 0,
            })),
        ]);
        assert_eq!(thinking_indicator(&state), ThinkingIndicator::NarratorTyping);
        assert_eq!(thinking_indicator(&ConversationState::default()), ThinkingIndicator::None);
    }

    #[test]
    fn test_terminal_typing_moves_under_live_chat() {
        let script = script();
        let state = state_after([Action::PopulateAndJump(9), Action::SetTyping(true)]);
        assert!(show_exchange_typing(&script, &state, 9));
        assert!(!show_live_typing(&script, &state));

        let state = state_after([
            Action::PopulateAndJump(9),
            Action::AddLiveMessage(Message::live(Speaker::Visitor, "hi", 9)),
            Action::SetTyping(true),
        ]);
        assert!(!show_exchange_typing(&script, &state, 9));
        assert!(show_live_typing(&script, &state));
    }

    #[test]
    fn test_navigation_chrome() {
        let script = script();
        let start = ConversationState::default();
        assert!(!can_go_back(&start));
        assert!(can_go_forward(&script, &start));
        assert_eq!(counter(&script, &start), "1/10");
        assert_eq!(progress(&script, &start), 0.0);

        let end = state_after([Action::PopulateAndJump(9)]);
        assert!(can_go_back(&end));
        assert!(!can_go_forward(&script, &end));
        assert_eq!(counter(&script, &end), "10/10");
        assert_eq!(progress(&script, &end), 1.0);

        let dots = timeline(&script, &end);
        assert_eq!(dots.len(), 10);
        assert!(dots[9].active);
        assert_eq!(dots[3].label, "Booth");
    }

    #[test]
    fn test_visible_and_grouped() {
        let script = script();
        let state = state_after([Action::PopulateAndJump(2)]);
        let ids: Vec<usize> = visible_exchanges(&script, &state).map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        let grouped = messages_by_exchange(&state);
        assert_eq!(grouped[&0].len(), 1);
        assert_eq!(grouped[&2].len(), 2);
        assert!(!grouped.contains_key(&3));
    }

    #[test]
    fn test_near_visual() {
        let state = state_after([Action::PopulateAndJump(5), Action::SetVisualExchange(3)]);
        assert!(is_near_visual(&state, 2));
        assert!(is_near_visual(&state, 4));
        assert!(!is_near_visual(&state, 5));
    }

    #[test]
    fn test_greeting_animation_flag() {
        let state = state_after([greeting()]);
        assert!(is_animated_greeting(&state, &state.messages[0]));

        let populated = state_after([Action::PopulateAndJump(0)]);
        assert!(!is_animated_greeting(&populated, &populated.messages[0]));
    }

    #[test]
    fn test_placeholder() {
        let state = ConversationState::default();
        assert_eq!(live_placeholder(&state, true), "Atlanta is thinking...");
        assert_eq!(live_placeholder(&state, false), "Ask Atlanta anything...");

        let state = state_after([Action::AddLiveMessage(Message::live(Speaker::Visitor, "hi", 9))]);
        assert_eq!(live_placeholder(&state, false), "Keep asking...");
    }

    #[test]
    fn test_render_targets() {
        let targets = RenderTargets::new()
            .with_visual(0, "welcome")
            .with_component(RichComponent::BoothSteps, "booth-steps");

        assert_eq!(targets.visual(0), Some(&"welcome"));
        assert_eq!(targets.visual(1), None);

        let state = state_after([Action::PopulateAndJump(3)]);
        let booth = state
            .messages
            .iter()
            .find(|m| m.component == Some(RichComponent::BoothSteps))
            .unwrap();
        assert_eq!(targets.for_message(booth), Some(&"booth-steps"));
        assert_eq!(targets.for_message(&state.messages[0]), None);
    }
}
