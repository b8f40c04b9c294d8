//! Timed choreography as explicit state machines
//!
//! Each flow takes an event and returns the effects the host must carry out:
//! actions to dispatch and timers to start or cancel. The flows never touch
//! the clock or the store themselves, so they are driven identically by a
//! real event loop and by tests with a simulated clock.
//!
//! The suggestion flow walks
//! `Idle -> TypingOut -> Settling -> Committing -> NarratorThinking -> Revealed`.
//! Events that do not fit the current phase are ignored, which is what makes
//! completion callbacks one-shot.

use std::time::Duration;

use super::auto_type::{GREETING_CHAR, GREETING_DELAY, SUGGESTION_CHAR};
use super::script::ExchangeScript;
use super::state::{Action, Message, PendingSuggestion, Speaker};

/// Delays used by the choreography
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub suggestion_char: Duration,
    /// Exit transition of the typed-out suggestion
    pub settle: Duration,
    /// Gap between the exit and the committed visitor message
    pub stagger: Duration,
    /// How long the narrator "thinks" before replying
    pub thinking: Duration,
    pub auto_scroll: Duration,
    pub greeting_typing: Duration,
    pub greeting_reveal: Duration,
    pub greeting_delay: Duration,
    pub greeting_char: Duration,
    /// Pause after the greeting before its suggestion appears
    pub greeting_linger: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            suggestion_char: SUGGESTION_CHAR,
            settle: Duration::from_millis(600),
            stagger: Duration::from_millis(300),
            thinking: Duration::from_millis(1200),
            auto_scroll: Duration::from_millis(350),
            greeting_typing: Duration::from_millis(500),
            greeting_reveal: Duration::from_millis(2000),
            greeting_delay: GREETING_DELAY,
            greeting_char: GREETING_CHAR,
            greeting_linger: Duration::from_millis(1200),
        }
    }
}

impl Pacing {
    fn reveal(delay: Duration, per_char: Duration, text: &str) -> Duration {
        delay + per_char * text.chars().count() as u32
    }

    pub fn suggestion_reveal(&self, text: &str) -> Duration {
        Self::reveal(Duration::ZERO, self.suggestion_char, text)
    }

    pub fn greeting_reveal_time(&self, text: &str) -> Duration {
        Self::reveal(self.greeting_delay, self.greeting_char, text)
    }
}

/// Timers a flow may start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowTimer {
    /// Fallback completion for the suggestion typewriter
    SuggestionTyped,
    Settle,
    Stagger,
    Thinking,
    GreetingTyping,
    GreetingReveal,
    /// Fallback completion for the greeting typewriter
    GreetingTyped,
    GreetingLinger,
}

impl FlowTimer {
    pub fn is_suggestion(&self) -> bool {
        matches!(
            self,
            FlowTimer::SuggestionTyped
                | FlowTimer::Settle
                | FlowTimer::Stagger
                | FlowTimer::Thinking
        )
    }

    pub fn is_greeting(&self) -> bool {
        !self.is_suggestion()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEffect {
    Dispatch(Action),
    Schedule(FlowTimer, Duration),
    Cancel(FlowTimer),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuggestionPhase {
    #[default]
    Idle,
    TypingOut,
    Settling,
    Committing,
    NarratorThinking,
    Revealed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionEvent {
    Clicked { text: String, exchange_id: usize },
    /// The typewriter finished, reported by the view or the fallback timer
    Typed { exchange_id: usize },
    Timer(FlowTimer),
    Cancel,
}

/// Suggestion click to narrator reply
#[derive(Debug, Clone, Default)]
pub struct SuggestionFlow {
    phase: SuggestionPhase,
    pending: Option<PendingSuggestion>,
}

impl SuggestionFlow {
    pub fn phase(&self) -> SuggestionPhase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingSuggestion> {
        self.pending.as_ref()
    }

    /// True while a click is being played out
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, SuggestionPhase::Idle | SuggestionPhase::Revealed)
    }

    pub fn handle(
        &mut self,
        script: &ExchangeScript,
        pacing: &Pacing,
        event: SuggestionEvent,
    ) -> Vec<FlowEffect> {
        use SuggestionPhase::*;

        match (self.phase, event) {
            (Idle | Revealed, SuggestionEvent::Clicked { text, exchange_id }) => {
                if exchange_id >= script.terminal() {
                    return Vec::new();
                }
                let reveal = pacing.suggestion_reveal(&text);
                let pending = PendingSuggestion { text, exchange_id };
                self.pending = Some(pending.clone());
                self.phase = TypingOut;
                vec![
                    FlowEffect::Dispatch(Action::SetPendingSuggestion(Some(pending))),
                    FlowEffect::Schedule(FlowTimer::SuggestionTyped, reveal),
                ]
            }
            (TypingOut, SuggestionEvent::Typed { exchange_id })
                if self.pending_exchange() == Some(exchange_id) =>
            {
                self.settle(pacing)
            }
            (TypingOut, SuggestionEvent::Timer(FlowTimer::SuggestionTyped)) => self.settle(pacing),
            (Settling, SuggestionEvent::Timer(FlowTimer::Settle)) => {
                self.phase = Committing;
                vec![
                    FlowEffect::Dispatch(Action::SetPendingSuggestion(None)),
                    FlowEffect::Schedule(FlowTimer::Stagger, pacing.stagger),
                ]
            }
            (Committing, SuggestionEvent::Timer(FlowTimer::Stagger)) => {
                let Some(pending) = self.pending.as_ref() else {
                    self.phase = Idle;
                    return Vec::new();
                };
                self.phase = NarratorThinking;
                vec![
                    FlowEffect::Dispatch(Action::AddMessage(Message::scripted(
                        Speaker::Visitor,
                        pending.text.clone(),
                        pending.exchange_id + 1,
                        None,
                    ))),
                    FlowEffect::Dispatch(Action::SetTyping(true)),
                    FlowEffect::Schedule(FlowTimer::Thinking, pacing.thinking),
                ]
            }
            (NarratorThinking, SuggestionEvent::Timer(FlowTimer::Thinking)) => {
                self.phase = Revealed;
                let mut effects = vec![FlowEffect::Dispatch(Action::SetTyping(false))];
                if let Some(pending) = self.pending.take() {
                    if let Some(next) = script.get(pending.exchange_id + 1) {
                        effects.push(FlowEffect::Dispatch(Action::AddMessage(Message::scripted(
                            Speaker::Narrator,
                            next.scripted_response.clone(),
                            next.id,
                            next.component,
                        ))));
                    }
                }
                effects.push(FlowEffect::Dispatch(Action::Advance));
                effects
            }
            (phase, SuggestionEvent::Cancel) if self.is_active() => {
                tracing::debug!(?phase, "suggestion flow cancelled");
                self.phase = Idle;
                self.pending = None;
                let mut effects: Vec<FlowEffect> = [
                    FlowTimer::SuggestionTyped,
                    FlowTimer::Settle,
                    FlowTimer::Stagger,
                    FlowTimer::Thinking,
                ]
                .into_iter()
                .map(FlowEffect::Cancel)
                .collect();
                if matches!(phase, TypingOut | Settling) {
                    effects.push(FlowEffect::Dispatch(Action::SetPendingSuggestion(None)));
                }
                if phase == NarratorThinking {
                    effects.push(FlowEffect::Dispatch(Action::SetTyping(false)));
                }
                effects
            }
            _ => Vec::new(),
        }
    }

    fn pending_exchange(&self) -> Option<usize> {
        self.pending.as_ref().map(|p| p.exchange_id)
    }

    fn settle(&mut self, pacing: &Pacing) -> Vec<FlowEffect> {
        self.phase = SuggestionPhase::Settling;
        vec![
            FlowEffect::Cancel(FlowTimer::SuggestionTyped),
            FlowEffect::Schedule(FlowTimer::Settle, pacing.settle),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GreetingPhase {
    #[default]
    Idle,
    Waiting,
    Thinking,
    Revealing,
    Lingering,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreetingEvent {
    Start,
    Typed,
    Timer(FlowTimer),
    Cancel,
}

/// Opening narrator line on a fresh conversation
#[derive(Debug, Clone, Default)]
pub struct GreetingFlow {
    phase: GreetingPhase,
}

impl GreetingFlow {
    pub fn phase(&self) -> GreetingPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.phase, GreetingPhase::Idle | GreetingPhase::Done)
    }

    pub fn handle(
        &mut self,
        script: &ExchangeScript,
        pacing: &Pacing,
        event: GreetingEvent,
    ) -> Vec<FlowEffect> {
        use GreetingPhase::*;

        match (self.phase, event) {
            (Idle, GreetingEvent::Start) => {
                self.phase = Waiting;
                vec![
                    FlowEffect::Schedule(FlowTimer::GreetingTyping, pacing.greeting_typing),
                    FlowEffect::Schedule(FlowTimer::GreetingReveal, pacing.greeting_reveal),
                ]
            }
            (Waiting, GreetingEvent::Timer(FlowTimer::GreetingTyping)) => {
                self.phase = Thinking;
                vec![FlowEffect::Dispatch(Action::SetTyping(true))]
            }
            (Waiting | Thinking, GreetingEvent::Timer(FlowTimer::GreetingReveal)) => {
                let Some(greeting) = script.get(0) else {
                    self.phase = Done;
                    return vec![FlowEffect::Dispatch(Action::SetTyping(false))];
                };
                self.phase = Revealing;
                vec![
                    FlowEffect::Cancel(FlowTimer::GreetingTyping),
                    FlowEffect::Dispatch(Action::SetTyping(false)),
                    FlowEffect::Dispatch(Action::AddMessage(Message::scripted(
                        Speaker::Narrator,
                        greeting.scripted_response.clone(),
                        0,
                        greeting.component,
                    ))),
                    FlowEffect::Schedule(
                        FlowTimer::GreetingTyped,
                        pacing.greeting_reveal_time(&greeting.scripted_response),
                    ),
                ]
            }
            (Revealing, GreetingEvent::Typed | GreetingEvent::Timer(FlowTimer::GreetingTyped)) => {
                self.phase = Lingering;
                vec![
                    FlowEffect::Cancel(FlowTimer::GreetingTyped),
                    FlowEffect::Schedule(FlowTimer::GreetingLinger, pacing.greeting_linger),
                ]
            }
            (Lingering, GreetingEvent::Timer(FlowTimer::GreetingLinger)) => {
                self.phase = Done;
                vec![FlowEffect::Dispatch(Action::SetAutoTypeComplete(true))]
            }
            (phase, GreetingEvent::Cancel) => {
                self.phase = Idle;
                let mut effects: Vec<FlowEffect> = [
                    FlowTimer::GreetingTyping,
                    FlowTimer::GreetingReveal,
                    FlowTimer::GreetingTyped,
                    FlowTimer::GreetingLinger,
                ]
                .into_iter()
                .map(FlowEffect::Cancel)
                .collect();
                if phase == Thinking {
                    effects.push(FlowEffect::Dispatch(Action::SetTyping(false)));
                }
                effects
            }
            _ => Vec::new(),
        }
    }
}
