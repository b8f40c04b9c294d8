//! The guided story: script, conversation state and its choreography
//!
//! Everything here is synchronous and clock-free except the live chat relay
//! call and theme persistence. Hosts drive time through
//! [`NavigationController::poll`].

pub mod auto_type;
pub mod choreography;
pub mod live_chat;
pub mod navigation;
pub mod script;
pub mod scroll_sync;
pub mod state;
pub mod theme;
pub mod timers;
pub mod view;

pub use auto_type::AutoType;
pub use choreography::{GreetingFlow, Pacing, SuggestionFlow, SuggestionPhase};
pub use live_chat::{HttpRelayClient, LiveChat, RelayClient, RelayClientError, LIVE_SUGGESTIONS};
pub use navigation::{NavigationController, ViewCommand};
pub use script::{Exchange, ExchangeScript, RichComponent, ScriptError, VisualMeta};
pub use scroll_sync::{DetectionBand, ScrollSync, Span, VisibilityEntry};
pub use state::{
    apply, Action, ConversationState, Message, PendingSuggestion, Speaker, StoryStore, ThemeMode,
};
pub use theme::{load_theme, persist_theme, THEME_KEY};
pub use timers::{TimerId, TimerQueue};
pub use view::{RenderTargets, ThinkingIndicator};
