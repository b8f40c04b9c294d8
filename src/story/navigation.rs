//! Session driver: choreography, navigation and auto-scroll
//!
//! A [`NavigationController`] owns one conversation. The host forwards user
//! input and visibility reports, calls [`NavigationController::poll`] whenever
//! [`NavigationController::next_deadline`] passes, and drains
//! [`ViewCommand`]s for the things only the view can do (scrolling, observing
//! sections).

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::core::PreferenceStore;

use super::choreography::{
    FlowEffect, FlowTimer, GreetingEvent, GreetingFlow, Pacing, SuggestionEvent, SuggestionFlow,
};
use super::scroll_sync::{section_id, ScrollSync, VisibilityEntry};
use super::script::ExchangeScript;
use super::state::{Action, ConversationState, StoryStore, ThemeMode};
use super::theme::{load_theme, persist_theme};
use super::timers::TimerQueue;
use super::view;

/// Requests for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    /// Smooth-scroll the section to the top of the thread
    ScrollToSection { exchange: usize, section: String },
    /// Scroll to the bottom of the live chat transcript
    ScrollToLatest,
    /// Observe exactly these sections for scroll sync
    ObserveSections(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Flow(FlowTimer),
    AutoScroll(usize),
}

pub struct NavigationController {
    store: StoryStore,
    preferences: Option<Arc<dyn PreferenceStore>>,
    pacing: Pacing,
    suggestion: SuggestionFlow,
    greeting: GreetingFlow,
    scroll: ScrollSync,
    timers: TimerQueue<Timer>,
    outbox: Vec<ViewCommand>,
    seen_exchange: usize,
    seen_live: usize,
    observed: Option<usize>,
}

impl NavigationController {
    pub fn new(script: Arc<ExchangeScript>) -> Self {
        Self::with_pacing(script, Pacing::default())
    }

    pub fn with_pacing(script: Arc<ExchangeScript>, pacing: Pacing) -> Self {
        Self {
            store: StoryStore::new(script),
            preferences: None,
            pacing,
            suggestion: SuggestionFlow::default(),
            greeting: GreetingFlow::default(),
            scroll: ScrollSync::default(),
            timers: TimerQueue::new(),
            outbox: Vec::new(),
            seen_exchange: 0,
            seen_live: 0,
            observed: None,
        }
    }

    /// Persist the theme to `store` on every change
    pub fn with_preferences(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.preferences = Some(store);
        self
    }

    pub fn state(&self) -> &ConversationState {
        self.store.state()
    }

    pub fn script(&self) -> &ExchangeScript {
        self.store.script()
    }

    pub fn store(&self) -> &StoryStore {
        &self.store
    }

    /// Direct store access for collaborators such as the live chat
    pub fn store_mut(&mut self) -> &mut StoryStore {
        &mut self.store
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Begin the session; a fresh conversation plays the greeting
    pub fn start(&mut self, now: Instant) {
        let state = self.store.state();
        let fresh = state.current_exchange == 0
            && state.messages.is_empty()
            && !state.auto_type_complete;
        if fresh {
            let effects = self
                .greeting
                .handle(self.store.script(), &self.pacing, GreetingEvent::Start);
            self.apply_effects(now, effects);
        }
        self.reconcile(now);
    }

    /// The view finished revealing the greeting
    pub fn greeting_typed(&mut self, now: Instant) {
        let effects = self
            .greeting
            .handle(self.store.script(), &self.pacing, GreetingEvent::Typed);
        self.apply_effects(now, effects);
        self.reconcile(now);
    }

    pub fn suggestion_visible(&self) -> bool {
        let state = self.store.state();
        !self.suggestion.is_active()
            && view::show_suggestion(self.store.script(), state, state.current_exchange)
    }

    /// Click the current exchange's suggestion chip; false if it isn't offered
    pub fn click_suggestion(&mut self, now: Instant) -> bool {
        if !self.suggestion_visible() {
            return false;
        }
        let current = self.store.state().current_exchange;
        let Some(text) = self
            .store
            .script()
            .get(current)
            .and_then(|e| e.suggestion.clone())
        else {
            return false;
        };

        tracing::debug!(exchange = current, "suggestion clicked");
        let effects = self.suggestion.handle(
            self.store.script(),
            &self.pacing,
            SuggestionEvent::Clicked {
                text,
                exchange_id: current,
            },
        );
        let accepted = !effects.is_empty();
        self.apply_effects(now, effects);
        self.reconcile(now);
        accepted
    }

    /// The view finished typing out the clicked suggestion
    pub fn suggestion_typed(&mut self, now: Instant, exchange_id: usize) {
        let effects = self.suggestion.handle(
            self.store.script(),
            &self.pacing,
            SuggestionEvent::Typed { exchange_id },
        );
        self.apply_effects(now, effects);
        self.reconcile(now);
    }

    pub fn go_back(&mut self, now: Instant) {
        self.navigate(now, StoryStore::go_back);
    }

    pub fn go_forward(&mut self, now: Instant) {
        self.navigate(now, StoryStore::go_forward);
    }

    /// Timeline dot
    pub fn jump_to(&mut self, now: Instant, exchange: isize) {
        self.navigate(now, |store| store.jump_to(exchange));
    }

    /// Apply the stored theme, else the system preference
    pub async fn restore_theme(&mut self, system_prefers_dark: bool) -> ThemeMode {
        let theme = match &self.preferences {
            Some(store) => load_theme(store.as_ref(), system_prefers_dark).await,
            None if system_prefers_dark => ThemeMode::Dark,
            None => ThemeMode::Light,
        };
        self.store.dispatch(Action::SetTheme(theme));
        theme
    }

    pub async fn toggle_theme(&mut self) -> ThemeMode {
        self.store.toggle_theme();
        self.save_theme().await
    }

    pub async fn set_theme(&mut self, theme: ThemeMode) {
        self.store.dispatch(Action::SetTheme(theme));
        self.save_theme().await;
    }

    /// Start over, keeping the theme, and replay the greeting
    pub fn reset(&mut self, now: Instant) {
        self.interrupt(now);
        self.timers.cancel_all();
        self.scroll.clear();
        self.store.reset();
        self.greeting = GreetingFlow::default();
        self.suggestion = SuggestionFlow::default();
        self.seen_exchange = 0;
        self.seen_live = 0;
        self.observed = None;
        self.start(now);
    }

    /// A batch of visibility reports from the view
    pub fn observe_sections(
        &mut self,
        now: Instant,
        entries: impl IntoIterator<Item = VisibilityEntry>,
    ) {
        self.scroll.observe(now, entries);
    }

    /// Programmatic scroll the view is about to perform on its own
    pub fn suppress_sync(&mut self, now: Instant) {
        self.scroll.suppress(now);
    }

    /// Fire everything due at `now`
    pub fn poll(&mut self, now: Instant) {
        while let Some((due, timer)) = self.timers.pop_next_due(now) {
            match timer {
                Timer::Flow(flow) if flow.is_suggestion() => {
                    let effects = self.suggestion.handle(
                        self.store.script(),
                        &self.pacing,
                        SuggestionEvent::Timer(flow),
                    );
                    self.apply_effects(due, effects);
                }
                Timer::Flow(flow) => {
                    let effects = self.greeting.handle(
                        self.store.script(),
                        &self.pacing,
                        GreetingEvent::Timer(flow),
                    );
                    self.apply_effects(due, effects);
                }
                Timer::AutoScroll(exchange) => {
                    self.outbox.push(ViewCommand::ScrollToSection {
                        exchange,
                        section: section_id(exchange),
                    });
                }
            }
            self.reconcile(due);
        }

        if let Some(exchange) = self.scroll.poll(now) {
            self.store.dispatch(Action::SetVisualExchange(exchange as isize));
        }
        self.reconcile(now);
    }

    /// When [`poll`](Self::poll) next has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.timers.next_deadline(), self.scroll.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn drain_commands(&mut self) -> Vec<ViewCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Tear down: nothing scheduled may fire afterwards
    pub fn shutdown(&mut self) {
        let dropped = self.timers.cancel_all();
        self.scroll.clear();
        self.outbox.clear();
        tracing::debug!(dropped, "navigation shut down");
    }

    async fn save_theme(&self) -> ThemeMode {
        let theme = self.store.state().theme;
        if let Some(store) = &self.preferences {
            // The in-memory theme stands even if it can't be saved
            if let Err(err) = persist_theme(store.as_ref(), theme).await {
                tracing::warn!(error = %err, theme = theme.as_str(), "theme not saved");
            }
        }
        theme
    }

    fn navigate(&mut self, now: Instant, step: impl FnOnce(&mut StoryStore)) {
        let before = self.store.state().current_exchange;
        step(&mut self.store);
        if self.store.state().current_exchange != before {
            self.interrupt(now);
        }
        self.reconcile(now);
    }

    /// Abandon in-flight choreography
    fn interrupt(&mut self, now: Instant) {
        let mut effects = self.suggestion.handle(
            self.store.script(),
            &self.pacing,
            SuggestionEvent::Cancel,
        );
        if self.greeting.is_active() {
            effects.extend(self.greeting.handle(
                self.store.script(),
                &self.pacing,
                GreetingEvent::Cancel,
            ));
        }
        self.apply_effects(now, effects);
    }

    fn apply_effects(&mut self, now: Instant, effects: Vec<FlowEffect>) {
        for effect in effects {
            match effect {
                FlowEffect::Dispatch(action) => self.store.dispatch(action),
                FlowEffect::Schedule(timer, delay) => {
                    self.timers.schedule(now, delay, Timer::Flow(timer));
                }
                FlowEffect::Cancel(timer) => {
                    self.timers.cancel_where(|t| *t == Timer::Flow(timer));
                }
            }
        }
    }

    /// React to position and transcript changes
    fn reconcile(&mut self, now: Instant) {
        let state = self.store.state();
        let current = state.current_exchange;
        let live = state.live_chat_messages.len();
        let terminal = self.store.script().terminal();

        if current != self.seen_exchange {
            self.seen_exchange = current;
            self.timers
                .cancel_where(|t| matches!(t, Timer::AutoScroll(_)));
            if current > 0 {
                self.scroll.suppress(now);
                self.timers
                    .schedule(now, self.pacing.auto_scroll, Timer::AutoScroll(current));
            }
        }

        if self.observed != Some(current) {
            self.observed = Some(current);
            self.scroll.attach(0..=current);
            self.outbox
                .push(ViewCommand::ObserveSections((0..=current).map(section_id).collect()));
        }

        if live != self.seen_live {
            self.seen_live = live;
            if current == terminal && live > 0 {
                self.outbox.push(ViewCommand::ScrollToLatest);
            }
        }
    }
}

impl fmt::Debug for NavigationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationController")
            .field("state", self.store.state())
            .field("suggestion", &self.suggestion)
            .field("greeting", &self.greeting)
            .field("timers", &self.timers.len())
            .field("persists_theme", &self.preferences.is_some())
            .finish_non_exhaustive()
    }
}
