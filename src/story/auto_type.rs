//! Typewriter reveal of a message at a fixed character rate

use std::time::{Duration, Instant};

/// Greeting reveal: lead-in before the first character
pub const GREETING_DELAY: Duration = Duration::from_millis(300);
/// Greeting reveal: time per character
pub const GREETING_CHAR: Duration = Duration::from_millis(80);
/// Suggestion reveal: time per character
pub const SUGGESTION_CHAR: Duration = Duration::from_millis(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoType {
    text: String,
    started_at: Instant,
    delay: Duration,
    per_char: Duration,
}

impl AutoType {
    pub fn new(
        text: impl Into<String>,
        started_at: Instant,
        delay: Duration,
        per_char: Duration,
    ) -> Self {
        Self {
            text: text.into(),
            started_at,
            delay,
            per_char,
        }
    }

    /// The pacing used for the opening narrator line
    pub fn greeting(text: impl Into<String>, started_at: Instant) -> Self {
        Self::new(text, started_at, GREETING_DELAY, GREETING_CHAR)
    }

    /// The pacing used when a clicked suggestion types itself out
    pub fn suggestion(text: impl Into<String>, started_at: Instant) -> Self {
        Self::new(text, started_at, Duration::ZERO, SUGGESTION_CHAR)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// How long the full reveal takes
    pub fn duration(&self) -> Duration {
        self.delay + self.per_char * self.char_count() as u32
    }

    pub fn completes_at(&self) -> Instant {
        self.started_at + self.duration()
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        now >= self.completes_at()
    }

    /// Number of characters shown at `now`
    pub fn visible_chars(&self, now: Instant) -> usize {
        let total = self.char_count();
        let elapsed = now.saturating_duration_since(self.started_at);
        let Some(typing) = elapsed.checked_sub(self.delay) else {
            return 0;
        };
        if self.per_char.is_zero() {
            return total;
        }
        let shown = typing.as_nanos() / self.per_char.as_nanos();
        (shown.min(total as u128)) as usize
    }

    /// The prefix shown at `now`, never splitting a character
    pub fn visible(&self, now: Instant) -> &str {
        let count = self.visible_chars(now);
        match self.text.char_indices().nth(count) {
            Some((end, _)) => &self.text[..end],
            None => &self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_pacing() {
        let t0 = Instant::now();
        let typer = AutoType::greeting("Ask Atlanta a question.", t0);

        assert_eq!(typer.duration(), Duration::from_millis(300 + 80 * 23));
        assert_eq!(typer.visible(t0), "");
        assert_eq!(typer.visible(t0 + Duration::from_millis(299)), "");
        assert_eq!(typer.visible(t0 + Duration::from_millis(380)), "A");
        assert_eq!(typer.visible(t0 + Duration::from_millis(300 + 80 * 5)), "Ask A");
        assert!(!typer.is_complete(t0 + Duration::from_millis(2139)));
        assert!(typer.is_complete(t0 + Duration::from_millis(2140)));
        assert_eq!(typer.visible(t0 + Duration::from_secs(10)), "Ask Atlanta a question.");
    }

    #[test]
    fn test_suggestion_pacing() {
        let t0 = Instant::now();
        let typer = AutoType::suggestion("It's my turn.", t0);
        assert_eq!(typer.completes_at(), t0 + Duration::from_millis(60 * 13));
        assert_eq!(typer.visible(t0 + Duration::from_millis(120)), "It");
    }

    #[test]
    fn test_multibyte_text_is_split_on_char_boundaries() {
        let t0 = Instant::now();
        let typer = AutoType::new("Café ✓ done", t0, Duration::ZERO, Duration::from_millis(10));
        assert_eq!(typer.visible(t0 + Duration::from_millis(40)), "Café");
        assert_eq!(typer.visible(t0 + Duration::from_millis(60)), "Café ✓");
        assert_eq!(typer.char_count(), 11);
    }

    #[test]
    fn test_instant_reveal() {
        let t0 = Instant::now();
        let typer = AutoType::new("now", t0, Duration::ZERO, Duration::ZERO);
        assert!(typer.is_complete(t0));
        assert_eq!(typer.visible(t0), "now");
    }
}
