//! Keeps the visual panel on whichever exchange section sits at the reading position
//!
//! The host reports visibility of each `exchange-N` section against a detection
//! band near the top of the scroll container. The most visible section wins and
//! is handed back from [`ScrollSync::poll`] once it has held for the debounce
//! window. Programmatic scrolls call [`ScrollSync::suppress`] first so their own
//! observations are discarded.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

pub const DEBOUNCE: Duration = Duration::from_millis(100);
pub const SUPPRESS: Duration = Duration::from_millis(800);

const SECTION_PREFIX: &str = "exchange-";

/// DOM-style id of an exchange section
pub fn section_id(exchange: usize) -> String {
    format!("{}{}", SECTION_PREFIX, exchange)
}

/// Inverse of [`section_id`]; anything else is not an exchange section
pub fn parse_section_id(id: &str) -> Option<usize> {
    let digits = id.strip_prefix(SECTION_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A vertical extent in container coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub top: f64,
    pub bottom: f64,
}

impl Span {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    fn overlap(&self, other: &Span) -> Option<f64> {
        let top = self.top.max(other.top);
        let bottom = self.bottom.min(other.bottom);
        (bottom >= top).then_some(bottom - top)
    }
}

/// One section's visibility within the band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityEntry {
    pub exchange: usize,
    pub intersecting: bool,
    /// Visible fraction of the section, `0.0..=1.0`
    pub ratio: f64,
}

/// Portion of the viewport that counts as "being read"
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionBand {
    /// Fraction of the viewport height cut from the top
    pub top_inset: f64,
    /// Fraction of the viewport height cut from the bottom
    pub bottom_inset: f64,
}

impl Default for DetectionBand {
    fn default() -> Self {
        Self {
            top_inset: 0.10,
            bottom_inset: 0.60,
        }
    }
}

impl DetectionBand {
    pub fn band(&self, viewport: Span) -> Span {
        let height = viewport.height();
        Span::new(
            viewport.top + height * self.top_inset,
            viewport.bottom - height * self.bottom_inset,
        )
    }

    /// Measure a section the way an intersection observer would
    pub fn measure(&self, exchange: usize, viewport: Span, section: Span) -> VisibilityEntry {
        let band = self.band(viewport);
        match band.overlap(&section) {
            Some(visible) => {
                let height = section.height();
                let ratio = if height > 0.0 {
                    (visible / height).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                VisibilityEntry {
                    exchange,
                    intersecting: true,
                    ratio,
                }
            }
            None => VisibilityEntry {
                exchange,
                intersecting: false,
                ratio: 0.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrollSync {
    band: DetectionBand,
    attached: BTreeSet<usize>,
    ratios: BTreeMap<usize, f64>,
    suppressed_until: Option<Instant>,
    /// Candidate and the instant it may be dispatched
    pending: Option<(usize, Instant)>,
}

impl Default for ScrollSync {
    fn default() -> Self {
        Self::new(DetectionBand::default())
    }
}

impl ScrollSync {
    pub fn new(band: DetectionBand) -> Self {
        Self {
            band,
            attached: BTreeSet::new(),
            ratios: BTreeMap::new(),
            suppressed_until: None,
            pending: None,
        }
    }

    pub fn band(&self) -> &DetectionBand {
        &self.band
    }

    /// Observe exactly these sections, forgetting any others
    pub fn attach(&mut self, exchanges: impl IntoIterator<Item = usize>) {
        self.attached = exchanges.into_iter().collect();
        let attached = &self.attached;
        self.ratios.retain(|id, _| attached.contains(id));
        if let Some((id, _)) = self.pending {
            if !self.attached.contains(&id) {
                self.pending = None;
            }
        }
    }

    pub fn attached(&self) -> impl Iterator<Item = usize> + '_ {
        self.attached.iter().copied()
    }

    pub fn is_suppressed(&self, now: Instant) -> bool {
        self.suppressed_until.is_some_and(|until| now < until)
    }

    /// Ignore observations for the suppression window and drop any pending dispatch
    pub fn suppress(&mut self, now: Instant) {
        self.suppressed_until = Some(now + SUPPRESS);
        self.pending = None;
    }

    /// Feed one observation batch
    pub fn observe(&mut self, now: Instant, entries: impl IntoIterator<Item = VisibilityEntry>) {
        if self.is_suppressed(now) {
            return;
        }

        for entry in entries {
            if !self.attached.contains(&entry.exchange) {
                continue;
            }
            if entry.intersecting {
                self.ratios.insert(entry.exchange, entry.ratio);
            } else {
                self.ratios.remove(&entry.exchange);
            }
        }

        if let Some(best) = self.most_visible() {
            self.pending = Some((best, now + DEBOUNCE));
        }
    }

    /// Highest ratio wins; ties go to the earlier exchange
    pub fn most_visible(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (&id, &ratio) in &self.ratios {
            match best {
                Some((_, top)) if ratio <= top => {}
                _ => best = Some((id, ratio)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// The exchange to show, once its debounce window has passed
    pub fn poll(&mut self, now: Instant) -> Option<usize> {
        let (id, due) = self.pending?;
        if now < due {
            return None;
        }
        self.pending = None;
        if self.is_suppressed(now) {
            return None;
        }
        Some(id)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, due)| due)
    }

    /// Drop everything; used on teardown
    pub fn clear(&mut self) {
        self.attached.clear();
        self.ratios.clear();
        self.pending = None;
        self.suppressed_until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn seen(exchange: usize, ratio: f64) -> VisibilityEntry {
        VisibilityEntry {
            exchange,
            intersecting: true,
            ratio,
        }
    }

    fn gone(exchange: usize) -> VisibilityEntry {
        VisibilityEntry {
            exchange,
            intersecting: false,
            ratio: 0.0,
        }
    }

    #[test]
    fn test_section_ids() {
        assert_eq!(section_id(4), "exchange-4");
        assert_eq!(parse_section_id("exchange-12"), Some(12));
        assert_eq!(parse_section_id("exchange-"), None);
        assert_eq!(parse_section_id("exchange--1"), None);
        assert_eq!(parse_section_id("exchange-3a"), None);
        assert_eq!(parse_section_id("footer"), None);
    }

    #[test]
    fn test_band_geometry() {
        let band = DetectionBand::default();
        let viewport = Span::new(0.0, 1000.0);
        assert_eq!(band.band(viewport), Span::new(100.0, 400.0));

        let entry = band.measure(2, viewport, Span::new(300.0, 700.0));
        assert!(entry.intersecting);
        assert!((entry.ratio - 0.25).abs() < 1e-9);

        let below = band.measure(3, viewport, Span::new(500.0, 900.0));
        assert!(!below.intersecting);
        assert_eq!(below.ratio, 0.0);

        let inside = band.measure(1, viewport, Span::new(150.0, 250.0));
        assert_eq!(inside.ratio, 1.0);
    }

    #[test]
    fn test_debounced_selection() {
        let t0 = Instant::now();
        let mut sync = ScrollSync::default();
        sync.attach(0..4);

        sync.observe(t0, [seen(1, 0.3), seen(2, 0.6)]);
        assert_eq!(sync.poll(t0 + ms(50)), None);

        // A newer batch restarts the debounce window
        sync.observe(t0 + ms(80), [seen(3, 0.9)]);
        assert_eq!(sync.poll(t0 + ms(120)), None);
        assert_eq!(sync.poll(t0 + ms(180)), Some(3));
        assert_eq!(sync.poll(t0 + ms(400)), None);
    }

    #[test]
    fn test_leaving_sections_are_forgotten() {
        let t0 = Instant::now();
        let mut sync = ScrollSync::default();
        sync.attach(0..4);

        sync.observe(t0, [seen(1, 0.8), seen(2, 0.4)]);
        sync.observe(t0, [gone(1)]);
        assert_eq!(sync.most_visible(), Some(2));

        sync.observe(t0, [gone(2)]);
        assert_eq!(sync.most_visible(), None);
    }

    #[test]
    fn test_ties_prefer_lower_exchange() {
        let t0 = Instant::now();
        let mut sync = ScrollSync::default();
        sync.attach([4, 5]);
        sync.observe(t0, [seen(5, 0.5), seen(4, 0.5)]);
        assert_eq!(sync.poll(t0 + DEBOUNCE), Some(4));
    }

    #[test]
    fn test_suppression_discards_observations() {
        let t0 = Instant::now();
        let mut sync = ScrollSync::default();
        sync.attach(0..6);

        sync.observe(t0, [seen(1, 1.0)]);
        sync.suppress(t0 + ms(10));
        assert_eq!(sync.poll(t0 + ms(200)), None);

        sync.observe(t0 + ms(300), [seen(5, 1.0)]);
        assert_eq!(sync.poll(t0 + ms(500)), None);
        assert!(sync.is_suppressed(t0 + ms(809)));
        assert!(!sync.is_suppressed(t0 + ms(810)));

        sync.observe(t0 + ms(900), [gone(1), seen(2, 0.7)]);
        assert_eq!(sync.poll(t0 + ms(1000)), Some(2));
    }

    #[test]
    fn test_unattached_sections_ignored() {
        let t0 = Instant::now();
        let mut sync = ScrollSync::default();
        sync.attach([0, 1]);
        sync.observe(t0, [seen(7, 1.0)]);
        assert_eq!(sync.next_deadline(), None);

        sync.observe(t0, [seen(1, 0.5)]);
        sync.attach([0]);
        assert_eq!(sync.most_visible(), None);
        assert_eq!(sync.poll(t0 + ms(200)), None);
    }
}
