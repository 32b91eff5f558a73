use std::time::{Duration, Instant};

/// Coalesces bursts of values into one, released after a quiet period.
///
/// Time is passed in explicitly so callers (and tests) control the clock.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<T>,
    last_push: Option<Instant>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_push: None,
        }
    }

    /// Record a new value; it replaces any value still waiting
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.last_push = Some(now);
    }

    /// The latest value once the window has passed without another push
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let last = self.last_push?;
        if now.saturating_duration_since(last) < self.window {
            return None;
        }
        self.last_push = None;
        self.pending.take()
    }

    /// The latest value regardless of the window
    pub fn flush(&mut self) -> Option<T> {
        self.last_push = None;
        self.pending.take()
    }

    /// When the pending value becomes ready
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.last_push.map(|t| t + self.window)
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.last_push = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_collapses_to_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        for (i, width) in [500, 520, 540, 560].into_iter().enumerate() {
            debouncer.push(width, start + Duration::from_millis(20 * i as u64));
        }

        assert_eq!(debouncer.take_ready(start + Duration::from_millis(120)), None);
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(160)), Some(560));
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(500)), None);
    }

    #[test]
    fn flush_ignores_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(10));
        debouncer.push("a", start);
        assert_eq!(debouncer.deadline(), Some(start + Duration::from_secs(10)));
        assert_eq!(debouncer.flush(), Some("a"));
        assert_eq!(debouncer.deadline(), None);
        assert_eq!(debouncer.flush(), None);
    }
}
