//! Auto-refresh scheduling.
//!
//! The event loop owns an [`AutoRefresh`] and asks it, between ticks,
//! whether a pass is due. Disabling only clears the deadline, so a pass
//! that is already running always completes.

use std::time::{Duration, Instant};

/// Lower bound for the auto-refresh interval
pub const MIN_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct AutoRefresh {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutoRefresh {
    /// Disabled timer with the given interval (clamped to `MIN_INTERVAL`)
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.next_due.is_some()
    }

    /// Start (or restart) the timer; the first pass is one interval from `now`
    pub fn enable(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn disable(&mut self) {
        self.next_due = None;
    }

    /// Flip between idle and auto-refreshing; returns the new state
    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable(now);
        }
        self.is_enabled()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Time the event loop may block before the next pass, `None` when idle
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Record that a pass ran at `now`; a manual pass also pushes the next
    /// automatic one back by a full interval.
    pub fn mark_ran(&mut self, now: Instant) {
        if self.is_enabled() {
            self.next_due = Some(now + self.interval);
        }
    }
}

impl Default for AutoRefresh {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

/// Outcome of one refresh pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Rows produced by this pass, before filtering
    pub total: usize,
    pub new: usize,
    pub changed: usize,
    /// Sockets the source could not read
    pub skipped: usize,
    /// User-facing description of a source failure, if any
    pub error: Option<String>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_is_never_due() {
        let timer = AutoRefresh::default();
        let now = Instant::now();
        assert!(!timer.is_enabled());
        assert!(!timer.is_due(now + Duration::from_secs(3600)));
        assert_eq!(timer.time_until_due(now), None);
    }

    #[test]
    fn test_due_after_interval() {
        let mut timer = AutoRefresh::new(Duration::from_secs(2));
        let start = Instant::now();
        timer.enable(start);

        assert!(!timer.is_due(start + Duration::from_millis(1999)));
        assert!(timer.is_due(start + Duration::from_secs(2)));
        assert_eq!(
            timer.time_until_due(start + Duration::from_millis(500)),
            Some(Duration::from_millis(1500))
        );
        assert_eq!(timer.time_until_due(start + Duration::from_secs(5)), Some(Duration::ZERO));
    }

    #[test]
    fn test_reenable_resets_timer() {
        let mut timer = AutoRefresh::new(Duration::from_secs(2));
        let start = Instant::now();
        timer.enable(start);
        timer.disable();
        assert!(!timer.is_due(start + Duration::from_secs(3)));

        let later = start + Duration::from_secs(3);
        assert!(timer.toggle(later));
        assert!(!timer.is_due(later + Duration::from_secs(1)));
        assert!(timer.is_due(later + Duration::from_secs(2)));
    }

    #[test]
    fn test_mark_ran_reschedules_only_when_enabled() {
        let mut timer = AutoRefresh::new(Duration::from_secs(1));
        let start = Instant::now();
        timer.mark_ran(start);
        assert!(!timer.is_enabled());

        timer.enable(start);
        timer.mark_ran(start + Duration::from_millis(900));
        assert!(!timer.is_due(start + Duration::from_millis(1500)));
        assert!(timer.is_due(start + Duration::from_millis(1900)));
    }

    #[test]
    fn test_interval_clamped() {
        let timer = AutoRefresh::new(Duration::from_millis(10));
        assert_eq!(timer.interval(), MIN_INTERVAL);
    }
}
