use std::time::{Duration, Instant};

pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30);
pub const MAX_REFRESH_PERIOD: Duration = Duration::from_secs(86_400);

/// Decides when a front end should re-query the engine. The first check is
/// always due; after that, once per `period` or immediately after `force`.
/// Periods are clamped to `1ms..=MAX_REFRESH_PERIOD`.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    period: Duration,
    next_due: Option<Instant>,
}

impl RefreshTimer {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.clamp(Duration::from_millis(1), MAX_REFRESH_PERIOD),
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_none_or(|due| now >= due)
    }

    pub fn mark(&mut self, now: Instant) {
        // An unrepresentable deadline keeps the previous one.
        self.next_due = now.checked_add(self.period).or(self.next_due);
    }

    pub fn force(&mut self) {
        self.next_due = None;
    }

    pub fn until_due(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RefreshTimer {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PERIOD)
    }
}

pub fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if now >= deadline {
        return;
    }
    std::thread::sleep(deadline.saturating_duration_since(now));
}
