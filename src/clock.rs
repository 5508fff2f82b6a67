use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDateTime};

/// Source of the local wall-clock time the rotation is evaluated against.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn label(&self) -> &'static str;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn label(&self) -> &'static str {
        "LOCAL_WALL_CLOCK"
    }
}

/// Clock pinned to a single instant. Every query sees the same `now`.
pub struct FixedClock {
    at: NaiveDateTime,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.at
    }

    fn label(&self) -> &'static str {
        "FIXED"
    }
}

pub fn select_clock(at: Option<NaiveDateTime>) -> Box<dyn Clock> {
    match at {
        Some(at) => Box::new(FixedClock::new(at)),
        None => Box::new(SystemClock),
    }
}

pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M"))
        .map_err(|_| anyhow!("invalid local datetime '{input}', expected YYYY-MM-DDTHH:MM[:SS]"))
}
