//! Countdowns and the tick source that drives them.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Result of advancing a countdown by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u32 },
    /// Reached zero on this tick. Returned exactly once.
    Expired,
    /// Already expired; nothing happens.
    Spent,
}

/// A whole-unit countdown. Owned by the session and mutated only by its tick handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    fired: bool,
}

impl Countdown {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            remaining: total,
            fired: false,
        }
    }

    pub fn tick(&mut self) -> Tick {
        if self.fired {
            return Tick::Spent;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.fired = true;
            Tick::Expired
        } else {
            Tick::Running {
                remaining: self.remaining,
            }
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn elapsed(&self) -> u32 {
        self.total - self.remaining
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

/// Fixed-period tick source. When stopped, `tick` never resolves, so it can
/// sit in a `select!` loop unconditionally.
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// (Re)starts ticking; the first tick fires one full period from now.
    pub fn start(&mut self) {
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    /// Stops ticking. A no-op when already stopped.
    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
