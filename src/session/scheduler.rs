//! Tick source and time source for the poll loop.
//!
//! Both are traits so a test can advance ticks and time by hand instead of
//! waiting on the wall clock.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{interval_at, Interval, MissedTickBehavior};

/// Fixed-interval tick source.
pub trait Scheduler {
    /// Begin ticking. The first tick arrives one period after this call.
    fn start(&mut self);

    /// Completes at the next tick. Never completes before `start` or after
    /// `cancel`.
    fn tick(&mut self) -> impl Future<Output = ()>;

    /// Stop ticking. Idempotent.
    fn cancel(&mut self);

    fn is_cancelled(&self) -> bool;
}

/// Monotonic time source used for the session deadline.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// [`Scheduler`] on top of `tokio::time::interval`.
///
/// Missed ticks are skipped rather than bursted, so a slow request never
/// leaves a backlog of ticks behind it.
#[derive(Debug)]
pub struct IntervalScheduler {
    period: Duration,
    interval: Option<Interval>,
    cancelled: bool,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            cancelled: false,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Scheduler for IntervalScheduler {
    fn start(&mut self) {
        if self.cancelled || self.interval.is_some() {
            return;
        }
        let mut interval = interval_at(tokio::time::Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn cancel(&mut self) {
        self.interval = None;
        self.cancelled = true;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
