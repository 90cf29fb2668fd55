//! Durable-timer clock.
//!
//! The journal asks a [`Scheduler`] for the current instant and to
//! suspend until a future one. [`SystemScheduler`] uses the wall clock;
//! [`ManualScheduler`] only moves when told to, which lets tests drive
//! timers deterministically and across engine restarts.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Notify, oneshot};

#[async_trait]
pub trait Scheduler: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Resolves once `at` has been reached. Returns at once for past instants.
    async fn suspend_until(&self, at: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemScheduler;

#[async_trait]
impl Scheduler for SystemScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn suspend_until(&self, at: DateTime<Utc>) {
        if let Ok(remaining) = (at - Utc::now()).to_std() {
            tokio::time::sleep(remaining).await;
        }
    }
}

struct Parked {
    at: DateTime<Utc>,
    seq: u64,
    waker: oneshot::Sender<()>,
}

impl PartialEq for Parked {
    fn eq(&self, other: &Self) -> bool {
        (self.at, self.seq) == (other.at, other.seq)
    }
}

impl Eq for Parked {}

impl PartialOrd for Parked {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Parked {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

struct Clock {
    now: DateTime<Utc>,
    parked: BinaryHeap<Reverse<Parked>>,
    seq: u64,
}

struct ManualInner {
    clock: Mutex<Clock>,
    parked_changed: Notify,
}

/// Scheduler whose clock only advances through [`ManualScheduler::advance_to`].
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Arc<ManualInner>,
}

impl ManualScheduler {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(ManualInner {
                clock: Mutex::new(Clock {
                    now: start,
                    parked: BinaryHeap::new(),
                    seq: 0,
                }),
                parked_changed: Notify::new(),
            }),
        }
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.inner
            .clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of suspended waiters whose futures are still alive.
    pub fn parked(&self) -> usize {
        self.clock()
            .parked
            .iter()
            .filter(|Reverse(p)| !p.waker.is_closed())
            .count()
    }

    /// Waits until at least `count` waiters are suspended.
    pub async fn wait_for_parked(&self, count: usize) {
        loop {
            let changed = self.inner.parked_changed.notified();
            if self.parked() >= count {
                return;
            }
            changed.await;
        }
    }

    /// Moves the clock forward to `at` and wakes every waiter due by then.
    pub fn advance_to(&self, at: DateTime<Utc>) {
        let due = {
            let mut clock = self.clock();
            if at > clock.now {
                clock.now = at;
            }
            let mut due = Vec::new();
            while clock
                .parked
                .peek()
                .is_some_and(|Reverse(p)| p.at <= clock.now)
            {
                if let Some(Reverse(parked)) = clock.parked.pop() {
                    due.push(parked);
                }
            }
            due
        };

        for parked in due {
            let _ = parked.waker.send(());
        }
    }

    pub fn advance_by(&self, duration: Duration) {
        let target = self.now() + duration;
        self.advance_to(target);
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.clock().now
    }

    async fn suspend_until(&self, at: DateTime<Utc>) {
        let receiver = {
            let mut clock = self.clock();
            if at <= clock.now {
                return;
            }
            let (waker, receiver) = oneshot::channel();
            clock.seq += 1;
            let seq = clock.seq;
            clock.parked.push(Reverse(Parked { at, seq, waker }));
            receiver
        };
        self.inner.parked_changed.notify_waiters();
        let _ = receiver.await;
    }
}
