//! Cancellable one-second countdown for timed quizzes.
//!
//! The countdown is an explicitly owned object constructed fresh per attempt:
//! one spawned task drives a `tokio::time::interval`, publishes the shrinking
//! remaining time through a watch channel, and fires expiry exactly once.
//! Dropping the countdown aborts the task, so no stray tick can outlive the
//! session that owns it.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Countdown state machine: `Idle → Running → {Expired, Stopped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Untimed quiz; the countdown never starts and never fires.
    Idle,
    Running,
    /// Reached zero; auto-submission should follow.
    Expired,
    /// Cancelled by grading or host teardown.
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: TimerState,
    remaining: u32,
}

/// An owned countdown handle. The display value it publishes is derived from
/// a server-issued remaining time; it is never fed back as authoritative.
#[derive(Debug)]
pub struct Countdown {
    rx: watch::Receiver<Snapshot>,
    // Held so the publishing side stays open for idle/stopped countdowns.
    tx: watch::Sender<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    /// A countdown for an untimed quiz: stays `Idle` forever.
    pub fn idle() -> Self {
        let (tx, rx) = watch::channel(Snapshot {
            state: TimerState::Idle,
            remaining: 0,
        });
        Self { rx, tx, task: None }
    }

    /// Start ticking down from `initial_seconds`.
    ///
    /// An initial value of zero expires on the first tick.
    pub fn start(initial_seconds: u32) -> Self {
        let (tx, rx) = watch::channel(Snapshot {
            state: TimerState::Running,
            remaining: initial_seconds,
        });
        let task_tx = tx.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut expired = false;
                task_tx.send_modify(|snap| {
                    if snap.state != TimerState::Running {
                        return;
                    }
                    snap.remaining = snap.remaining.saturating_sub(1);
                    if snap.remaining == 0 {
                        snap.state = TimerState::Expired;
                        expired = true;
                    }
                });
                if expired {
                    tracing::debug!("countdown expired");
                    break;
                }
            }
        });
        Self {
            rx,
            tx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> TimerState {
        self.rx.borrow().state
    }

    /// Seconds left, or `None` when the countdown is idle (untimed).
    pub fn remaining(&self) -> Option<u32> {
        let snap = *self.rx.borrow();
        match snap.state {
            TimerState::Idle => None,
            _ => Some(snap.remaining),
        }
    }

    /// Resolves once the countdown reaches `Expired`.
    ///
    /// Pends forever for idle or stopped countdowns, so hosts can always
    /// `select!` on it next to user input.
    pub async fn expired(&self) {
        let mut rx = self.rx.clone();
        loop {
            {
                let snap = *rx.borrow_and_update();
                match snap.state {
                    TimerState::Expired => return,
                    TimerState::Idle | TimerState::Stopped => {
                        // No further transitions will fire expiry.
                        std::future::pending::<()>().await;
                    }
                    TimerState::Running => {}
                }
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Cancel the countdown. Idempotent; an expired countdown stays expired.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.tx.send_modify(|snap| {
            if snap.state == TimerState::Running {
                snap.state = TimerState::Stopped;
            }
        });
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
