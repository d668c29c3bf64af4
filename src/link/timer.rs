//! Schedulable timers for the supervisor.
//!
//! Timers deliver [`LinkEvent`]s into the supervisor's event queue rather
//! than running callbacks of their own, so timer work is serialized with
//! every other event. Starting a timer supersedes any prior instance of
//! the same timer, keeping a single live schedule per purpose.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::trace;

use super::event::LinkEvent;

/// A single-instance timer backed by a tokio task.
pub struct TaskTimer {
    /// Label used in trace output.
    name: &'static str,
    /// Handle to the live schedule, if any.
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TaskTimer {
    /// Create an idle timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    /// Start a repeating schedule, superseding any prior one.
    ///
    /// The first event fires one full `period` after the call.
    pub fn start_repeating(
        &self,
        period: Duration,
        tx: mpsc::UnboundedSender<LinkEvent>,
        event: LinkEvent,
    ) {
        let name = self.name;
        self.replace(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // An interval's first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                trace!(timer = name, "timer fired");
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        }));
    }

    /// Start a one-shot schedule, superseding any prior one.
    pub fn start_once(
        &self,
        delay: Duration,
        tx: mpsc::UnboundedSender<LinkEvent>,
        event: LinkEvent,
    ) {
        let name = self.name;
        self.replace(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(timer = name, "timer fired");
            let _ = tx.send(event);
        }));
    }

    /// Cancel the live schedule, if any; idempotent.
    pub fn cancel(&self) {
        if let Some(handle) = self.handle.lock().take() {
            trace!(timer = self.name, "timer cancelled");
            handle.abort();
        }
    }

    /// Check if a schedule is live.
    pub fn is_active(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn replace(&self, handle: tokio::task::JoinHandle<()>) {
        let mut slot = self.handle.lock();
        if let Some(prev) = slot.take() {
            trace!(timer = self.name, "timer superseded");
            prev.abort();
        }
        *slot = Some(handle);
    }
}

impl Drop for TaskTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
