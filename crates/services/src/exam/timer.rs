use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

const TICK_BUFFER: usize = 16;

/// Recurring one-tick-per-period driver for an exam countdown.
///
/// Ticks arrive on the receiver returned by `start`; the host applies each
/// one to the session before handling its next event. Stopping or dropping
/// the timer cancels the task, so no tick outlives the exam screen. Delayed
/// ticks are delivered in a burst to keep the countdown in step with wall time.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn the timer on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn start(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(TICK_BUFFER);
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if tx.send(()).await.is_err() {
                    debug!("countdown receiver dropped, timer exiting");
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    #[must_use]
    pub fn every_second() -> (Self, mpsc::Receiver<()>) {
        Self::start(Duration::from_secs(1))
    }

    pub fn stop(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
