use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};

/// Marker for one elapsed second of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// Production tick period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Handle used to cancel the ticking task.
///
/// Dropping the handle without calling [`stop`] leaves the task running
/// until its receiver goes away; stopping is the controller's job at
/// teardown so no tick fires after the session ended.
///
/// [`stop`]: ClockHandle::stop
#[derive(Debug)]
pub struct ClockHandle {
    task: JoinHandle<()>,
}

impl ClockHandle {
    /// Cancel the ticking task. No ticks are produced after this returns.
    pub fn stop(self) {
        self.task.abort();
    }
}

/// Spawn a task emitting one [`Tick`] per `period` into the returned channel.
///
/// The first tick fires one full period after the call, not immediately.
/// Host timers drift, so consumers must treat ticks as "about a second
/// apart", never as exact wall-clock seconds.
pub fn start(period: Duration) -> (ClockHandle, mpsc::UnboundedReceiver<Tick>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            if tx.send(Tick).is_err() {
                break;
            }
        }
    });

    (ClockHandle { task }, rx)
}
