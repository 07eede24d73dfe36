//! Background watcher that keeps the running shift's live view current.
//!
//! The open shift is re-queried whenever the store publishes a change; the
//! derived timings are recomputed on every tick in between. Every
//! [`REQUERY_TICKS`] ticks the shift is re-read as well, which picks up writes
//! made by other processes sharing the database file.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::live::LiveShiftView;
use crate::models::Shift;
use crate::services::LocalStore;

pub const REQUERY_TICKS: u32 = 5;

/// Handle to a running watcher. Dropping it stops the task.
pub struct CurrentShiftWatcher {
    receiver: watch::Receiver<Option<LiveShiftView>>,
    task: JoinHandle<()>,
}

impl CurrentShiftWatcher {
    /// Spawn a watcher on the current tokio runtime.
    pub fn spawn(store: LocalStore, tick: Duration) -> Self {
        let (sender, receiver) = watch::channel(None);
        let task = tokio::spawn(run(store, tick, sender));
        Self { receiver, task }
    }

    /// A receiver that observes every published view
    pub fn subscribe(&self) -> watch::Receiver<Option<LiveShiftView>> {
        self.receiver.clone()
    }

    /// The most recently published view
    pub fn latest(&self) -> Option<LiveShiftView> {
        self.receiver.borrow().clone()
    }
}

impl Drop for CurrentShiftWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(store: LocalStore, tick: Duration, sender: watch::Sender<Option<LiveShiftView>>) {
    let mut events = store.subscribe();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut current = load_current(&store, None).await;
    let mut ticks = 0_u32;

    loop {
        let view = current
            .as_ref()
            .map(|shift| LiveShiftView::compute(shift, Utc::now()));
        if sender.send(view).is_err() {
            break;
        }

        tokio::select! {
            event = events.recv() => match event {
                Ok(_) | Err(RecvError::Lagged(_)) => {
                    current = load_current(&store, current).await;
                }
                Err(RecvError::Closed) => break,
            },
            _ = interval.tick() => {
                ticks = ticks.wrapping_add(1);
                if ticks % REQUERY_TICKS == 0 {
                    current = load_current(&store, current).await;
                }
            }
            () = sender.closed() => break,
        }
    }

    tracing::debug!("Current shift watcher stopped");
}

async fn load_current(store: &LocalStore, previous: Option<Shift>) -> Option<Shift> {
    match store.current_shift().await {
        Ok(shift) => shift,
        Err(e) => {
            tracing::warn!("Failed to load current shift: {e}");
            previous
        }
    }
}
