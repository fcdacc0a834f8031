use std::{sync::Arc, time::Duration};

use tokio::{
    runtime::Handle,
    sync::{watch, Mutex},
    time::{interval_at, Instant, MissedTickBehavior},
};

use crate::usecases::chat_session::ChatSession;

const MESSAGE_POLLER_STARTED: &str = "MESSAGE_POLLER_STARTED";
const MESSAGE_POLLER_STOPPED: &str = "MESSAGE_POLLER_STOPPED";
const MESSAGE_POLLER_SHUTDOWN_SIGNALED: &str = "MESSAGE_POLLER_SHUTDOWN_SIGNALED";

/// Background poller that refreshes the open chat on a fixed interval.
///
/// At most one fetch is in flight at a time: a tick only fires after the
/// previous refresh resolved, and ticks that would have fired meanwhile are
/// skipped, not queued. Dropping the poller stops the background task.
#[derive(Debug)]
pub struct MessagePoller {
    stop_tx: Option<watch::Sender<bool>>,
}

impl MessagePoller {
    pub fn start(handle: &Handle, session: Arc<Mutex<ChatSession>>, period: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        handle.spawn(run_poller(session, period, stop_rx));

        tracing::info!(
            code = MESSAGE_POLLER_STARTED,
            period_ms = period.as_millis() as u64,
            "message poller started"
        );

        Self {
            stop_tx: Some(stop_tx),
        }
    }
}

impl Drop for MessagePoller {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::info!(
                code = MESSAGE_POLLER_SHUTDOWN_SIGNALED,
                "message poller shutdown signal sent"
            );
        }
    }
}

async fn run_poller(
    session: Arc<Mutex<ChatSession>>,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    // The session loads history when it opens; the first poll waits a full
    // period instead of refetching immediately.
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    tracing::info!(code = MESSAGE_POLLER_STOPPED, "message poller stopped");
                    return;
                }
            }
            _ = ticks.tick() => {
                let mut session = session.lock().await;
                let applied = session.refresh().await;
                tracing::debug!(applied, "poll cycle finished");
            }
        }
    }
}
