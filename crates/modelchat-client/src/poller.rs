//! Download status poller.
//!
//! At most one polling task exists per `StatusPoller`. Starting a new run
//! cancels the previous one; a run ends on its own when the backend reports
//! `Downloaded` or `Failed`, or when a status fetch fails.

use std::sync::Arc;
use std::time::Duration;

use modelchat_core::ModelStatus;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backend::ModelBackend;
use crate::selection::SelectionReader;
use crate::view::StatusDisplay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
}

/// How a polling run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEnd {
    /// Terminal status reached.
    Finished(ModelStatus),
    /// A status fetch failed; treated as terminal.
    FetchFailed(String),
    /// Replaced by a newer run or stopped.
    Cancelled,
}

struct PollTask {
    token: CancellationToken,
    handle: JoinHandle<PollEnd>,
}

pub struct StatusPoller {
    backend: Arc<dyn ModelBackend>,
    selection: SelectionReader,
    display: Arc<dyn StatusDisplay>,
    interval: Duration,
    active: Option<PollTask>,
}

impl StatusPoller {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        selection: SelectionReader,
        display: Arc<dyn StatusDisplay>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            selection,
            display,
            interval,
            active: None,
        }
    }

    pub fn state(&self) -> PollState {
        match &self.active {
            Some(task) if !task.token.is_cancelled() && !task.handle.is_finished() => {
                PollState::Polling
            }
            _ => PollState::Idle,
        }
    }

    /// Begin polling, replacing any run already in progress.
    pub fn start(&mut self) {
        self.stop();

        let token = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.backend.clone(),
            self.selection.clone(),
            self.display.clone(),
            self.interval,
            token.clone(),
        ));
        info!(interval_ms = self.interval.as_millis() as u64, "Status polling started");
        self.active = Some(PollTask { token, handle });
    }

    pub(crate) fn stop(&mut self) {
        if let Some(task) = self.active.take() {
            if !task.handle.is_finished() {
                debug!("Cancelling status poll");
            }
            task.token.cancel();
        }
    }

    /// Wait for the current run to end. Returns `None` when idle.
    pub async fn wait(&mut self) -> Option<PollEnd> {
        let task = self.active.take()?;
        match task.handle.await {
            Ok(end) => Some(end),
            Err(e) => {
                error!("Status poll task failed: {}", e);
                Some(PollEnd::FetchFailed(e.to_string()))
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    backend: Arc<dyn ModelBackend>,
    selection: SelectionReader,
    display: Arc<dyn StatusDisplay>,
    period: Duration,
    token: CancellationToken,
) -> PollEnd {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return PollEnd::Cancelled,
            _ = ticker.tick() => {}
        }

        // Read at tick time, not at start time.
        let Some(model_id) = selection.current() else {
            continue;
        };

        let result = tokio::select! {
            _ = token.cancelled() => return PollEnd::Cancelled,
            result = backend.model_status(&model_id) => result,
        };

        match result {
            Ok(status) => {
                display.show_status(&status.to_string());
                if status.is_terminal() {
                    info!(model = %model_id, ?status, "Status polling finished");
                    return PollEnd::Finished(status);
                }
            }
            Err(e) => {
                error!(model = %model_id, "Error updating model status: {}", e);
                return PollEnd::FetchFailed(e.to_string());
            }
        }
    }
}
