//! The current model id, shared between the controllers and the poller.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Single source of truth for the selected model. Empty means none.
///
/// Readers always see the latest value, so a poll tick scheduled before a
/// selection change still queries the newly selected model.
#[derive(Debug, Clone)]
pub struct Selection {
    tx: Arc<watch::Sender<String>>,
}

impl Selection {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(String::new());
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, model_id: impl Into<String>) {
        let model_id = model_id.into();
        info!(model = %model_id, "Model selected");
        self.tx.send_replace(model_id);
    }

    pub fn clear(&self) {
        self.set(String::new());
    }

    /// The selected id, or `None` when nothing is selected.
    pub fn current(&self) -> Option<String> {
        let id = self.tx.borrow();
        (!id.is_empty()).then(|| id.clone())
    }

    pub fn subscribe(&self) -> SelectionReader {
        SelectionReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view handed to background tasks.
#[derive(Debug, Clone)]
pub struct SelectionReader {
    rx: watch::Receiver<String>,
}

impl SelectionReader {
    pub fn current(&self) -> Option<String> {
        let id = self.rx.borrow();
        (!id.is_empty()).then(|| id.clone())
    }
}
