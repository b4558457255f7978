//! Output seams between the controllers and whatever renders them.

use modelchat_core::{MessageContent, Role, TranscriptEntry};

/// Append-only chat transcript.
pub trait MessageSink {
    fn append(&mut self, entry: TranscriptEntry);
}

/// Download-status line and user-facing notices.
///
/// Shared with the poller task, hence `Send + Sync` and `&self`.
pub trait StatusDisplay: Send + Sync {
    fn show_status(&self, text: &str);
    fn alert(&self, message: &str);
}

/// In-memory transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Text entries as `(role, text)` pairs, images skipped.
    pub fn texts(&self) -> Vec<(Role, &str)> {
        self.entries
            .iter()
            .filter_map(|e| match &e.content {
                MessageContent::Text(t) => Some((e.role, t.as_str())),
                MessageContent::Image(_) => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl MessageSink for Transcript {
    fn append(&mut self, entry: TranscriptEntry) {
        self.entries.push(entry);
    }
}
