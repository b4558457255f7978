//! Chat session: history, pending image and the send cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use modelchat_core::{
    ChatReply, ChatRequest, History, ModelChatError, Result, Role, TranscriptEntry,
};
use tracing::{debug, error, info};

use crate::backend::ModelBackend;
use crate::image::ImageAttachment;
use crate::view::MessageSink;

/// The send affordance. Disabled while a turn is in flight.
#[derive(Debug, Clone, Default)]
pub struct SendGate {
    disabled: Arc<AtomicBool>,
}

impl SendGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    fn disable(&self) -> GateGuard {
        self.disabled.store(true, Ordering::SeqCst);
        GateGuard { gate: self.clone() }
    }
}

/// Re-enables the gate when dropped, on every exit path.
struct GateGuard {
    gate: SendGate,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.disabled.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    history: History,
    attachment: Option<ImageAttachment>,
    gate: SendGate,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn gate(&self) -> &SendGate {
        &self.gate
    }

    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.attachment.as_ref()
    }

    pub fn attach_image(&mut self, image: ImageAttachment) {
        debug!(path = %image.path().display(), "Image attached");
        self.attachment = Some(image);
    }

    pub fn clear_image(&mut self) {
        self.attachment = None;
    }

    /// Start a new conversation.
    pub fn reset(&mut self) {
        self.history.clear();
        self.attachment = None;
    }

    /// Send one turn.
    ///
    /// Validation failures return before anything is appended or sent. Once
    /// the request is under way, failures are appended to `sink` as an error
    /// entry and also returned; the history is only touched on success.
    pub async fn send<B, S>(
        &mut self,
        backend: &B,
        model_id: Option<&str>,
        text: &str,
        sink: &mut S,
    ) -> Result<String>
    where
        B: ModelBackend + ?Sized,
        S: MessageSink + ?Sized,
    {
        let model_id = model_id
            .filter(|id| !id.is_empty())
            .ok_or(ModelChatError::NoModelSelected)?;
        let query = text.trim();
        if query.is_empty() && self.attachment.is_none() {
            return Err(ModelChatError::EmptyMessage);
        }

        let _guard = self.gate.disable();

        if !query.is_empty() {
            sink.append(TranscriptEntry::text(Role::User, query));
        }

        let result = self.exchange(backend, model_id, query, sink).await;
        match result {
            Ok(reply) => {
                sink.append(TranscriptEntry::text(Role::Assistant, reply.response.clone()));
                self.history = reply.history;
                self.attachment = None;
                info!(model = model_id, history = self.history.len(), "Chat turn complete");
                Ok(reply.response)
            }
            Err(e) => {
                error!(model = model_id, "Error sending message: {}", e);
                sink.append(TranscriptEntry::text(Role::Error, format!("发送失败: {e}")));
                Err(e)
            }
        }
    }

    async fn exchange<B, S>(
        &self,
        backend: &B,
        model_id: &str,
        query: &str,
        sink: &mut S,
    ) -> Result<ChatReply>
    where
        B: ModelBackend + ?Sized,
        S: MessageSink + ?Sized,
    {
        let image_data = match &self.attachment {
            Some(image) => {
                let url = image.to_data_url().await?;
                sink.append(TranscriptEntry::image(Role::User, url.clone()));
                Some(url)
            }
            None => None,
        };

        let request = ChatRequest {
            model_id: model_id.to_string(),
            query: query.to_string(),
            history: self.history.clone(),
            image_data,
        };

        backend.chat(&request).await
    }
}
