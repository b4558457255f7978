//! Scripted backend and recording display for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use modelchat_core::{
    ChatReply, ChatRequest, DownloadAck, DownloadSource, ModelCatalog, ModelChatError,
    ModelStatus, Result,
};

use crate::backend::ModelBackend;
use crate::session::SendGate;
use crate::view::StatusDisplay;

type Scripted<T> = std::result::Result<T, String>;

pub(crate) struct ScriptedBackend {
    catalog: Mutex<Scripted<ModelCatalog>>,
    statuses: Mutex<VecDeque<Scripted<ModelStatus>>>,
    status_calls: Mutex<Vec<String>>,
    download: Mutex<Scripted<DownloadAck>>,
    download_calls: Mutex<Vec<(String, DownloadSource)>>,
    replies: Mutex<VecDeque<Scripted<ChatReply>>>,
    chat_requests: Mutex<Vec<ChatRequest>>,
    gate: Mutex<Option<SendGate>>,
    gate_observations: Mutex<Vec<bool>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            catalog: Mutex::new(Ok(ModelCatalog::default())),
            statuses: Mutex::new(VecDeque::new()),
            status_calls: Mutex::new(Vec::new()),
            download: Mutex::new(Ok(DownloadAck::Started(serde_json::json!({"status": "started"})))),
            download_calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            chat_requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            gate_observations: Mutex::new(Vec::new()),
        }
    }

    pub fn set_catalog_json(&self, json: &str) {
        *self.catalog.lock().unwrap() = Ok(serde_json::from_str(json).unwrap());
    }

    pub fn fail_catalog(&self, message: &str) {
        *self.catalog.lock().unwrap() = Err(message.to_string());
    }

    /// Queue a status. The last queued status repeats once the queue drains.
    pub fn push_status(&self, status: Scripted<ModelStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    pub fn set_download(&self, ack: Scripted<DownloadAck>) {
        *self.download.lock().unwrap() = ack;
    }

    pub fn download_calls(&self) -> Vec<(String, DownloadSource)> {
        self.download_calls.lock().unwrap().clone()
    }

    pub fn push_reply(&self, reply: Scripted<ChatReply>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }

    /// Record whether `gate` is enabled each time `chat` is called.
    pub fn observe_gate(&self, gate: SendGate) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    pub fn gate_observations(&self) -> Vec<bool> {
        self.gate_observations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn list_models(&self) -> Result<ModelCatalog> {
        self.catalog.lock().unwrap().clone().map_err(ModelChatError::Http)
    }

    async fn model_status(&self, model_id: &str) -> Result<ModelStatus> {
        if model_id.is_empty() {
            return Err(ModelChatError::EmptyModelId);
        }
        self.status_calls.lock().unwrap().push(model_id.to_string());
        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        next.unwrap_or(Ok(ModelStatus::NotDownloaded))
            .map_err(ModelChatError::Http)
    }

    async fn start_download(&self, model_id: &str, source: DownloadSource) -> Result<DownloadAck> {
        self.download_calls
            .lock()
            .unwrap()
            .push((model_id.to_string(), source));
        self.download.lock().unwrap().clone().map_err(ModelChatError::Http)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            self.gate_observations.lock().unwrap().push(gate.is_enabled());
        }
        self.chat_requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply".to_string()))
            .map_err(ModelChatError::Http)
    }

    async fn health(&self) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
pub(crate) struct RecordingDisplay {
    statuses: Mutex<Vec<String>>,
    alerts: Mutex<Vec<String>>,
}

impl RecordingDisplay {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last_status(&self) -> Option<String> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show_status(&self, text: &str) {
        self.statuses.lock().unwrap().push(text.to_string());
    }

    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }
}
