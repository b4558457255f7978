//! The session object tying selection, poller and chat together.

use std::sync::Arc;
use std::time::Duration;

use modelchat_core::{
    ClientConfig, DownloadAck, DownloadSource, ErrorKind, History, ModelCatalog, ModelChatError,
    ModelList, ModelStatus, Result, SELECT_MODEL_PROMPT,
};
use tracing::{error, info, warn};

use crate::backend::ModelBackend;
use crate::image::ImageAttachment;
use crate::poller::{PollEnd, PollState, StatusPoller};
use crate::selection::Selection;
use crate::session::{ChatSession, SendGate};
use crate::view::{MessageSink, StatusDisplay};

const NOTICE_SELECT_FIRST: &str = "请先选择一个模型";
const NOTICE_SELECT_AND_DOWNLOAD: &str = "请先选择并下载一个模型";
const NOTICE_EMPTY_MESSAGE: &str = "请输入消息或选择图片";

/// One per front-end lifetime.
pub struct ModelChatApp {
    backend: Arc<dyn ModelBackend>,
    display: Arc<dyn StatusDisplay>,
    selection: Selection,
    poller: StatusPoller,
    session: ChatSession,
    models: ModelList,
    catalog: ModelCatalog,
    source: DownloadSource,
}

impl ModelChatApp {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        display: Arc<dyn StatusDisplay>,
        config: &ClientConfig,
    ) -> Self {
        Self::with_interval(backend, display, config.poll_interval(), config.download.default_source)
    }

    fn with_interval(
        backend: Arc<dyn ModelBackend>,
        display: Arc<dyn StatusDisplay>,
        interval: Duration,
        source: DownloadSource,
    ) -> Self {
        let selection = Selection::new();
        let poller = StatusPoller::new(backend.clone(), selection.subscribe(), display.clone(), interval);
        Self {
            backend,
            display,
            selection,
            poller,
            session: ChatSession::new(),
            models: ModelList::new(),
            catalog: ModelCatalog::default(),
            source,
        }
    }

    pub fn backend(&self) -> &Arc<dyn ModelBackend> {
        &self.backend
    }

    pub fn current_model(&self) -> Option<String> {
        self.selection.current()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn models(&self) -> &ModelList {
        &self.models
    }

    pub fn source(&self) -> DownloadSource {
        self.source
    }

    pub fn set_source(&mut self, source: DownloadSource) {
        info!(%source, "Download source changed");
        self.source = source;
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }

    pub fn history(&self) -> &History {
        self.session.history()
    }

    pub fn send_gate(&self) -> &SendGate {
        self.session.gate()
    }

    pub fn attachment(&self) -> Option<&ImageAttachment> {
        self.session.attachment()
    }

    pub fn attach_image(&mut self, image: ImageAttachment) {
        self.session.attach_image(image);
    }

    pub fn clear_image(&mut self) {
        self.session.clear_image();
    }

    pub fn reset_conversation(&mut self) {
        info!("Conversation reset");
        self.session.reset();
    }

    /// Fetch the catalog and rebuild the picker. Leaves the selection alone.
    pub async fn refresh_models(&mut self) -> Result<&ModelList> {
        self.models.start_loading();
        let catalog = match self.backend.list_models().await {
            Ok(catalog) => catalog,
            Err(e) => {
                self.models.loading = false;
                error!("Error fetching models: {}", e);
                return Err(e);
            }
        };

        self.models.set_catalog(&catalog);
        self.catalog = catalog;
        Ok(&self.models)
    }

    /// Initial load: fill the picker, auto-select, show that model's status.
    ///
    /// Auto-selection happens only here; later listings go through
    /// [`refresh_models`](Self::refresh_models).
    pub async fn load_models(&mut self) -> Result<&ModelList> {
        self.refresh_models().await?;
        if let Some(model) = self.catalog.initial_selection() {
            self.selection.set(model.id.clone());
        }

        if self.selection.current().is_some() {
            self.refresh_status().await;
        }
        Ok(&self.models)
    }

    /// Picker change. Shows the new model's status once; does not poll.
    pub async fn select_model(&mut self, model_id: &str) -> Option<ModelStatus> {
        self.selection.set(model_id);
        if model_id.is_empty() {
            self.display.show_status(SELECT_MODEL_PROMPT);
            return None;
        }
        self.refresh_status().await
    }

    /// Fetch and show the current model's status once.
    ///
    /// A terminal status or a failed fetch also stops a running poller.
    pub async fn refresh_status(&mut self) -> Option<ModelStatus> {
        let model_id = self.selection.current()?;
        match self.backend.model_status(&model_id).await {
            Ok(status) => {
                self.display.show_status(&status.to_string());
                if status.is_terminal() {
                    self.poller.stop();
                }
                Some(status)
            }
            Err(e) => {
                error!(model = %model_id, "Error updating model status: {}", e);
                self.poller.stop();
                None
            }
        }
    }

    /// Ask the backend to download the current model from the chosen source.
    pub async fn download(&mut self) -> Result<DownloadAck> {
        let Some(model_id) = self.selection.current() else {
            self.display.alert(NOTICE_SELECT_FIRST);
            return Err(ModelChatError::NoModelSelected);
        };

        match self.backend.start_download(&model_id, self.source).await {
            Ok(DownloadAck::Rejected(message)) => {
                self.display.alert(&message);
                Err(ModelChatError::Application(message))
            }
            Ok(ack) => {
                self.poller.start();
                Ok(ack)
            }
            Err(e) => {
                error!(model = %model_id, "Error starting download: {}", e);
                self.display.alert(&format!("启动下载失败: {e}"));
                Err(e)
            }
        }
    }

    /// Wait for the running poll to reach a terminal state.
    pub async fn wait_for_download(&mut self) -> Option<PollEnd> {
        self.poller.wait().await
    }

    /// Send one chat turn for the model selected right now.
    pub async fn send_message<S>(&mut self, text: &str, sink: &mut S) -> Result<String>
    where
        S: MessageSink + ?Sized,
    {
        let model_id = self.selection.current();
        let result = self
            .session
            .send(self.backend.as_ref(), model_id.as_deref(), text, sink)
            .await;

        if let Err(e) = &result {
            if e.kind() == ErrorKind::Validation {
                warn!("Chat turn rejected: {}", e);
                self.display.alert(match e {
                    ModelChatError::NoModelSelected => NOTICE_SELECT_AND_DOWNLOAD,
                    _ => NOTICE_EMPTY_MESSAGE,
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDisplay, ScriptedBackend};
    use crate::view::Transcript;
    use modelchat_core::Role;
    use serde_json::json;

    fn app(backend: &Arc<ScriptedBackend>, display: &Arc<RecordingDisplay>) -> ModelChatApp {
        ModelChatApp::with_interval(
            backend.clone(),
            display.clone(),
            Duration::from_secs(1),
            DownloadSource::HuggingFace,
        )
    }

    #[tokio::test]
    async fn test_initial_load_selects_downloaded_model() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_catalog_json(r#"{"m1": {"name": "Llama", "size": "7B", "downloaded": true}}"#);
        backend.push_status(Ok(ModelStatus::Downloaded));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        let models = app.load_models().await.unwrap();
        assert_eq!(models.options.len(), 2);
        assert_eq!(models.options[1].label, "Llama (7B)");

        assert_eq!(app.current_model().as_deref(), Some("m1"));
        assert_eq!(backend.status_calls(), vec!["m1".to_string()]);
        assert_eq!(display.statuses(), vec!["模型已下载"]);
        assert_eq!(app.poll_state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_initial_load_falls_back_to_first() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_catalog_json(
            r#"{
                "a": {"name": "A", "size": "1B", "downloaded": false},
                "b": {"name": "B", "size": "2B", "downloaded": false}
            }"#,
        );
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        app.load_models().await.unwrap();

        assert_eq!(app.current_model().as_deref(), Some("a"));
        assert_eq!(display.statuses(), vec!["模型未下载"]);
    }

    #[tokio::test]
    async fn test_empty_catalog_selects_nothing() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_catalog_json("{}");
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        app.load_models().await.unwrap();

        assert_eq!(app.current_model(), None);
        assert!(backend.status_calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_is_returned() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.fail_catalog("connection refused");
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        assert!(app.load_models().await.is_err());
        assert!(!app.models().loading);
        assert_eq!(app.current_model(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_relisting_keeps_user_selection_and_poll() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_catalog_json(
            r#"{
                "a": {"name": "A", "size": "1B", "downloaded": true},
                "b": {"name": "B", "size": "2B", "downloaded": false}
            }"#,
        );
        backend.push_status(Ok(ModelStatus::Downloading { progress: 5.0 }));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        app.load_models().await.unwrap();
        assert_eq!(app.current_model().as_deref(), Some("a"));
        app.select_model("b").await;
        app.download().await.unwrap();
        assert_eq!(app.poll_state(), PollState::Polling);
        let calls = backend.status_calls().len();

        let models = app.refresh_models().await.unwrap();
        assert_eq!(models.options.len(), 3);

        assert_eq!(app.current_model().as_deref(), Some("b"));
        assert_eq!(app.poll_state(), PollState::Polling);
        assert_eq!(backend.status_calls().len(), calls);
    }

    #[tokio::test]
    async fn test_refresh_models_failure_keeps_catalog() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_catalog_json(r#"{"m1": {"name": "Llama", "size": "7B", "downloaded": true}}"#);
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        app.load_models().await.unwrap();

        backend.fail_catalog("connection refused");
        assert!(app.refresh_models().await.is_err());
        assert_eq!(app.catalog().len(), 1);
        assert_eq!(app.current_model().as_deref(), Some("m1"));
        assert!(!app.models().loading);
    }

    #[tokio::test]
    async fn test_select_model() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(Ok(ModelStatus::Downloading { progress: 10.0 }));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        let status = app.select_model("m2").await;
        assert_eq!(status, Some(ModelStatus::Downloading { progress: 10.0 }));
        assert_eq!(app.poll_state(), PollState::Idle);

        assert_eq!(app.select_model("").await, None);
        assert_eq!(app.current_model(), None);
        assert_eq!(display.statuses(), vec!["下载中... 10%", "请选择模型"]);
        assert_eq!(backend.status_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_download_requires_selection() {
        let backend = Arc::new(ScriptedBackend::new());
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);

        let err = app.download().await.unwrap_err();
        assert!(matches!(err, ModelChatError::NoModelSelected));
        assert_eq!(display.alerts(), vec!["请先选择一个模型"]);
        assert!(backend.download_calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_download_does_not_poll() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_download(Ok(DownloadAck::Rejected("模型正在下载中".into())));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        app.select_model("m1").await;

        let err = app.download().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Application);
        assert_eq!(display.alerts(), vec!["模型正在下载中"]);
        assert_eq!(app.poll_state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_download_transport_failure_alerts() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.set_download(Err("connection refused".into()));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        app.select_model("m1").await;

        assert!(app.download().await.is_err());
        assert_eq!(
            display.alerts(),
            vec!["启动下载失败: HTTP error: connection refused"]
        );
        assert_eq!(app.poll_state(), PollState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_polls_until_downloaded() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(Ok(ModelStatus::NotDownloaded));
        backend.push_status(Ok(ModelStatus::Downloading { progress: 42.0 }));
        backend.push_status(Ok(ModelStatus::Downloaded));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        app.set_source(DownloadSource::ModelScope);
        app.select_model("m1").await;

        app.download().await.unwrap();
        assert_eq!(app.poll_state(), PollState::Polling);
        assert_eq!(
            backend.download_calls(),
            vec![("m1".to_string(), DownloadSource::ModelScope)]
        );

        let end = app.wait_for_download().await;
        assert_eq!(end, Some(PollEnd::Finished(ModelStatus::Downloaded)));
        assert_eq!(
            display.statuses(),
            vec!["模型未下载", "下载中... 42%", "模型已下载"]
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.status_calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_refresh_stops_poller() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_status(Ok(ModelStatus::Downloading { progress: 3.0 }));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        app.select_model("m1").await;
        app.download().await.unwrap();
        assert_eq!(app.poll_state(), PollState::Polling);

        backend.push_status(Ok(ModelStatus::Downloaded));
        // Drain the repeating downloading entry so Downloaded is served next.
        app.refresh_status().await;
        app.refresh_status().await;

        assert_eq!(app.poll_state(), PollState::Idle);
    }

    #[tokio::test]
    async fn test_send_validation_alerts() {
        let backend = Arc::new(ScriptedBackend::new());
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        let mut transcript = Transcript::new();

        assert!(app.send_message("hi", &mut transcript).await.is_err());
        app.select_model("m1").await;
        assert!(app.send_message("", &mut transcript).await.is_err());

        assert_eq!(display.alerts(), vec!["请先选择并下载一个模型", "请输入消息或选择图片"]);
        assert!(backend.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_send_uses_current_selection() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_reply(Ok(serde_json::from_value(json!({
            "response": "hello",
            "history": [["hi", "hello"]]
        }))
        .unwrap()));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        let mut transcript = Transcript::new();
        app.select_model("m1").await;
        app.select_model("m2").await;

        let reply = app.send_message("hi", &mut transcript).await.unwrap();

        assert_eq!(reply, "hello");
        assert_eq!(backend.chat_requests()[0].model_id, "m2");
        assert_eq!(
            transcript.texts(),
            vec![(Role::User, "hi"), (Role::Assistant, "hello")]
        );
        assert_eq!(app.history(), &vec![json!(["hi", "hello"])]);
        assert!(display.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_not_alerted() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_reply(Err("boom".into()));
        let display = Arc::new(RecordingDisplay::default());
        let mut app = app(&backend, &display);
        let mut transcript = Transcript::new();
        app.select_model("m1").await;

        assert!(app.send_message("hi", &mut transcript).await.is_err());
        assert!(display.alerts().is_empty());
        assert_eq!(transcript.last().unwrap().role, Role::Error);
        assert!(app.history().is_empty());
        assert!(app.send_gate().is_enabled());
    }
}
