use async_trait::async_trait;
use modelchat_core::{
    ChatReply, ChatRequest, ClientConfig, DownloadAck, DownloadRequest, DownloadSource,
    ModelCatalog, ModelChatError, ModelStatus, Result, StatusPayload,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// The four model-management endpoints plus the health probe.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// `GET /models`
    async fn list_models(&self) -> Result<ModelCatalog>;

    /// `GET /model_status/{id}`
    async fn model_status(&self, model_id: &str) -> Result<ModelStatus>;

    /// `POST /download_model`
    async fn start_download(&self, model_id: &str, source: DownloadSource) -> Result<DownloadAck>;

    /// `POST /chat`
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply>;

    /// `GET /health`
    async fn health(&self) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url().to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Backend returned an error status");
            return Err(ModelChatError::Status {
                status: status.as_u16(),
                detail: error_detail(&body),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| {
            ModelChatError::Http(format!(
                "Failed to parse response: {} - Body: {}",
                e,
                truncate(&body, 500)
            ))
        })
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    #[instrument(skip(self), fields(host = %self.base_url))]
    async fn list_models(&self) -> Result<ModelCatalog> {
        let url = self.url("/models");
        debug!(%url, "Fetching model list");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        let catalog: ModelCatalog = Self::decode(resp).await?;
        info!(count = catalog.len(), "Fetched model list");
        Ok(catalog)
    }

    #[instrument(skip(self), fields(model = %model_id))]
    async fn model_status(&self, model_id: &str) -> Result<ModelStatus> {
        if model_id.is_empty() {
            return Err(ModelChatError::EmptyModelId);
        }
        let url = self.url(&format!("/model_status/{}", urlencoding::encode(model_id)));
        debug!(%url, "Fetching model status");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        let payload: StatusPayload = Self::decode(resp).await?;
        Ok(payload.into())
    }

    #[instrument(skip(self), fields(model = %model_id, source = %source))]
    async fn start_download(&self, model_id: &str, source: DownloadSource) -> Result<DownloadAck> {
        if model_id.is_empty() {
            return Err(ModelChatError::EmptyModelId);
        }
        let request = DownloadRequest {
            model_id: model_id.to_string(),
            source,
        };

        let resp = self
            .client
            .post(self.url("/download_model"))
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        let body: serde_json::Value = Self::decode(resp).await?;
        let ack = DownloadAck::from(body);
        match &ack {
            DownloadAck::Started(body) => info!(%body, "Download started"),
            DownloadAck::Rejected(message) => warn!(%message, "Download rejected"),
        }
        Ok(ack)
    }

    #[instrument(skip(self, request), fields(model = %request.model_id, history = request.history.len(), image = request.image_data.is_some()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let resp = self
            .client
            .post(self.url("/chat"))
            .json(request)
            .send()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        let reply: ChatReply = Self::decode(resp).await?;
        debug!(chars = reply.response.len(), "Chat reply received");
        Ok(reply)
    }

    #[instrument(skip(self), fields(host = %self.base_url))]
    async fn health(&self) -> Result<bool> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ModelChatError::Http(e.to_string()))?;

        let health: HealthResponse = Self::decode(resp).await?;
        Ok(health.status == "healthy")
    }
}

/// Pull the `detail` field out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return Some(truncate(body, 500).to_string());
    };
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
