use serde::{Deserialize, Serialize};

/// Conversation history as the backend returns it.
///
/// The items are never inspected or edited on this side; the whole sequence is
/// sent with each turn and replaced by whatever comes back.
pub type History = Vec<serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model_id: String,
    pub query: String,
    pub history: History,
    /// Data URL of an attached image; serialized as `null` when absent.
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub history: History,
}

/// Who a transcript entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    /// Image as a `data:` URL.
    Image(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: MessageContent,
}

impl TranscriptEntry {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn image(role: Role, data_url: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Image(data_url.into()),
        }
    }
}
