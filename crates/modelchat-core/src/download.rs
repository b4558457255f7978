use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelChatError;

/// Hub the backend pulls model weights from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadSource {
    #[default]
    HuggingFace,
    ModelScope,
}

impl DownloadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadSource::HuggingFace => "huggingface",
            DownloadSource::ModelScope => "modelscope",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DownloadSource::HuggingFace => "Hugging Face",
            DownloadSource::ModelScope => "ModelScope",
        }
    }

    pub fn all() -> &'static [DownloadSource] {
        &[DownloadSource::HuggingFace, DownloadSource::ModelScope]
    }
}

impl fmt::Display for DownloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadSource {
    type Err = ModelChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DownloadSource::all()
            .iter()
            .copied()
            .find(|src| src.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelChatError::Config(format!("unknown download source: {s}")))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest {
    pub model_id: String,
    pub source: DownloadSource,
}

/// Outcome of `POST /download_model`.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadAck {
    /// The backend accepted the request; the body is kept as returned.
    Started(serde_json::Value),
    /// HTTP 200 with a truthy `error` field.
    Rejected(String),
}

impl From<serde_json::Value> for DownloadAck {
    fn from(body: serde_json::Value) -> Self {
        match body.get("error").and_then(rejection_message) {
            Some(message) => DownloadAck::Rejected(message),
            None => DownloadAck::Started(body),
        }
    }
}

/// `null`, `false`, `0` and `""` do not count as an error.
fn rejection_message(error: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
