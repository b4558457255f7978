//! Download status of a single model, as reported by `/model_status/{id}`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status text shown when no model is selected.
pub const SELECT_MODEL_PROMPT: &str = "请选择模型";

/// Raw status payload. Every field is optional and `null` counts as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub downloading: Option<bool>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub downloaded: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelStatus {
    Downloading { progress: f64 },
    Downloaded,
    Failed { message: String },
    NotDownloaded,
}

impl ModelStatus {
    /// `Downloaded` and `Failed` end a polling run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Downloaded | Self::Failed { .. })
    }
}

impl From<StatusPayload> for ModelStatus {
    fn from(p: StatusPayload) -> Self {
        if p.downloading.unwrap_or(false) {
            return Self::Downloading {
                progress: p.progress.unwrap_or(0.0),
            };
        }
        if p.downloaded.unwrap_or(false) {
            return Self::Downloaded;
        }
        match p.error {
            Some(message) if !message.is_empty() => Self::Failed { message },
            _ => Self::NotDownloaded,
        }
    }
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloading { progress } => write!(f, "下载中... {}%", format_progress(*progress)),
            Self::Downloaded => f.write_str("模型已下载"),
            Self::Failed { message } => write!(f, "下载失败: {message}"),
            Self::NotDownloaded => f.write_str("模型未下载"),
        }
    }
}

fn format_progress(progress: f64) -> String {
    if progress.fract() == 0.0 {
        format!("{progress:.0}")
    } else {
        progress.to_string()
    }
}
