use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelChatError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP error! status: {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },

    #[error("{0}")]
    Application(String),

    #[error("No model selected")]
    NoModelSelected,

    #[error("Message and image are both empty")]
    EmptyMessage,

    #[error("Model id must not be empty")]
    EmptyModelId,

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure or non-success HTTP status.
    Transport,
    /// The backend answered but reported an `error` field.
    Application,
    /// Rejected locally before any request was sent.
    Validation,
    /// Local I/O, decoding or configuration problem.
    Local,
}

impl ModelChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } => ErrorKind::Transport,
            Self::Application(_) => ErrorKind::Application,
            Self::NoModelSelected | Self::EmptyMessage | Self::EmptyModelId => ErrorKind::Validation,
            Self::UnsupportedImage(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) => {
                ErrorKind::Local
            }
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(" - {d}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ModelChatError>;
