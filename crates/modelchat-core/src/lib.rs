// Domain modules
pub mod chat;
pub mod config;
pub mod download;
pub mod error;
pub mod model;
pub mod model_list;
pub mod status;

pub use chat::{ChatReply, ChatRequest, History, MessageContent, Role, TranscriptEntry};
pub use config::ClientConfig;
pub use download::{DownloadAck, DownloadRequest, DownloadSource};
pub use error::{ErrorKind, ModelChatError, Result};
pub use model::{ModelCatalog, ModelDescriptor};
pub use model_list::{ModelList, ModelOption, PLACEHOLDER_LABEL};
pub use status::{ModelStatus, StatusPayload, SELECT_MODEL_PROMPT};
