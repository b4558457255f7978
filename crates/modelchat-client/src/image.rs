//! Image attachments, encoded as `data:` URLs before they are sent.

use std::path::{Path, PathBuf};

use base64::Engine;
use modelchat_core::{ModelChatError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    path: PathBuf,
}

impl ImageAttachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file and encode it as `data:<mime>;base64,<payload>`.
    pub async fn to_data_url(&self) -> Result<String> {
        let mime = mime_type(&self.path)?;
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(data_url(mime, &bytes))
    }
}

pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn mime_type(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        "bmp" => Ok("image/bmp"),
        _ => Err(ModelChatError::UnsupportedImage(path.display().to_string())),
    }
}
