use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

const DATA_URL_SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64,";
pub const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a base64 data url")]
    NotDataUrl,
    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

/// Self-contained `data:<mime>;base64,...` rendering of a file.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("{DATA_URL_SCHEME}{mime}{BASE64_MARKER}{}", STANDARD.encode(bytes))
}

/// Decode the data-URL payloads the server returns (stego image, watermark, video).
pub fn decode_data_url(url: &str) -> Result<DataUrl, DataUrlError> {
    let rest = url
        .trim()
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or(DataUrlError::NotDataUrl)?;
    let (mime, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or(DataUrlError::NotDataUrl)?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|err| DataUrlError::InvalidBase64(err.to_string()))?;
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    Ok(DataUrl {
        mime: mime.to_string(),
        bytes,
    })
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        _ => FALLBACK_MIME,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/tiff" => "tiff",
        "video/mp4" => "mp4",
        "video/x-msvideo" => "avi",
        "video/quicktime" => "mov",
        "video/x-matroska" => "mkv",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// Only images and videos get a preview.
pub fn is_displayable(mime: &str) -> bool {
    mime.starts_with("image/") || mime.starts_with("video/")
}
