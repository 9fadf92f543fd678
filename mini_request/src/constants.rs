//! Content-Type strings understood by the platform network layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// JSON payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";
/// Plain text payloads.
pub const CONTENT_TYPE_TEXT: &str = "text/plain;charset=UTF-8";
/// URL-encoded form payloads.
pub const CONTENT_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded;charset=UTF-8";
/// Multipart payloads (file upload).
pub const CONTENT_TYPE_FORM_DATA: &str = "multipart/form-data;charset=UTF-8";

/// Default per-request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Named view over the content-type constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    #[default]
    Json,
    Text,
    FormUrlencoded,
    FormData,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => CONTENT_TYPE_JSON,
            ContentType::Text => CONTENT_TYPE_TEXT,
            ContentType::FormUrlencoded => CONTENT_TYPE_FORM_URLENCODED,
            ContentType::FormData => CONTENT_TYPE_FORM_DATA,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ContentType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
