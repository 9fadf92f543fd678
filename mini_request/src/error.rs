use thiserror::Error;

/// A unified error type for this library.
///
/// Every stage of a dispatch (request interceptor, network primitive,
/// response interceptor) reports failures through this type, and the
/// dispatcher hands them back to the caller exactly as they were produced.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The `reqwest` transport failed (connect, timeout, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// An opaque failure reported by a custom network primitive.
    #[error("Request failed: {err_msg}")]
    Platform {
        err_msg: String,
        errno: Option<i32>,
    },

    /// A request or response interceptor rejected the call.
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// The final URL handed to the primitive could not be parsed.
    #[error("Invalid URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The configured proxy could not be turned into a `reqwest::Proxy`.
    #[error("Invalid proxy URL `{proxy}`: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    /// Serde (de)serialization error.
    #[error("Serde JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Payload could not be encoded as `application/x-www-form-urlencoded`.
    #[error("Form encoding error: {0}")]
    UrlEncode(#[from] serde_urlencoded::ser::Error),

    // Other
    #[error("Other error: {0}")]
    Other(String),
}

impl RequestError {
    /// Shorthand for a platform failure without an error number.
    pub fn platform(err_msg: impl Into<String>) -> Self {
        RequestError::Platform {
            err_msg: err_msg.into(),
            errno: None,
        }
    }

    /// Shorthand for an interceptor failure.
    pub fn interceptor(message: impl Into<String>) -> Self {
        RequestError::Interceptor(message.into())
    }
}
