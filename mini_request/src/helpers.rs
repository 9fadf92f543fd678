//! Header, token and notification helpers.
//!
//! None of these are wired into the dispatcher; callers use them from their
//! own interceptors or error handling.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::CONTENT_TYPE_JSON;

/// Per-call input to [`get_request_headers`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestHeadersConfig {
    pub content_type: Option<String>,
}

impl RequestHeadersConfig {
    pub fn content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
        }
    }
}

/// Build a fresh header map with `Authorization` and `Content-Type`.
///
/// `Authorization` is only set when `get_token` yields a non-empty token.
/// `Content-Type` comes from `config` when non-empty, then
/// `default_content_type`, then [`CONTENT_TYPE_JSON`].
pub fn get_request_headers(
    config: Option<&RequestHeadersConfig>,
    get_token: Option<&dyn Fn() -> Option<String>>,
    default_content_type: Option<&str>,
) -> HashMap<String, String> {
    let mut header = HashMap::new();

    if let Some(token) = get_token.and_then(|get| get()).filter(|t| !t.is_empty()) {
        header.insert("Authorization".to_string(), token);
    }

    let content_type = config
        .and_then(|c| c.content_type.as_deref())
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| default_content_type.unwrap_or(CONTENT_TYPE_JSON));
    header.insert("Content-Type".to_string(), content_type.to_string());

    header
}

/// Run the token-expired callback, if there is one.
pub fn handle_expire_token(on_token_expired: Option<&dyn Fn()>) {
    if let Some(callback) = on_token_expired {
        callback();
    }
}

/* ───────────────────────────── Toasts ───────────────────────────── */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastIcon {
    Success,
    Error,
    Loading,
    #[default]
    None,
}

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub title: String,
    pub icon: ToastIcon,
}

/// Fire-and-forget display surface for [`Toast`]s.
pub trait Notifier: Send + Sync {
    fn show_toast(&self, toast: Toast);
}

/// Notifier that writes toasts to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn show_toast(&self, toast: Toast) {
        match toast.icon {
            ToastIcon::Error | ToastIcon::None => {
                tracing::warn!(target: "mini_request::toast", icon = ?toast.icon, "{}", toast.title)
            }
            _ => tracing::info!(target: "mini_request::toast", icon = ?toast.icon, "{}", toast.title),
        }
    }
}

/// Show `message` as an icon-less toast.
pub fn show_error_msg(notifier: &dyn Notifier, message: &str) {
    notifier.show_toast(Toast {
        title: message.to_string(),
        icon: ToastIcon::None,
    });
}
