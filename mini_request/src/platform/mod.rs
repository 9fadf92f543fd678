//! The network primitive seam.
//!
//! The dispatcher never talks to the network itself. It hands a fully
//! defaulted [`PlatformRequest`] to a [`NetworkPrimitive`] and gets back a
//! raw [`PlatformResponse`] or the primitive's own failure. The crate ships
//! a `reqwest`-backed primitive; tests and embedders plug in their own.

mod reqwest_primitive;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RequestError;
use crate::types::HttpMethod;

pub use reqwest_primitive::{PrimitiveOptions, ReqwestPrimitive};

/// Input to a single network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRequest {
    pub url: String,
    pub method: HttpMethod,
    pub data: Option<Value>,
    pub header: HashMap<String, String>,
    /// Milliseconds.
    pub timeout: u64,
}

/// Raw result of a network call, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResponse {
    pub status_code: u16,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub header: Option<HashMap<String, String>>,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
}

/// "Perform network request, get response."
///
/// Implementations report every failure as a [`RequestError`]; the
/// dispatcher returns that value to its caller unchanged.
#[async_trait]
pub trait NetworkPrimitive: Send + Sync {
    async fn request(&self, request: PlatformRequest) -> Result<PlatformResponse, RequestError>;
}

#[async_trait]
impl<P: NetworkPrimitive + ?Sized> NetworkPrimitive for std::sync::Arc<P> {
    async fn request(&self, request: PlatformRequest) -> Result<PlatformResponse, RequestError> {
        (**self).request(request).await
    }
}
