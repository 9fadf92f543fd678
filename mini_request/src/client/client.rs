//! Request dispatcher.
//!
//! A [`Dispatcher`] owns a base URL, a network primitive and two interceptor
//! slots. Every verb helper funnels into [`Dispatcher::dispatch`]:
//!
//! 1. the current request interceptor rewrites the config,
//! 2. the config URL is joined onto the base URL,
//! 3. the primitive performs the call,
//! 4. the raw result is normalized into a [`Response`] and handed to the
//!    current response interceptor, whose output is returned.
//!
//! Interceptor slots are read at the moment each step runs, so a swap made
//! while calls are in flight is seen by every call that reaches that step
//! afterwards.

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::client::interceptors::{
    identity_request, identity_response, request_interceptor, response_interceptor,
    RequestInterceptor, ResponseInterceptor,
};
use crate::constants::DEFAULT_TIMEOUT_MS;
use crate::error::RequestError;
use crate::platform::{NetworkPrimitive, PlatformRequest, ReqwestPrimitive};
use crate::types::{HttpMethod, RequestConfig, RequestOptions, Response};
use crate::util::join;

/// Main entry point for issuing requests.
///
/// `T` is what a call resolves with; it is [`Response`] unless a response
/// interceptor installed through [`Dispatcher::with_response_interceptor`]
/// maps responses to something else.
///
/// Clones share the primitive and both interceptor slots.
pub struct Dispatcher<T = Response> {
    base_url: String,
    primitive: Arc<dyn NetworkPrimitive>,
    request: Arc<RwLock<RequestInterceptor>>,
    response: Arc<RwLock<ResponseInterceptor<T>>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            primitive: Arc::clone(&self.primitive),
            request: Arc::clone(&self.request),
            response: Arc::clone(&self.response),
        }
    }
}

impl<T> Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url)
            .field("primitive", &"Arc<dyn NetworkPrimitive>")
            .field("request", &"Arc<RwLock<RequestInterceptor>>")
            .field("response", &"Arc<RwLock<ResponseInterceptor>>")
            .finish()
    }
}

/// Create a dispatcher on the default `reqwest` primitive.
pub fn create_request(base_url: impl Into<String>) -> Dispatcher {
    Dispatcher::new(base_url)
}

impl Default for Dispatcher<Response> {
    /// No base URL; every request path is used as given.
    fn default() -> Self {
        Self::new("")
    }
}

impl Dispatcher<Response> {
    /// Construct a new [`Dispatcher`] with identity interceptors and the
    /// default [`ReqwestPrimitive`].
    ///
    /// # Parameters
    /// * `base_url` – prefix for relative request paths (e.g.
    ///   `https://api.example.com`); may be empty.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_primitive(base_url, ReqwestPrimitive::default())
    }

    /// Construct a new [`Dispatcher`] on a caller-supplied primitive.
    pub fn with_primitive<P>(base_url: impl Into<String>, primitive: P) -> Self
    where
        P: NetworkPrimitive + 'static,
    {
        Self {
            base_url: base_url.into(),
            primitive: Arc::new(primitive),
            request: Arc::new(RwLock::new(identity_request())),
            response: Arc::new(RwLock::new(identity_response())),
        }
    }
}

impl<T: Send + 'static> Dispatcher<T> {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /* ─────────────────────────── Interceptors ─────────────────────────── */

    /// Replace the request interceptor in place.
    ///
    /// Visible to every clone of this dispatcher and to in-flight calls that
    /// have not yet reached the request step.
    pub async fn set_request_interceptor<F, Fut>(&self, interceptor: F)
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestConfig, RequestError>> + Send + 'static,
    {
        *self.request.write().await = request_interceptor(interceptor);
    }

    /// Replace the response interceptor in place.
    ///
    /// Visible to every clone of this dispatcher and to in-flight calls that
    /// have not yet reached the response step.
    pub async fn set_response_interceptor<F, Fut>(&self, interceptor: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        *self.response.write().await = response_interceptor(interceptor);
    }

    /// Builder form of [`Dispatcher::set_request_interceptor`].
    ///
    /// The returned dispatcher gets its own request slot; the response slot
    /// stays shared with clones of `self`.
    pub fn with_request_interceptor<F, Fut>(mut self, interceptor: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<RequestConfig, RequestError>> + Send + 'static,
    {
        self.request = Arc::new(RwLock::new(request_interceptor(interceptor)));
        self
    }

    /// Builder form of [`Dispatcher::set_response_interceptor`] that may
    /// change what calls resolve with, e.g. only the response `data`.
    ///
    /// The returned dispatcher keeps sharing the request slot with clones of
    /// `self`.
    pub fn with_response_interceptor<U, F, Fut>(self, interceptor: F) -> Dispatcher<U>
    where
        U: Send + 'static,
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, RequestError>> + Send + 'static,
    {
        Dispatcher {
            base_url: self.base_url,
            primitive: self.primitive,
            request: self.request,
            response: Arc::new(RwLock::new(response_interceptor(interceptor))),
        }
    }

    /* ───────────────────────────── Dispatch ───────────────────────────── */

    /// Run one request through the interceptor pipeline.
    ///
    /// Failures from either interceptor or from the primitive are returned
    /// exactly as produced; nothing is retried or wrapped.
    pub async fn dispatch(&self, config: RequestConfig) -> Result<T, RequestError> {
        let interceptor = self.request.read().await.clone();
        let config = interceptor(config).await?;

        let url = join(&self.base_url, &config.url);
        let method = config.method.unwrap_or_default();
        // Zero counts as unset.
        let timeout = config
            .timeout
            .filter(|t| *t > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        tracing::debug!(target: "mini_request::dispatch", %method, %url, timeout, "dispatching request");

        let raw = match self
            .primitive
            .request(PlatformRequest {
                url,
                method,
                data: config.data,
                header: config.header.unwrap_or_default(),
                timeout,
            })
            .await
        {
            Ok(raw) => raw,
            Err(err) => {
                tracing::debug!(target: "mini_request::dispatch", %method, err = %err, "request failed");
                return Err(err);
            }
        };

        tracing::debug!(target: "mini_request::dispatch", %method, status = raw.status_code, "response received");

        let response = Response {
            status_code: raw.status_code,
            data: raw.data,
            header: raw.header.unwrap_or_default(),
            cookies: raw.cookies,
            extra: Map::new(),
        };

        let interceptor = self.response.read().await.clone();
        interceptor(response).await
    }

    /* ───────────── Convenience wrappers around HTTP verbs ───────────── */

    /// GET request; `data` is sent as query parameters.
    pub async fn get(
        &self,
        url: &str,
        data: Option<Value>,
        options: Option<RequestOptions>,
    ) -> Result<T, RequestError> {
        self.dispatch(RequestConfig::from_parts(url, HttpMethod::Get, data, options))
            .await
    }

    /// POST request; `data` is the request body.
    pub async fn post(
        &self,
        url: &str,
        data: Option<Value>,
        options: Option<RequestOptions>,
    ) -> Result<T, RequestError> {
        self.dispatch(RequestConfig::from_parts(url, HttpMethod::Post, data, options))
            .await
    }

    /// PUT request; `data` is the request body.
    pub async fn put(
        &self,
        url: &str,
        data: Option<Value>,
        options: Option<RequestOptions>,
    ) -> Result<T, RequestError> {
        self.dispatch(RequestConfig::from_parts(url, HttpMethod::Put, data, options))
            .await
    }

    /// DELETE request; `data` is sent as query parameters.
    pub async fn delete(
        &self,
        url: &str,
        data: Option<Value>,
        options: Option<RequestOptions>,
    ) -> Result<T, RequestError> {
        self.dispatch(RequestConfig::from_parts(url, HttpMethod::Delete, data, options))
            .await
    }
}
