//! Interceptor slots.
//!
//! Each slot holds one transform behind an `Arc`. Setting a slot replaces
//! the previous transform wholesale; there is no chaining.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::RequestError;
use crate::types::{RequestConfig, Response};

/// Transform applied to every config before it reaches the network.
pub type RequestInterceptor =
    Arc<dyn Fn(RequestConfig) -> BoxFuture<'static, Result<RequestConfig, RequestError>> + Send + Sync>;

/// Transform applied to every normalized response; its output is what
/// `dispatch` resolves with.
pub type ResponseInterceptor<T> =
    Arc<dyn Fn(Response) -> BoxFuture<'static, Result<T, RequestError>> + Send + Sync>;

pub(crate) fn request_interceptor<F, Fut>(f: F) -> RequestInterceptor
where
    F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestConfig, RequestError>> + Send + 'static,
{
    Arc::new(move |config| Box::pin(f(config)))
}

pub(crate) fn response_interceptor<T, F, Fut>(f: F) -> ResponseInterceptor<T>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
{
    Arc::new(move |response| Box::pin(f(response)))
}

pub(crate) fn identity_request() -> RequestInterceptor {
    request_interceptor(|config| async move { Ok(config) })
}

pub(crate) fn identity_response() -> ResponseInterceptor<Response> {
    response_interceptor(|response| async move { Ok(response) })
}
