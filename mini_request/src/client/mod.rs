mod client;
mod interceptors;

pub use client::{create_request, Dispatcher};
pub use interceptors::{RequestInterceptor, ResponseInterceptor};
