//! # mini_request
//!
//! A small asynchronous HTTP request layer: a [`Dispatcher`] that joins
//! request paths onto a base URL, runs a request interceptor, hands the call
//! to a pluggable network primitive (`reqwest` by default) and passes the
//! normalized [`Response`] through a response interceptor.
//!
//! ```no_run
//! use mini_request::{create_request, get_request_headers, RequestError};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), RequestError> {
//! let request = create_request("https://api.example.com");
//!
//! request
//!     .set_request_interceptor(|mut config| async move {
//!         let get_token = || Some("Bearer token".to_string());
//!         config.header = Some(get_request_headers(None, Some(&get_token), None));
//!         Ok(config)
//!     })
//!     .await;
//!
//! let users = request.get("/users", Some(json!({ "page": 1 })), None).await?;
//! println!("{} {}", users.status_code, users.data);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod constants;
pub mod error;
pub mod helpers;
pub mod platform;
pub mod types;
pub mod util;

pub use client::*;
pub use constants::*;
pub use error::RequestError;
pub use helpers::{
    get_request_headers, handle_expire_token, show_error_msg, Notifier, RequestHeadersConfig,
    Toast, ToastIcon, TracingNotifier,
};
pub use platform::{NetworkPrimitive, PlatformRequest, PlatformResponse, PrimitiveOptions, ReqwestPrimitive};
pub use types::*;
pub use util::join;
