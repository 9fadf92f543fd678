pub mod config;
pub mod method;
pub mod response;

pub use config::{RequestConfig, RequestOptions};
pub use method::HttpMethod;
pub use response::Response;
