use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, CONTENT_TYPE, SET_COOKIE};
use reqwest::{Client, ClientBuilder, Proxy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{NetworkPrimitive, PlatformRequest, PlatformResponse};
use crate::error::RequestError;

/// Construction options for [`ReqwestPrimitive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimitiveOptions {
    /// Optional HTTP proxy used for every request. Accepted formats:
    /// * `http://USERNAME:PASSWORD@IP:PORT`
    /// * `http://IP:PORT`
    /// * `IP:PORT` *(scheme defaults to `http://`)*
    pub proxy: Option<String>,
    pub user_agent: Option<String>,
    /// Handed to `reqwest`'s own idle pool.
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
}

impl Default for PrimitiveOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            user_agent: None,
            pool_max_idle_per_host: 10,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Network primitive backed by a `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestPrimitive {
    http: Client,
}

impl Debug for ReqwestPrimitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestPrimitive")
            .field("http", &"reqwest::Client")
            .finish()
    }
}

impl Default for ReqwestPrimitive {
    fn default() -> Self {
        Self::from_client(Client::new())
    }
}

impl ReqwestPrimitive {
    pub fn new(options: &PrimitiveOptions) -> Result<Self, RequestError> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(options.pool_idle_timeout_secs))
            .use_rustls_tls();

        if let Some(ua) = &options.user_agent {
            builder = builder.user_agent(ua.as_str());
        }

        if let Some(p) = &options.proxy {
            let full = if p.starts_with("http://") || p.starts_with("https://") {
                p.clone()
            } else {
                format!("http://{p}")
            };

            let proxy = Proxy::all(full.as_str())
                .map_err(|source| RequestError::InvalidProxy { proxy: full.clone(), source })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self::from_client(builder.build()?))
    }

    /// Wrap an already configured client.
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

/// A body sent without a caller-set `Content-Type` is labelled
/// `application/json`, string payloads included.
#[async_trait]
impl NetworkPrimitive for ReqwestPrimitive {
    async fn request(&self, request: PlatformRequest) -> Result<PlatformResponse, RequestError> {
        let PlatformRequest {
            url,
            method,
            data,
            header,
            timeout,
        } = request;

        let mut target = Url::parse(&url).map_err(|source| RequestError::InvalidUrl {
            url: url.clone(),
            source,
        })?;

        let form = header
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .map(|(_, v)| v.to_ascii_lowercase().contains("application/x-www-form-urlencoded"));
        let has_content_type = form.is_some();
        let form = form.unwrap_or(false);

        let body = match data {
            None | Some(Value::Null) => None,
            Some(data) if !method.carries_body() => {
                append_query(&mut target, &data)?;
                None
            }
            Some(Value::String(text)) => Some(text.into_bytes()),
            Some(data) if form => Some(url_encode(&data)?.into_bytes()),
            Some(data) => Some(serde_json::to_vec(&data)?),
        };

        tracing::trace!(
            target: "mini_request::platform",
            %method,
            url = %target,
            timeout,
            has_body = body.is_some(),
            "sending request"
        );

        let mut req = self
            .http
            .request(method.into(), target)
            .timeout(Duration::from_millis(timeout));

        for (k, v) in &header {
            req = req.header(k.as_str(), v.as_str());
        }

        if let Some(body) = body {
            if !has_content_type {
                req = req.header(CONTENT_TYPE, "application/json");
            }
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status_code = resp.status().as_u16();
        let (header, cookies) = flatten_headers(resp.headers());
        let bytes = resp.bytes().await?;

        tracing::trace!(
            target: "mini_request::platform",
            status = status_code,
            bytes = bytes.len(),
            "response received"
        );

        Ok(PlatformResponse {
            status_code,
            data: decode_body(&bytes),
            header: Some(header),
            cookies,
        })
    }
}

/// Fold a payload into the query string of a body-less request.
fn append_query(url: &mut Url, data: &Value) -> Result<(), RequestError> {
    let encoded = match data {
        Value::Object(_) => url_encode(data)?,
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    if encoded.is_empty() {
        return Ok(());
    }

    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
        _ => encoded,
    };
    url.set_query(Some(&query));
    Ok(())
}

/// URL-encode a payload, leaving out top-level `null` entries.
fn url_encode(data: &Value) -> Result<String, RequestError> {
    match data {
        Value::Object(map) => {
            let present = map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .collect::<Vec<_>>();
            Ok(serde_urlencoded::to_string(&present)?)
        }
        other => Ok(serde_urlencoded::to_string(other)?),
    }
}

/// Flatten a header map into single strings and pull out every `Set-Cookie`.
fn flatten_headers(headers: &HeaderMap) -> (HashMap<String, String>, Option<Vec<String>>) {
    let mut flat = HashMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        flat.insert(name.as_str().to_string(), joined);
    }

    let cookies = headers
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect::<Vec<_>>();

    (flat, (!cookies.is_empty()).then_some(cookies))
}

/// JSON when the body parses as JSON, otherwise the body as text.
fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}
