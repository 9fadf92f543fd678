//! Dispatcher pipeline tests against an in-memory network primitive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mini_request::{
    get_request_headers, Dispatcher, HttpMethod, NetworkPrimitive, PlatformRequest,
    PlatformResponse, RequestConfig, RequestError, RequestOptions, Response,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

/// Records every call and answers with a canned result.
#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<PlatformRequest>>,
    fail_with: Option<String>,
    omit_header: bool,
    gate: Option<Arc<Notify>>,
}

impl Recording {
    fn calls(&self) -> Vec<PlatformRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkPrimitive for Recording {
    async fn request(&self, request: PlatformRequest) -> Result<PlatformResponse, RequestError> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if let Some(msg) = &self.fail_with {
            return Err(RequestError::Platform {
                err_msg: msg.clone(),
                errno: Some(-101),
            });
        }

        Ok(PlatformResponse {
            status_code: 200,
            data: json!({ "echo": request.url, "user": { "id": 1 } }),
            header: (!self.omit_header)
                .then(|| HashMap::from([("content-type".to_string(), "application/json".to_string())])),
            cookies: Some(vec!["sid=abc".to_string()]),
        })
    }
}

fn dispatcher(base: &str) -> (Dispatcher, Arc<Recording>) {
    let primitive = Arc::new(Recording::default());
    (Dispatcher::with_primitive(base, Arc::clone(&primitive)), primitive)
}

#[tokio::test]
async fn defaults_are_filled_before_the_primitive_call() {
    let (request, primitive) = dispatcher("https://api.x.com/");

    let resp = request.dispatch(RequestConfig::new("/users")).await.unwrap();

    let calls = primitive.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://api.x.com/users");
    assert_eq!(calls[0].method, HttpMethod::Get);
    assert_eq!(calls[0].timeout, 30_000);
    assert!(calls[0].header.is_empty());
    assert!(calls[0].data.is_none());

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.data["echo"], json!("https://api.x.com/users"));
    assert_eq!(resp.header_value("Content-Type"), Some("application/json"));
    assert_eq!(resp.cookies, Some(vec!["sid=abc".to_string()]));
}

#[tokio::test]
async fn zero_timeout_falls_back_to_default() {
    let (request, primitive) = dispatcher("");
    request
        .dispatch(RequestConfig::new("https://b.com").timeout(0))
        .await
        .unwrap();
    request
        .dispatch(RequestConfig::new("https://b.com").timeout(1500))
        .await
        .unwrap();

    let calls = primitive.calls();
    assert_eq!(calls[0].timeout, 30_000);
    assert_eq!(calls[1].timeout, 1500);
}

#[tokio::test]
async fn verb_helpers_set_method_data_and_options() {
    let (request, primitive) = dispatcher("https://a.com");
    let options = RequestOptions::default()
        .with_header("X-Trace", "t1")
        .with_timeout(5000);

    request.get("users", Some(json!({"page": 1})), None).await.unwrap();
    request.post("/users", Some(json!({"name": "test"})), Some(options)).await.unwrap();
    request.put("/users/1", None, None).await.unwrap();
    request.delete("/users/1", None, None).await.unwrap();

    let calls = primitive.calls();
    let methods: Vec<_> = calls.iter().map(|c| c.method).collect();
    assert_eq!(
        methods,
        vec![HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
    );
    assert_eq!(calls[0].url, "https://a.com/users");
    assert_eq!(calls[0].data, Some(json!({"page": 1})));
    assert_eq!(calls[1].data, Some(json!({"name": "test"})));
    assert_eq!(calls[1].header.get("X-Trace").map(String::as_str), Some("t1"));
    assert_eq!(calls[1].timeout, 5000);
    assert_eq!(calls[3].url, "https://a.com/users/1");
}

#[tokio::test]
async fn absolute_url_bypasses_base() {
    let (request, primitive) = dispatcher("https://a.com");
    request.get("http://other.org/ping", None, None).await.unwrap();
    assert_eq!(primitive.calls()[0].url, "http://other.org/ping");
}

#[tokio::test]
async fn request_interceptor_runs_before_the_primitive() {
    let (request, primitive) = dispatcher("https://a.com");
    request
        .set_request_interceptor(|mut config| async move {
            config
                .header
                .get_or_insert_with(HashMap::new)
                .insert("Authorization".to_string(), "X".to_string());
            Ok(config)
        })
        .await;

    request.get("/me", None, None).await.unwrap();

    assert_eq!(
        primitive.calls()[0].header.get("Authorization").map(String::as_str),
        Some("X")
    );
}

#[tokio::test]
async fn request_interceptor_can_rewrite_url_and_method() {
    let (request, primitive) = dispatcher("https://a.com/v1/");
    request
        .set_request_interceptor(|config| async move {
            let get_token = || Some("tok".to_string());
            let header = get_request_headers(None, Some(&get_token), None);
            Ok(RequestConfig {
                url: format!("/v2{}", config.url),
                method: Some(HttpMethod::Head),
                header: Some(header),
                ..config
            })
        })
        .await;

    request.get("/items", None, None).await.unwrap();

    let call = &primitive.calls()[0];
    assert_eq!(call.url, "https://a.com/v1/v2/items");
    assert_eq!(call.method, HttpMethod::Head);
    assert_eq!(call.header.get("Authorization").map(String::as_str), Some("tok"));
    assert_eq!(
        call.header.get("Content-Type").map(String::as_str),
        Some("application/json;charset=UTF-8")
    );
}

#[tokio::test]
async fn response_interceptor_can_extract_data() {
    let (request, _primitive) = dispatcher("https://a.com");
    let request: Dispatcher<Value> =
        request.with_response_interceptor(|response: Response| async move { Ok(response.data) });

    let data = request.get("/users", None, None).await.unwrap();
    assert_eq!(data, json!({ "echo": "https://a.com/users", "user": { "id": 1 } }));
}

#[tokio::test]
async fn response_interceptor_output_is_returned() {
    let (request, _primitive) = dispatcher("https://a.com");
    request
        .set_response_interceptor(|mut response| async move {
            response.status_code = 299;
            response.extra.insert("intercepted".into(), json!(true));
            Ok(response)
        })
        .await;

    let resp = request.get("/x", None, None).await.unwrap();
    assert_eq!(resp.status_code, 299);
    assert_eq!(resp.extra.get("intercepted"), Some(&json!(true)));
}

#[tokio::test]
async fn missing_platform_header_defaults_to_empty_map() {
    let primitive = Arc::new(Recording {
        omit_header: true,
        ..Default::default()
    });
    let request = Dispatcher::with_primitive("https://a.com", primitive);

    let resp = request.get("/x", None, None).await.unwrap();
    assert!(resp.header.is_empty());
}

#[tokio::test]
async fn primitive_failure_is_returned_unchanged() {
    let primitive = Arc::new(Recording {
        fail_with: Some("request:fail timeout".to_string()),
        ..Default::default()
    });
    let request = Dispatcher::with_primitive("https://a.com", Arc::clone(&primitive));
    let response_calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&response_calls);
    request
        .set_response_interceptor(move |response| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok(response) }
        })
        .await;

    let err = request.get("/x", None, None).await.unwrap_err();

    match err {
        RequestError::Platform { err_msg, errno } => {
            assert_eq!(err_msg, "request:fail timeout");
            assert_eq!(errno, Some(-101));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(primitive.calls().len(), 1);
    assert_eq!(response_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn request_interceptor_failure_skips_the_network() {
    let (request, primitive) = dispatcher("https://a.com");
    request
        .set_request_interceptor(|_config| async move {
            Err(RequestError::interceptor("not logged in"))
        })
        .await;

    let err = request.get("/x", None, None).await.unwrap_err();

    assert!(matches!(err, RequestError::Interceptor(ref msg) if msg == "not logged in"));
    assert!(primitive.calls().is_empty());
}

#[tokio::test]
async fn response_interceptor_failure_discards_the_response() {
    let (request, primitive) = dispatcher("https://a.com");
    request
        .set_response_interceptor(|response| async move {
            Err(RequestError::interceptor(format!("status {}", response.status_code)))
        })
        .await;

    let err = request.get("/x", None, None).await.unwrap_err();

    assert!(matches!(err, RequestError::Interceptor(ref msg) if msg == "status 200"));
    assert_eq!(primitive.calls().len(), 1);
}

#[tokio::test]
async fn setters_overwrite_instead_of_chaining() {
    let (request, primitive) = dispatcher("https://a.com");
    request
        .set_request_interceptor(|config| async move { Ok(config.header("First", "1")) })
        .await;
    request
        .set_request_interceptor(|config| async move { Ok(config.header("Second", "2")) })
        .await;

    request.get("/x", None, None).await.unwrap();

    let header = &primitive.calls()[0].header;
    assert!(!header.contains_key("First"));
    assert_eq!(header.get("Second").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn empty_url_is_passed_through() {
    let (request, primitive) = dispatcher("https://a.com");
    request.dispatch(RequestConfig::default()).await.unwrap();

    let (bare, bare_primitive) = dispatcher("");
    bare.dispatch(RequestConfig::default()).await.unwrap();

    assert_eq!(primitive.calls()[0].url, "https://a.com/");
    assert_eq!(bare_primitive.calls()[0].url, "");
}

#[tokio::test]
async fn clones_share_interceptor_slots() {
    let (request, primitive) = dispatcher("https://a.com");
    let clone = request.clone();
    clone
        .set_request_interceptor(|config| async move { Ok(config.header("Via", "clone")) })
        .await;

    request.get("/x", None, None).await.unwrap();

    assert_eq!(request.base_url(), "https://a.com");
    assert_eq!(
        primitive.calls()[0].header.get("Via").map(String::as_str),
        Some("clone")
    );
}

#[tokio::test]
async fn response_interceptor_is_read_when_the_response_arrives() {
    let gate = Arc::new(Notify::new());
    let primitive = Arc::new(Recording {
        gate: Some(Arc::clone(&gate)),
        ..Default::default()
    });
    let request = Dispatcher::with_primitive("https://a.com", Arc::clone(&primitive));
    request
        .set_response_interceptor(|mut response| async move {
            response.extra.insert("by".into(), json!("old"));
            Ok(response)
        })
        .await;

    let in_flight = {
        let request = request.clone();
        tokio::spawn(async move { request.get("/slow", None, None).await })
    };

    // Wait until the call is parked inside the primitive.
    while primitive.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    request
        .set_response_interceptor(|mut response| async move {
            response.extra.insert("by".into(), json!("new"));
            Ok(response)
        })
        .await;
    gate.notify_one();

    let resp = in_flight.await.unwrap().unwrap();
    assert_eq!(resp.extra.get("by"), Some(&json!("new")));
}

#[tokio::test]
async fn calls_past_the_response_step_keep_their_result() {
    let (request, _primitive) = dispatcher("https://a.com");
    request
        .set_response_interceptor(|mut response| async move {
            response.extra.insert("by".into(), json!("old"));
            Ok(response)
        })
        .await;

    let done = request.get("/fast", None, None).await.unwrap();

    request
        .set_response_interceptor(|mut response| async move {
            response.extra.insert("by".into(), json!("new"));
            Ok(response)
        })
        .await;
    let later = request.get("/fast", None, None).await.unwrap();

    assert_eq!(done.extra.get("by"), Some(&json!("old")));
    assert_eq!(later.extra.get("by"), Some(&json!("new")));
}

#[tokio::test]
async fn request_interceptor_is_read_at_call_time_not_construction() {
    let gate = Arc::new(Notify::new());
    let primitive = Arc::new(Recording::default());
    let request = Dispatcher::with_primitive("https://a.com", Arc::clone(&primitive));

    // First call blocks inside its own request interceptor.
    let blocker = Arc::clone(&gate);
    request
        .set_request_interceptor(move |config| {
            let blocker = Arc::clone(&blocker);
            async move {
                blocker.notified().await;
                Ok(config.header("By", "old"))
            }
        })
        .await;

    let first = {
        let request = request.clone();
        tokio::spawn(async move { request.get("/first", None, None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    request
        .set_request_interceptor(|config| async move { Ok(config.header("By", "new")) })
        .await;
    request.get("/second", None, None).await.unwrap();
    gate.notify_one();
    first.await.unwrap().unwrap();

    let calls = primitive.calls();
    let by_url: HashMap<_, _> = calls
        .iter()
        .map(|c| (c.url.as_str(), c.header.get("By").cloned()))
        .collect();
    assert_eq!(by_url["https://a.com/second"].as_deref(), Some("new"));
    assert_eq!(by_url["https://a.com/first"].as_deref(), Some("old"));
}

#[tokio::test]
async fn concurrent_calls_do_not_share_state() {
    let (request, primitive) = dispatcher("https://a.com");
    let request = Arc::new(request);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let request = Arc::clone(&request);
            tokio::spawn(async move { request.get(&format!("/items/{i}"), None, None).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let resp = handle.await.unwrap().unwrap();
        assert_eq!(resp.data["echo"], json!(format!("https://a.com/items/{i}")));
    }
    assert_eq!(primitive.calls().len(), 8);
}
