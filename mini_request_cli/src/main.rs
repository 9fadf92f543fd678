//! Command-line front end for `mini_request`: CLI parsing, env-file loading,
//! JSON config loading, header/token injection through a request
//! interceptor, and one request whose result is printed as JSON.

use std::{collections::HashMap, env, fs, process};

use mini_request::{
    get_request_headers, handle_expire_token, show_error_msg, Dispatcher, HttpMethod,
    PrimitiveOptions, RequestConfig, RequestError, RequestHeadersConfig, ReqwestPrimitive,
    Response, TracingNotifier,
};
use serde::Deserialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const ENV_BASE_URL: &str = "MINI_REQUEST_BASE_URL";
const ENV_TOKEN: &str = "MINI_REQUEST_TOKEN";
const ENV_PROXY: &str = "MINI_REQUEST_PROXY";

/// Optional JSON config file.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default)]
struct CliConfig {
    base_url: Option<String>,
    token: Option<String>,
    timeout: Option<u64>,
    headers: HashMap<String, String>,
    primitive: PrimitiveOptions,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct CliArgs {
    env_file: Option<String>,
    config_file: Option<String>,
    base_url: Option<String>,
    token: Option<String>,
    proxy: Option<String>,
    headers: Vec<(String, String)>,
    timeout: Option<u64>,
    content_type: Option<String>,
    data_only: bool,
    verbose: bool,
    method: HttpMethod,
    url: String,
    data: Option<Value>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Version,
    Run(Box<CliArgs>),
}

/// Everything needed to build the dispatcher, after CLI > env > config
/// file > defaults precedence has been applied.
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    base_url: String,
    token: Option<String>,
    timeout: Option<u64>,
    headers: HashMap<String, String>,
    primitive: PrimitiveOptions,
}

fn print_help() {
    println!(
        "mini_request_cli {}

USAGE:
    mini_request_cli [OPTIONS] <METHOD> <URL> [DATA]

ARGS:
    <METHOD>    GET, POST, OPTIONS, HEAD, PUT, DELETE, TRACE or CONNECT
    <URL>       Path joined onto the base URL, or an absolute http(s) URL
    [DATA]      JSON payload (anything that is not JSON is sent as text)

OPTIONS:
    -b, --base-url <URL>       Base URL (env: {ENV_BASE_URL})
    -t, --token <TOKEN>        Authorization token (env: {ENV_TOKEN})
    -x, --proxy <URL>          HTTP proxy (env: {ENV_PROXY})
    -e, --env-file <FILE>      Load environment variables from FILE
    -c, --config <FILE>        Load JSON config from FILE
    -H, --header <NAME: VALUE> Extra request header (repeatable)
        --timeout <MS>         Request timeout in milliseconds
        --content-type <TYPE>  Content-Type header value
        --data-only            Print only the response data
    -v, --verbose              Debug logging
        --help                 Show this help
        --version              Show version",
        env!("CARGO_PKG_VERSION")
    );
}

fn take_value(args: &[String], i: &mut usize, flag: &str, what: &str) -> Result<String, String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{flag} requires {what}."))
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    if args.iter().any(|a| a == "--help") {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| a == "--version") {
        return Ok(Command::Version);
    }

    let mut parsed = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--base-url" | "-b" => parsed.base_url = Some(take_value(args, &mut i, arg, "a URL")?),
            "--token" | "-t" => parsed.token = Some(take_value(args, &mut i, arg, "a token string")?),
            "--proxy" | "-x" => parsed.proxy = Some(take_value(args, &mut i, arg, "a proxy URL")?),
            "--env-file" | "-e" => {
                parsed.env_file = Some(take_value(args, &mut i, arg, "a file name")?)
            }
            "--config" | "-c" => {
                parsed.config_file = Some(take_value(args, &mut i, arg, "a file name")?)
            }
            "--header" | "-H" => {
                let raw = take_value(args, &mut i, arg, "a `Name: value` pair")?;
                let (name, value) = raw
                    .split_once(':')
                    .ok_or_else(|| format!("Malformed header '{raw}', expected `Name: value`."))?;
                parsed
                    .headers
                    .push((name.trim().to_string(), value.trim().to_string()));
            }
            "--timeout" => {
                let raw = take_value(args, &mut i, arg, "milliseconds")?;
                let ms = raw
                    .parse::<u64>()
                    .map_err(|_| format!("Invalid timeout '{raw}'."))?;
                parsed.timeout = Some(ms);
            }
            "--content-type" => {
                parsed.content_type = Some(take_value(args, &mut i, arg, "a content type")?)
            }
            "--data-only" => parsed.data_only = true,
            "--verbose" | "-v" => parsed.verbose = true,
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("Unknown option '{flag}'."));
            }
            val => positional.push(val.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let method = positional
        .next()
        .ok_or("Missing <METHOD>.")?
        .parse::<HttpMethod>()
        .map_err(|e| e.to_string())?;
    parsed.method = method;
    parsed.url = positional.next().ok_or("Missing <URL>.")?;
    parsed.data = positional
        .next()
        .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)));

    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument '{extra}'."));
    }

    Ok(Command::Run(Box::new(parsed)))
}

fn load_config(path: Option<&str>) -> Result<CliConfig, String> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file '{path}': {e}"))?;
    serde_json::from_str(&raw).map_err(|e| format!("Invalid config file '{path}': {e}"))
}

/// Apply CLI > env > config file > defaults.
fn resolve(args: &CliArgs, config: CliConfig, env_lookup: impl Fn(&str) -> Option<String>) -> Resolved {
    let mut headers = config.headers;
    headers.extend(args.headers.iter().cloned());

    let proxy = args
        .proxy
        .clone()
        .or_else(|| env_lookup(ENV_PROXY))
        .or(config.primitive.proxy);

    Resolved {
        base_url: args
            .base_url
            .clone()
            .or_else(|| env_lookup(ENV_BASE_URL))
            .or(config.base_url)
            .unwrap_or_default(),
        token: args
            .token
            .clone()
            .or_else(|| env_lookup(ENV_TOKEN))
            .or(config.token),
        timeout: args.timeout.or(config.timeout),
        headers,
        primitive: PrimitiveOptions {
            proxy,
            user_agent: config.primitive.user_agent,
            pool_max_idle_per_host: config.primitive.pool_max_idle_per_host,
            pool_idle_timeout_secs: config.primitive.pool_idle_timeout_secs,
        },
    }
}

fn build_dispatcher(
    resolved: &Resolved,
    content_type: Option<String>,
    data_only: bool,
) -> Result<Dispatcher<Value>, RequestError> {
    let primitive = ReqwestPrimitive::new(&resolved.primitive)?;

    let token = resolved.token.clone();
    let static_headers = resolved.headers.clone();

    let dispatcher = Dispatcher::with_primitive(resolved.base_url.clone(), primitive)
        .with_request_interceptor(move |mut config: RequestConfig| {
            let token = token.clone();
            let static_headers = static_headers.clone();
            let headers_config = RequestHeadersConfig {
                content_type: content_type.clone(),
            };
            async move {
                let get_token = move || token.clone();
                let mut header = get_request_headers(Some(&headers_config), Some(&get_token), None);
                header.extend(static_headers);
                header.extend(config.header.take().unwrap_or_default());
                config.header = Some(header);
                Ok(config)
            }
        })
        .with_response_interceptor(move |response: Response| async move {
            tracing::info!(status = response.status_code, "response received");
            if response.status_code == 401 {
                let on_expired = || tracing::warn!("token rejected by server, refresh it and retry");
                handle_expire_token(Some(&on_expired));
            }
            let value = if data_only {
                response.data
            } else {
                serde_json::to_value(&response)?
            };
            Ok::<Value, RequestError>(value)
        });

    Ok(dispatcher)
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let args = env::args().skip(1).collect::<Vec<String>>();

    let args = match parse_args(&args) {
        Ok(Command::Help) => {
            print_help();
            process::exit(0);
        }
        Ok(Command::Version) => {
            println!("mini_request_cli {}", env!("CARGO_PKG_VERSION"));
            process::exit(0);
        }
        Ok(Command::Run(args)) => args,
        Err(msg) => {
            eprintln!("[ERROR] {msg} See --help.");
            process::exit(1);
        }
    };

    init_tracing(args.verbose);

    // If we have an env file, load it; otherwise pick up `.env` when present.
    match &args.env_file {
        Some(env_path) => {
            tracing::debug!("loading environment from file: {env_path}");
            if let Err(e) = dotenvy::from_filename(env_path) {
                tracing::error!("failed to load env file '{env_path}': {e}");
                process::exit(1);
            }
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let config = match load_config(args.config_file.as_deref()) {
        Ok(config) => config,
        Err(msg) => {
            tracing::error!("{msg}");
            process::exit(1);
        }
    };

    let resolved = resolve(&args, config, |key| env::var(key).ok());
    tracing::debug!(base_url = %resolved.base_url, has_token = resolved.token.is_some(), "configuration resolved");

    let dispatcher = match build_dispatcher(&resolved, args.content_type.clone(), args.data_only) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            show_error_msg(&TracingNotifier, &e.to_string());
            process::exit(1);
        }
    };

    let mut request = RequestConfig::new(args.url.clone()).method(args.method);
    request.data = args.data.clone();
    request.timeout = resolved.timeout;

    match dispatcher.dispatch(request).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                show_error_msg(&TracingNotifier, &e.to_string());
                process::exit(1);
            }
        },
        Err(e) => {
            show_error_msg(&TracingNotifier, &e.to_string());
            process::exit(1);
        }
    }
}
