/// Join a base URL and a request path without doubling the separator.
///
/// Absolute `http://` / `https://` URLs bypass the base entirely so a single
/// call can target another host.
pub fn join(base: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }

    let base = base.trim_end_matches('/');
    let url = url.trim_start_matches('/');

    if base.is_empty() {
        return url.to_string();
    }

    format!("{base}/{url}")
}
