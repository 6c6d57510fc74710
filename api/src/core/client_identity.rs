//! Caller identity used as the rate-limit key.

use axum::http::HeaderMap;

const REAL_IP: &str = "x-real-ip";
const FORWARDED_FOR: &str = "x-forwarded-for";

/// `x-real-ip`, else the first hop of `x-forwarded-for`, else `None`.
///
/// Blank or non-UTF-8 values count as absent.
pub fn client_identity(headers: &HeaderMap) -> Option<String> {
    header_value(headers, REAL_IP).or_else(|| {
        header_value(headers, FORWARDED_FOR)
            .and_then(|v| v.split(',').next().map(|first| first.trim().to_string()))
            .filter(|v| !v.is_empty())
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
