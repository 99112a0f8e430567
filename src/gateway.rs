//! Pure derivations over gateway environment parameters.
//!
//! CGI-style hosts flatten the request line, headers, and connection facts
//! into a string-to-string environment. The functions here lift that
//! environment into typed `http` values. They are total: missing or
//! malformed entries degrade to documented defaults, never to errors.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use tracing::{debug, warn};

/// Environment parameters: a deterministic string-to-string mapping.
pub type Params = BTreeMap<String, String>;

/// The HTTP method, from `REQUEST_METHOD`.
///
/// Any token the `http` crate accepts passes through, including extension
/// methods. A missing or empty entry falls back to `GET`.
pub fn request_method(params: &Params) -> Method {
    params
        .get("REQUEST_METHOD")
        .and_then(|method| method.parse().ok())
        .unwrap_or(Method::GET)
}

/// The protocol version, from `SERVER_PROTOCOL`.
///
/// Accepts `HTTP/<major>` and `HTTP/<major>.<minor>` with numeric parts and
/// returns the version text without the `HTTP/` prefix, preserving the
/// presence or absence of the minor digit (`HTTP/2` stays `"2"`). Anything
/// else falls back to `"1.1"`.
pub fn protocol_version(params: &Params) -> String {
    params
        .get("SERVER_PROTOCOL")
        .and_then(|protocol| parse_protocol(protocol))
        .unwrap_or_else(|| String::from("1.1"))
}

/// Request headers, from the `HTTP_*` environment entries.
///
/// `HTTP_` is stripped, underscores become dashes, and the `http` crate
/// canonicalizes the rest. `CONTENT_LENGTH` and `CONTENT_TYPE` arrive without
/// the prefix under the gateway convention, so they are folded in unless a
/// prefixed variant already claims them. Entries that do not survive header
/// validation are skipped; two entries normalizing to the same name keep the
/// later one.
pub fn request_headers(params: &Params) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (bare, prefixed) in [
        ("CONTENT_LENGTH", "HTTP_CONTENT_LENGTH"),
        ("CONTENT_TYPE", "HTTP_CONTENT_TYPE"),
    ] {
        if !params.contains_key(prefixed) {
            if let Some(value) = params.get(bare) {
                insert_header(&mut headers, prefixed, value);
            }
        }
    }
    for (key, value) in params {
        if key.starts_with("HTTP_") {
            insert_header(&mut headers, key, value);
        }
    }
    headers
}

/// The request URI, assembled from the environment.
///
/// Scheme: `https` when `HTTPS` is present and not `"off"`, else `http`.
/// Authority: `HTTP_HOST`; else `SERVER_NAME` with `SERVER_PORT` appended
/// when present; else `localhost`. Target: `REQUEST_URI`; else `PHP_SELF`
/// with `?QUERY_STRING` appended when present; else `/`. An assembly the
/// `http` crate cannot parse degrades to `http://localhost/`.
pub fn request_uri(params: &Params) -> Uri {
    let scheme = match params.get("HTTPS") {
        Some(https) if https != "off" => "https",
        _ => "http",
    };
    let authority = match (params.get("HTTP_HOST"), params.get("SERVER_NAME")) {
        (Some(host), _) => host.clone(),
        (None, Some(name)) => match params.get("SERVER_PORT") {
            Some(port) => format!("{name}:{port}"),
            None => name.clone(),
        },
        (None, None) => String::from("localhost"),
    };
    let target = match (params.get("REQUEST_URI"), params.get("PHP_SELF")) {
        (Some(uri), _) => uri.clone(),
        (None, Some(path)) => match params.get("QUERY_STRING") {
            Some(query) => format!("{path}?{query}"),
            None => path.clone(),
        },
        (None, None) => String::from("/"),
    };

    let assembled = format!("{scheme}://{authority}{target}");
    match assembled.parse() {
        Ok(uri) => uri,
        Err(_) => {
            debug!(uri = %assembled, "environment assembled an unparseable URI, using the default");
            Uri::from_static("http://localhost/")
        }
    }
}

fn parse_protocol(raw: &str) -> Option<String> {
    let version = raw.strip_prefix("HTTP/")?;
    let mut parts = version.splitn(2, '.');
    let major = parts.next()?;
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match parts.next() {
        None => Some(major.to_owned()),
        Some(minor) if !minor.is_empty() && minor.bytes().all(|b| b.is_ascii_digit()) => {
            Some(format!("{major}.{minor}"))
        }
        Some(_) => None,
    }
}

fn insert_header(headers: &mut HeaderMap, key: &str, value: &str) {
    let name = key["HTTP_".len()..].replace('_', "-");
    let Ok(name) = name.parse::<HeaderName>() else {
        debug!(key, "environment entry is not a valid header name, skipping");
        return;
    };
    let Ok(value) = HeaderValue::from_str(value) else {
        debug!(key, "environment entry is not a valid header value, skipping");
        return;
    };
    if headers.insert(&name, value).is_some() {
        warn!(header = %name, "environment entries collide after normalization, keeping the later one");
    }
}
