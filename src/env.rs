//! Capturing ambient gateway state.
//!
//! A CGI-style host parks the request in process state: environment
//! variables for the request line and headers, stdin for the body, and an
//! upload descriptor for files already parked on disk. [`Env`] gathers all
//! of it into one [`ServerRequest`]. Every source can be overridden before
//! [`capture`](Env::capture), which is what tests and non-CGI embeddings use
//! instead of touching the real process state.
//!
//! ```rust,no_run
//! use genkan::Env;
//!
//! let request = Env::new().capture().unwrap();
//! println!("{} {}", request.method(), request.uri());
//! ```

use std::collections::BTreeMap;
use std::io::{self, Read};

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::files::{self, RawUpload};
use crate::gateway::{self, Params};
use crate::request::ServerRequest;

/// One-shot capture of the gateway's ambient request state.
pub struct Env {
    server_params: Option<Params>,
    query_params: Option<Params>,
    cookie_params: Option<Params>,
    uploaded_files: Option<BTreeMap<String, RawUpload>>,
    parsed_body: Option<Value>,
    input: Option<Box<dyn Read>>,
}

impl Env {
    /// A capture that will read every source from the process.
    pub fn new() -> Self {
        Self {
            server_params: None,
            query_params: None,
            cookie_params: None,
            uploaded_files: None,
            parsed_body: None,
            input: None,
        }
    }

    /// Uses `params` instead of the process environment.
    pub fn server_params(mut self, params: Params) -> Self {
        self.server_params = Some(params);
        self
    }

    /// Uses `params` instead of parsing `QUERY_STRING`.
    pub fn query_params(mut self, params: Params) -> Self {
        self.query_params = Some(params);
        self
    }

    /// Uses `params` instead of parsing `HTTP_COOKIE`.
    pub fn cookie_params(mut self, params: Params) -> Self {
        self.cookie_params = Some(params);
        self
    }

    /// Supplies the gateway's upload descriptor. Without one the request
    /// carries no uploaded files.
    pub fn uploaded_files(mut self, descriptor: BTreeMap<String, RawUpload>) -> Self {
        self.uploaded_files = Some(descriptor);
        self
    }

    /// Supplies an already-parsed body. Validated like
    /// [`ServerRequest::with_parsed_body`].
    pub fn parsed_body(mut self, body: Value) -> Self {
        self.parsed_body = Some(body);
        self
    }

    /// Reads the body from `reader` instead of stdin.
    pub fn input(mut self, reader: impl Read + 'static) -> Self {
        self.input = Some(Box::new(reader));
        self
    }

    /// Captures everything into an immutable [`ServerRequest`].
    ///
    /// The body read is bounded by `CONTENT_LENGTH` when the environment
    /// carries a parseable one, so a host that keeps stdin open past the
    /// body cannot stall the capture.
    pub fn capture(self) -> Result<ServerRequest, Error> {
        let server_params = self.server_params.unwrap_or_else(ambient_server_params);
        let query_params = self.query_params.unwrap_or_else(|| {
            server_params
                .get("QUERY_STRING")
                .map(|query| parse_query_string(query))
                .unwrap_or_default()
        });
        let cookie_params = self.cookie_params.unwrap_or_else(|| {
            server_params
                .get("HTTP_COOKIE")
                .map(|cookies| parse_cookie_header(cookies))
                .unwrap_or_default()
        });
        let uploaded_files = files::normalize(self.uploaded_files.unwrap_or_default())?;

        let content_length = server_params
            .get("CONTENT_LENGTH")
            .and_then(|length| length.parse().ok());
        let body = match self.input {
            Some(reader) => read_body(reader, content_length)?,
            None => read_body(io::stdin(), content_length)?,
        };

        debug!(
            bytes = body.len(),
            files = files::file_count(&uploaded_files),
            "captured gateway request"
        );

        let builder = ServerRequest::builder()
            .method(gateway::request_method(&server_params))
            .uri(gateway::request_uri(&server_params))
            .protocol_version(gateway::protocol_version(&server_params))
            .headers(gateway::request_headers(&server_params))
            .body(body)
            .server_params(server_params)
            .query_params(query_params)
            .cookie_params(cookie_params)
            .uploaded_files(uploaded_files);
        match self.parsed_body {
            Some(body) => builder.parsed_body(body).build(),
            None => builder.build(),
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a raw query string into parameters.
///
/// Pairs are separated by `&`, keys from values by the first `=`; a pair
/// without `=` maps to the empty value. Keys and values are percent-decoded
/// with `+` as space; fragments that do not decode cleanly are kept verbatim.
/// Duplicate keys keep the later value.
pub fn parse_query_string(query: &str) -> Params {
    let mut params = Params::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(decode_component(key), decode_component(value));
    }
    params
}

/// Splits a `Cookie` header into parameters.
///
/// Pairs are separated by `;` with surrounding whitespace trimmed. Names are
/// kept verbatim; values are percent-decoded.
pub fn parse_cookie_header(header: &str) -> Params {
    let mut params = Params::new();
    for pair in header.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(name.to_owned(), decode_component(value));
    }
    params
}

fn ambient_server_params() -> Params {
    std::env::vars().collect()
}

fn read_body(reader: impl Read, limit: Option<u64>) -> Result<Bytes, Error> {
    let mut buf = Vec::new();
    match limit {
        Some(limit) => {
            reader.take(limit).read_to_end(&mut buf)?;
        }
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut buf)?;
        }
    }
    Ok(Bytes::from(buf))
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
