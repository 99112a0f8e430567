//! Immutable server-request value.
//!
//! [`ServerRequest`] carries everything the gateway knew about one request:
//! the HTTP message (method, URI, protocol, headers, body) plus the server
//! state around it (environment parameters, query, cookies, uploaded files,
//! parsed body, attributes). The value never mutates; every `with_*` method
//! returns a new request and leaves the receiver as it was.
//!
//! Cheap copies are deliberate: headers, body bytes, and upload stream slots
//! are reference-shared between the old and new value, so a `with_attribute`
//! in a middleware chain costs a handful of pointer bumps, not a body copy.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use serde_json::Value;

use crate::error::Error;
use crate::files::UploadFiles;
use crate::gateway::{self, Params};

/// An immutable, copy-on-write server request.
///
/// ```rust
/// use genkan::ServerRequest;
///
/// let base = ServerRequest::default();
/// let post = base.with_method("POST").unwrap();
///
/// assert_eq!(base.method().as_str(), "GET");
/// assert_eq!(post.method().as_str(), "POST");
/// ```
#[derive(Clone, Debug)]
pub struct ServerRequest {
    method: Method,
    uri: Uri,
    protocol: String,
    headers: HeaderMap,
    target: Option<String>,
    body: Bytes,
    server_params: Params,
    query_params: Params,
    cookie_params: Params,
    uploaded_files: UploadFiles,
    parsed_body: Option<Value>,
    attributes: BTreeMap<String, Value>,
}

impl Default for ServerRequest {
    /// `GET /` over HTTP/1.1 with every collection empty.
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            protocol: String::from("1.1"),
            headers: HeaderMap::new(),
            target: None,
            body: Bytes::new(),
            server_params: Params::new(),
            query_params: Params::new(),
            cookie_params: Params::new(),
            uploaded_files: UploadFiles::new(),
            parsed_body: None,
            attributes: BTreeMap::new(),
        }
    }
}

impl ServerRequest {
    /// A request with the given method, URI, and environment parameters.
    ///
    /// The protocol version and headers are derived from the parameters the
    /// way [`Env::capture`](crate::Env::capture) would derive them; the other
    /// collections start empty.
    pub fn new<M, U>(method: M, uri: U, server_params: Params) -> Result<Self, Error>
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        let method = Method::try_from(method).map_err(|error| Error::Http(error.into()))?;
        let uri = Uri::try_from(uri).map_err(|error| Error::Http(error.into()))?;
        Ok(Self {
            method,
            uri,
            protocol: gateway::protocol_version(&server_params),
            headers: gateway::request_headers(&server_params),
            server_params,
            ..Self::default()
        })
    }

    /// An incremental builder starting from [`ServerRequest::default`].
    pub fn builder() -> ServerRequestBuilder {
        ServerRequestBuilder::new()
    }

    // ── Message ─────────────────────────────────────────────────────────────

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn protocol_version(&self) -> &str { &self.protocol }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The value of header `name`, if present and visible as UTF-8.
    pub fn header(&self, name: impl AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The request target: an explicit override if one was set, otherwise
    /// the URI in origin-form, otherwise `/`.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.target {
            return target.clone();
        }
        match self.uri.path_and_query() {
            Some(origin) if !origin.as_str().is_empty() => origin.as_str().to_owned(),
            _ => String::from("/"),
        }
    }

    // ── Gateway state ───────────────────────────────────────────────────────

    pub fn server_params(&self) -> &Params { &self.server_params }
    pub fn query_params(&self) -> &Params { &self.query_params }
    pub fn cookie_params(&self) -> &Params { &self.cookie_params }
    pub fn uploaded_files(&self) -> &UploadFiles { &self.uploaded_files }
    pub fn parsed_body(&self) -> Option<&Value> { self.parsed_body.as_ref() }
    pub fn attributes(&self) -> &BTreeMap<String, Value> { &self.attributes }

    /// The attribute stored under `name`. Presence governs, not truthiness:
    /// an attribute set to `Value::Null` is still `Some`.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    // ── Copy-on-write ───────────────────────────────────────────────────────
    // Every method returns a new request; the receiver is untouched.

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_method<M>(&self, method: M) -> Result<Self, Error>
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        let method = Method::try_from(method).map_err(|error| Error::Http(error.into()))?;
        let mut request = self.clone();
        request.method = method;
        Ok(request)
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_uri(&self, uri: Uri) -> Self {
        let mut request = self.clone();
        request.uri = uri;
        request
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_protocol_version(&self, version: impl Into<String>) -> Self {
        let mut request = self.clone();
        request.protocol = version.into();
        request
    }

    /// Replaces any existing values for the header.
    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_header<K, V>(&self, name: K, value: V) -> Result<Self, Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = HeaderName::try_from(name).map_err(|error| Error::Http(error.into()))?;
        let value = HeaderValue::try_from(value).map_err(|error| Error::Http(error.into()))?;
        let mut request = self.clone();
        request.headers.insert(name, value);
        Ok(request)
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_request_target(&self, target: impl Into<String>) -> Self {
        let mut request = self.clone();
        request.target = Some(target.into());
        request
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        let mut request = self.clone();
        request.body = body.into();
        request
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_query_params(&self, params: Params) -> Self {
        let mut request = self.clone();
        request.query_params = params;
        request
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_cookie_params(&self, params: Params) -> Self {
        let mut request = self.clone();
        request.cookie_params = params;
        request
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_uploaded_files(&self, files: UploadFiles) -> Self {
        let mut request = self.clone();
        request.uploaded_files = files;
        request
    }

    /// Replaces the parsed body. Only a JSON object, an array, or `None`
    /// is accepted; anything else fails with [`Error::ParsedBody`].
    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_parsed_body(&self, body: impl Into<Option<Value>>) -> Result<Self, Error> {
        let body = body.into();
        validate_parsed_body(body.as_ref())?;
        let mut request = self.clone();
        request.parsed_body = body;
        Ok(request)
    }

    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn with_attribute(&self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut request = self.clone();
        request.attributes.insert(name.into(), value.into());
        request
    }

    /// Removes the attribute if present; a no-op copy otherwise.
    #[must_use = "the receiver is unchanged; use the returned request"]
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut request = self.clone();
        request.attributes.remove(name);
        request
    }
}

/// Incremental constructor for [`ServerRequest`].
///
/// Setters stash the first error and turn the rest of the chain into a
/// no-op; [`build`](Self::build) surfaces it.
pub struct ServerRequestBuilder {
    inner: Result<ServerRequest, Error>,
}

impl ServerRequestBuilder {
    fn new() -> Self {
        Self { inner: Ok(ServerRequest::default()) }
    }

    pub fn method<M>(self, method: M) -> Self
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        self.map(|mut request| {
            request.method = Method::try_from(method).map_err(|error| Error::Http(error.into()))?;
            Ok(request)
        })
    }

    pub fn uri<U>(self, uri: U) -> Self
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.map(|mut request| {
            request.uri = Uri::try_from(uri).map_err(|error| Error::Http(error.into()))?;
            Ok(request)
        })
    }

    pub fn protocol_version(self, version: impl Into<String>) -> Self {
        self.map(|mut request| {
            request.protocol = version.into();
            Ok(request)
        })
    }

    /// Appends one header, keeping any values already set for the name.
    pub fn header<K, V>(self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|mut request| {
            let name = HeaderName::try_from(name).map_err(|error| Error::Http(error.into()))?;
            let value = HeaderValue::try_from(value).map_err(|error| Error::Http(error.into()))?;
            request.headers.append(name, value);
            Ok(request)
        })
    }

    /// Replaces the header map wholesale.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|mut request| {
            request.headers = headers;
            Ok(request)
        })
    }

    pub fn request_target(self, target: impl Into<String>) -> Self {
        self.map(|mut request| {
            request.target = Some(target.into());
            Ok(request)
        })
    }

    pub fn body(self, body: impl Into<Bytes>) -> Self {
        self.map(|mut request| {
            request.body = body.into();
            Ok(request)
        })
    }

    pub fn server_params(self, params: Params) -> Self {
        self.map(|mut request| {
            request.server_params = params;
            Ok(request)
        })
    }

    pub fn query_params(self, params: Params) -> Self {
        self.map(|mut request| {
            request.query_params = params;
            Ok(request)
        })
    }

    pub fn cookie_params(self, params: Params) -> Self {
        self.map(|mut request| {
            request.cookie_params = params;
            Ok(request)
        })
    }

    pub fn uploaded_files(self, files: UploadFiles) -> Self {
        self.map(|mut request| {
            request.uploaded_files = files;
            Ok(request)
        })
    }

    /// Validated at [`build`](Self::build) time.
    pub fn parsed_body(self, body: Value) -> Self {
        self.map(|mut request| {
            request.parsed_body = Some(body);
            Ok(request)
        })
    }

    pub fn attribute(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.map(|mut request| {
            request.attributes.insert(name.into(), value.into());
            Ok(request)
        })
    }

    pub fn build(self) -> Result<ServerRequest, Error> {
        let request = self.inner?;
        validate_parsed_body(request.parsed_body.as_ref())?;
        Ok(request)
    }

    fn map(self, op: impl FnOnce(ServerRequest) -> Result<ServerRequest, Error>) -> Self {
        Self { inner: self.inner.and_then(op) }
    }
}

fn validate_parsed_body(body: Option<&Value>) -> Result<(), Error> {
    match body {
        None | Some(Value::Object(_)) | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(Error::ParsedBody),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn default_is_a_bare_get() {
        let request = ServerRequest::default();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().to_string(), "/");
        assert_eq!(request.protocol_version(), "1.1");
        assert_eq!(request.request_target(), "/");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
        assert!(request.parsed_body().is_none());
    }

    #[test]
    fn new_derives_protocol_and_headers_from_the_environment() {
        let params = Params::from([
            ("SERVER_PROTOCOL".to_owned(), "HTTP/1.0".to_owned()),
            ("HTTP_X_REQUEST_ID".to_owned(), "abc123".to_owned()),
        ]);
        let request = ServerRequest::new("POST", "https://example.com/new", params).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.protocol_version(), "1.0");
        assert_eq!(request.header("x-request-id"), Some("abc123"));
        assert!(request.server_params().contains_key("SERVER_PROTOCOL"));
        assert!(request.query_params().is_empty());
    }

    #[test]
    fn new_rejects_a_malformed_method() {
        let result = ServerRequest::new("with space", "/", Params::new());
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[test]
    fn withers_leave_the_receiver_untouched() {
        let base = ServerRequest::default();
        let query = Params::from([("page".to_owned(), "2".to_owned())]);
        let changed = base
            .with_method("PUT")
            .unwrap()
            .with_header("x-flavor", "umami")
            .unwrap()
            .with_body("payload")
            .with_query_params(query.clone())
            .with_attribute("route", "/items/:id");

        assert_eq!(base.method(), Method::GET);
        assert!(base.headers().is_empty());
        assert!(base.body().is_empty());
        assert!(base.query_params().is_empty());
        assert!(base.attributes().is_empty());

        assert_eq!(changed.method(), Method::PUT);
        assert_eq!(changed.header("x-flavor"), Some("umami"));
        assert_eq!(changed.body().as_ref(), b"payload");
        assert_eq!(changed.query_params(), &query);
        assert_eq!(changed.attribute("route"), Some(&json!("/items/:id")));
    }

    #[test]
    fn with_header_replaces_existing_values() {
        let request = ServerRequest::default()
            .with_header("accept", "text/html")
            .unwrap()
            .with_header("accept", "application/json")
            .unwrap();
        assert_eq!(request.header("accept"), Some("application/json"));
        assert_eq!(request.headers().get_all("accept").iter().count(), 1);
    }

    #[test]
    fn request_target_prefers_the_override() {
        let request = ServerRequest::default()
            .with_uri(Uri::from_static("http://example.com/real/path?x=1"));
        assert_eq!(request.request_target(), "/real/path?x=1");

        let overridden = request.with_request_target("*");
        assert_eq!(overridden.request_target(), "*");
        // The URI itself is untouched by the override.
        assert_eq!(overridden.uri().path(), "/real/path");
    }

    #[rstest]
    #[case(json!({"field": "value"}))]
    #[case(json!([1, 2, 3]))]
    fn structured_parsed_bodies_are_accepted(#[case] body: Value) {
        let request = ServerRequest::default().with_parsed_body(body.clone()).unwrap();
        assert_eq!(request.parsed_body(), Some(&body));
    }

    #[rstest]
    #[case(json!("scalar"))]
    #[case(json!(42))]
    #[case(json!(true))]
    #[case(Value::Null)]
    fn unstructured_parsed_bodies_are_rejected(#[case] body: Value) {
        let result = ServerRequest::default().with_parsed_body(body);
        assert!(matches!(result, Err(Error::ParsedBody)));
    }

    #[test]
    fn clearing_the_parsed_body_is_always_valid() {
        let request = ServerRequest::default()
            .with_parsed_body(json!({"a": 1}))
            .unwrap()
            .with_parsed_body(None)
            .unwrap();
        assert!(request.parsed_body().is_none());
    }

    #[test]
    fn attribute_presence_governs_not_truthiness() {
        let request = ServerRequest::default().with_attribute("flag", Value::Null);
        assert_eq!(request.attribute("flag"), Some(&Value::Null));
        assert_eq!(request.attribute("missing"), None);

        let removed = request.without_attribute("flag");
        assert_eq!(removed.attribute("flag"), None);
        // Removing an absent attribute is a clean no-op.
        let same = removed.without_attribute("flag");
        assert!(same.attributes().is_empty());
    }

    #[test]
    fn attribute_add_then_remove_restores_the_original_set() {
        let base = ServerRequest::default().with_attribute("keep", 1);
        let round_tripped = base.with_attribute("extra", 2).without_attribute("extra");
        assert_eq!(round_tripped.attributes(), base.attributes());
    }

    #[test]
    fn builder_assembles_the_whole_request() {
        let request = ServerRequest::builder()
            .method("POST")
            .uri("http://example.com/submit")
            .protocol_version("1.0")
            .header("content-type", "application/json")
            .body(r#"{"field":"value"}"#)
            .query_params(Params::from([("q".to_owned(), "1".to_owned())]))
            .parsed_body(json!({"field": "value"}))
            .attribute("trace", "on")
            .build()
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().to_string(), "http://example.com/submit");
        assert_eq!(request.protocol_version(), "1.0");
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.query_params()["q"], "1");
        assert_eq!(request.parsed_body(), Some(&json!({"field": "value"})));
        assert_eq!(request.attribute("trace"), Some(&json!("on")));
    }

    #[test]
    fn builder_reports_the_first_error() {
        let result = ServerRequest::builder()
            .method("not a method")
            .uri("http://example.com/")
            .build();
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[test]
    fn builder_rejects_an_unstructured_parsed_body() {
        let result = ServerRequest::builder().parsed_body(json!("text")).build();
        assert!(matches!(result, Err(Error::ParsedBody)));
    }

    #[test]
    fn builder_header_appends_instead_of_replacing() {
        let request = ServerRequest::builder()
            .header("accept", "text/html")
            .header("accept", "application/json")
            .build()
            .unwrap();
        assert_eq!(request.headers().get_all("accept").iter().count(), 2);
    }
}
