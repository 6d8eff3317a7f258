//! Per-request handler context.

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, Extensions, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::http::handler::HandlerError;
use crate::http::request::RequestIdExt;
use crate::observability::Logger;

/// Largest request body a handler may buffer.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// What a handler receives for one request: the request itself plus the
/// shared logger. Lives only as long as the handler call.
#[derive(Debug)]
pub struct Context {
    parts: Parts,
    body: Option<Body>,
    params: Vec<(String, String)>,
    log: Logger,
}

impl Context {
    pub(crate) fn new(parts: Parts, body: Body, params: Vec<(String, String)>, log: Logger) -> Self {
        Self {
            parts,
            body: Some(body),
            params,
            log,
        }
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn request_id(&self) -> Option<&str> {
        self.parts.request_id()
    }

    /// First query string value for `key`, percent-decoded.
    pub fn query(&self, key: &str) -> Option<String> {
        let query = self.parts.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Path parameter captured by the route, e.g. `id` for `/users/{id}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Buffer the request body. The body can be taken once.
    pub async fn body_bytes(&mut self) -> Result<Bytes, HandlerError> {
        let body = self
            .body
            .take()
            .ok_or_else(|| HandlerError::bad_request("request body already consumed"))?;
        axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| HandlerError::bad_request(format!("failed to read request body: {e}")))
    }

    /// Deserialize the JSON request body.
    pub async fn bind_json<T: DeserializeOwned>(&mut self) -> Result<T, HandlerError> {
        let bytes = self.body_bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| HandlerError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// JSON response with `status`.
    pub fn json<T: Serialize>(&self, status: StatusCode, value: &T) -> Response {
        (status, Json(value)).into_response()
    }

    /// Plain text response with `status`.
    pub fn text(&self, status: StatusCode, body: impl Into<String>) -> Response {
        (status, body.into()).into_response()
    }

    pub fn no_content(&self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn context(uri: &str, body: &str) -> Context {
        let (parts, body) = Request::builder()
            .method("POST")
            .uri(uri)
            .header("x-request-id", "req-1")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
            .into_parts();
        Context::new(parts, body, vec![("id".into(), "42".into())], Logger::default())
    }

    #[test]
    fn test_request_accessors() {
        let ctx = context("/users/42?name=J%C3%BCrgen&tag=a&tag=b", "");
        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/users/42");
        assert_eq!(ctx.param("id"), Some("42"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.query("name").as_deref(), Some("Jürgen"));
        assert_eq!(ctx.query("tag").as_deref(), Some("a"));
        assert_eq!(ctx.header("content-type"), Some("application/json"));
        assert_eq!(ctx.request_id(), Some("req-1"));
    }

    #[derive(Debug, serde::Deserialize)]
    struct Payload {
        name: String,
    }

    #[tokio::test]
    async fn test_bind_json_consumes_body_once() {
        let mut ctx = context("/users", r#"{"name":"ada"}"#);

        let payload: Payload = ctx.bind_json().await.unwrap();
        assert_eq!(payload.name, "ada");

        let err = ctx.body_bytes().await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bind_json_rejects_invalid_body() {
        let mut ctx = context("/users", "{not json");
        let err = ctx.bind_json::<Payload>().await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_builders() {
        let ctx = context("/", "");
        assert_eq!(ctx.json(StatusCode::CREATED, &"ok").status(), StatusCode::CREATED);
        assert_eq!(ctx.text(StatusCode::OK, "pong").status(), StatusCode::OK);
        assert_eq!(ctx.no_content().status(), StatusCode::NO_CONTENT);
    }
}
