//! Transport-agnostic request types.

use std::collections::HashMap;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};

/// What the dispatcher needs to know about an incoming request.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Decoded request path, starting with `/`.
    pub path: String,
    pub query: HashMap<String, String>,
    /// Form-encoded body fields; empty unless the request is a form `POST`.
    pub form: HashMap<String, String>,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            form: HashMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_form(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(name.into(), value.into());
        self
    }
}

/// Per-request context handed to capability functions that ask for it.
///
/// Functions can read the raw request and shape the response: content type,
/// status and extra headers set here are applied to the outcome.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    pub(crate) content_type: Option<String>,
    pub(crate) status: Option<StatusCode>,
    pub(crate) headers: HeaderMap,
}

impl RequestContext {
    pub(crate) fn from_request(request: &DispatchRequest) -> Self {
        Self {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            form: request.form.clone(),
            content_type: None,
            status: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn form(&self) -> &HashMap<String, String> {
        &self.form
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Override the response status (defaults to 200).
    pub fn set_status(&mut self, status: u16) -> anyhow::Result<()> {
        self.status = Some(StatusCode::from_u16(status)?);
        Ok(())
    }

    pub fn insert_header(&mut self, name: &str, value: &str) -> anyhow::Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }
}
