//! Transport-neutral description of backend calls.

use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request relative to the configured API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (idx, (key, value)) in self.query.iter().enumerate() {
            let sep = if idx == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

/// Why a backend call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// No usable response: connection refused, timeout, unreadable body.
    Transport(String),
    /// The backend answered with a non-success status.
    Status { status: u16, body: Value },
}

impl Failure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Failure::Transport(_) => None,
            Failure::Status { status, .. } => Some(*status),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Transport(msg) => write!(f, "transport error: {msg}"),
            Failure::Status { status, body } => write!(f, "status {status}: {body}"),
        }
    }
}

impl std::error::Error for Failure {}

pub type CallResult = Result<Value, Failure>;

/// Executes requests against a backend.
pub trait Transport {
    fn execute(&self, request: &ApiRequest) -> CallResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_display_includes_query() {
        let request = ApiRequest::get("/books/search")
            .with_query("name", "Dune")
            .with_query("page", "2");
        assert_eq!(request.to_string(), "GET /books/search?name=Dune&page=2");
    }

    #[test]
    fn failure_reports_status() {
        let failure = Failure::Status {
            status: 409,
            body: Value::String("taken".to_string()),
        };
        assert_eq!(failure.status(), Some(409));
        assert_eq!(Failure::Transport("down".to_string()).status(), None);
    }
}
