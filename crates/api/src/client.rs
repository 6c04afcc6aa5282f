use anyhow::Context as _;
use catalog_core::{ApiRequest, CallResult, Failure, Method, Transport};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Blocking REST client rooted at the configured API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl Transport for ApiClient {
    fn execute(&self, request: &ApiRequest) -> CallResult {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            debug!(%request, %body, "request body");
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|err| {
            warn!(%request, error = %err, "request failed");
            Failure::Transport(err.to_string())
        })?;

        let status = response.status();
        let text = response.text().map_err(|err| {
            warn!(%request, error = %err, "unreadable response body");
            Failure::Transport(err.to_string())
        })?;
        let body = parse_body(&text);

        if status.is_success() {
            info!(%request, status = status.as_u16(), "ok");
            Ok(body)
        } else {
            warn!(%request, status = status.as_u16(), %body, "backend rejected request");
            Err(Failure::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Empty bodies read as `null`, JSON as itself, and anything else as a plain string.
pub fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
