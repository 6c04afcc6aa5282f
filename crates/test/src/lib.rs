//! Test helpers and fixtures.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use catalog_application::Shell;
use catalog_core::{
    ApiRequest, CallResult, Failure, Session, SessionPersistence, Settings, Transport,
};
use serde_json::{Value, json};

#[cfg(test)]
mod scenarios;

pub fn make_settings(api_url: &str) -> Settings {
    let mut settings = Settings {
        api_url: api_url.to_string(),
        ..Settings::default()
    };
    settings.normalize();
    settings
}

pub fn make_session(id: i64, name: &str) -> Session {
    Session {
        id,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_ascii_lowercase()),
        token: Some(format!("token-{id}")),
    }
}

pub fn make_book(id: i64, name: &str, authors: &[&str], categories: &[&str], pages: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "year": 0,
        "pageAmount": pages,
        "rating": null,
        "authors": authors,
        "categories": categories,
        "reviews": []
    })
}

pub fn make_options(options: &[(i64, &str)]) -> Value {
    Value::Array(
        options
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect(),
    )
}

/// Session persistence kept in memory.
#[derive(Debug, Default)]
pub struct MemorySessions {
    stored: RefCell<Option<Session>>,
}

impl MemorySessions {
    pub fn with(session: Session) -> Self {
        Self {
            stored: RefCell::new(Some(session)),
        }
    }

    pub fn stored(&self) -> Option<Session> {
        self.stored.borrow().clone()
    }
}

impl SessionPersistence for MemorySessions {
    fn load_session(&self) -> anyhow::Result<Option<Session>> {
        Ok(self.stored.borrow().clone())
    }

    fn save_session(&self, session: &Session) -> anyhow::Result<()> {
        *self.stored.borrow_mut() = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> anyhow::Result<()> {
        *self.stored.borrow_mut() = None;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: HashMap<String, VecDeque<CallResult>>,
    sticky: HashMap<String, CallResult>,
    requests: Vec<ApiRequest>,
}

/// Answers requests from a script keyed by `"METHOD /path"` and records what it saw.
///
/// Queued responses are used once, in order; the last one keeps answering. Unscripted
/// `GET`s return an empty list and everything else returns `null`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, key: &str, result: CallResult) -> &Self {
        if let Ok(mut script) = self.script.lock() {
            script
                .responses
                .entry(key.to_string())
                .or_default()
                .push_back(result);
        }
        self
    }

    pub fn ok(&self, key: &str, body: Value) -> &Self {
        self.respond(key, Ok(body))
    }

    pub fn fail(&self, key: &str, status: u16, body: Value) -> &Self {
        self.respond(key, Err(Failure::Status { status, body }))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script
            .lock()
            .map(|script| script.requests.clone())
            .unwrap_or_default()
    }

    /// Recorded requests rendered as `"METHOD /path?query"`.
    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(ApiRequest::to_string).collect()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut script) = self.script.lock() {
            script.requests.clear();
        }
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &ApiRequest) -> CallResult {
        let Ok(mut script) = self.script.lock() else {
            return Err(Failure::Transport("script poisoned".to_string()));
        };
        script.requests.push(request.clone());

        let key = format!("{} {}", request.method, request.path);
        if let Some(next) = script.responses.get_mut(&key).and_then(VecDeque::pop_front) {
            script.sticky.insert(key, next.clone());
            return next;
        }
        if let Some(last) = script.sticky.get(&key) {
            return last.clone();
        }
        match request.method {
            catalog_core::Method::Get => Ok(json!([])),
            _ => Ok(Value::Null),
        }
    }
}

/// Runs queued requests through `transport` until the shell stops asking for more.
pub fn drive(shell: &mut Shell, transport: &impl Transport) -> usize {
    let mut handled = 0;
    for _ in 0..32 {
        let outbox = shell.take_outbox();
        if outbox.is_empty() {
            break;
        }
        for (tag, request) in outbox {
            let result = transport.execute(&request);
            shell.handle_result(tag, result);
            handled += 1;
        }
    }
    handled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings("http://catalog.test/api/");
        assert_eq!(settings.api_url, "http://catalog.test/api");
    }

    #[test]
    fn scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport
            .ok("GET /books", json!([1]))
            .ok("GET /books", json!([2]));

        let get = ApiRequest::get("/books");
        assert_eq!(transport.execute(&get), Ok(json!([1])));
        assert_eq!(transport.execute(&get), Ok(json!([2])));
        assert_eq!(transport.execute(&get), Ok(json!([2])));
        assert_eq!(transport.execute(&ApiRequest::get("/authors")), Ok(json!([])));
        assert_eq!(
            transport.execute(&ApiRequest::delete("/books/1")),
            Ok(Value::Null)
        );
        assert_eq!(transport.requests().len(), 5);
    }

    #[test]
    fn memory_sessions_roundtrip() -> anyhow::Result<()> {
        let sessions = MemorySessions::default();
        sessions.save_session(&make_session(1, "Ann"))?;
        assert_eq!(sessions.stored().map(|s| s.email), Some("ann@example.com".to_string()));
        sessions.clear_session()?;
        assert!(sessions.load_session()?.is_none());
        Ok(())
    }
}
