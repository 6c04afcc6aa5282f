//! Core domain types for the catalog admin console.

use serde::{Deserialize, Serialize};

pub mod feedback;
pub mod form;
pub mod http;
pub mod model;
pub mod relation;
pub mod route;

pub use feedback::{Level, Notice, present_failure};
pub use form::{Field, FieldError, FieldKind, FieldValue, FormState};
pub use http::{ApiRequest, CallResult, Failure, Method, Transport};
pub use model::{
    AuthResponse, Author, Book, Category, EntityId, Label, Review, ReviewUser, Session, User,
};
pub use relation::{Collection, RelationOption, Relations, resolve_ids};
pub use route::Route;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Local-storage key the signed-in principal is kept under.
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub attach_token: bool,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err("unknown theme"),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            attach_token: false,
            theme: Theme::Dark,
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        let url = self.api_url.trim().trim_end_matches('/');
        self.api_url = if url.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            url.to_string()
        };
    }

    pub fn cycle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
    }
}

/// Durable storage for the signed-in principal.
pub trait SessionPersistence {
    fn load_session(&self) -> anyhow::Result<Option<Session>>;
    fn save_session(&self, session: &Session) -> anyhow::Result<()>;
    fn clear_session(&self) -> anyhow::Result<()>;
}
