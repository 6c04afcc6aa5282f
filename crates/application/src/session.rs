//! The signed-in principal and the login/register modal.

use std::rc::Rc;

use catalog_core::form::{Checks, FieldError};
use catalog_core::model::LoginBody;
use catalog_core::{
    ApiRequest, AuthResponse, CallResult, Failure, Field, FormState, Notice, Session,
    SessionPersistence, User, present_failure,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::resource::{user_body, user_form};

/// Current identity, loaded eagerly from durable storage and written through on change.
pub struct SessionStore {
    current: Option<Session>,
    persistence: Rc<dyn SessionPersistence>,
}

impl SessionStore {
    pub fn load(persistence: Rc<dyn SessionPersistence>) -> Self {
        let current = match persistence.load_session() {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "could not read stored session");
                None
            }
        };
        Self {
            current,
            persistence,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Replaces the principal. The in-memory value changes even when persisting fails.
    pub fn establish(&mut self, session: Session) -> anyhow::Result<()> {
        info!(user_id = session.id, "session established");
        let saved = self.persistence.save_session(&session);
        self.current = Some(session);
        saved
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        if let Some(session) = self.current.take() {
            info!(user_id = session.id, "session cleared");
        }
        self.persistence.clear_session()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::Register => "Register",
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Register,
            AuthMode::Register => AuthMode::Login,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthModal {
    pub mode: AuthMode,
    pub form: FormState,
    pub focus: usize,
    pub submitting: bool,
}

impl AuthModal {
    pub fn new(mode: AuthMode) -> Self {
        let form = match mode {
            AuthMode::Login => FormState::new(vec![
                Field::text("email", "Email"),
                Field::password("password", "Password"),
            ]),
            AuthMode::Register => user_form(),
        };
        Self {
            mode,
            form,
            focus: 0,
            submitting: false,
        }
    }

    /// Switches between login and register, carrying the email over.
    pub fn toggle_mode(&mut self) {
        let email = self.form.text("email").to_string();
        *self = Self::new(self.mode.toggle());
        self.form.set_text("email", email);
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.form.fields.len().max(1);
    }

    pub fn focus_prev(&mut self) {
        let len = self.form.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
    }

    /// The request to send, or `None` when the form is invalid or a call is in flight.
    pub fn submit(&mut self) -> Option<ApiRequest> {
        if self.submitting {
            return None;
        }
        let body = match self.mode {
            AuthMode::Login => login_body(&self.form).and_then(|body| to_json(&body)),
            AuthMode::Register => user_body(&self.form, true).and_then(|body| to_json(&body)),
        };
        match body {
            Ok(body) => {
                self.form.errors.clear();
                self.submitting = true;
                let path = match self.mode {
                    AuthMode::Login => "/users/login",
                    AuthMode::Register => "/users",
                };
                Some(ApiRequest::post(path, body))
            }
            Err(errors) => {
                self.form.errors = errors;
                None
            }
        }
    }

    pub fn apply(&mut self, result: CallResult) -> Result<Session, Notice> {
        self.submitting = false;
        let fallback = match self.mode {
            AuthMode::Login => "Login failed",
            AuthMode::Register => "Registration failed",
        };
        match result {
            Ok(payload) => session_from_payload(payload).ok_or_else(|| {
                warn!("auth response did not describe a user");
                Notice::error(fallback)
            }),
            Err(failure) => Err(auth_failure_notice(&failure, fallback)),
        }
    }
}

fn login_body(form: &FormState) -> Result<LoginBody, Vec<FieldError>> {
    let mut checks = Checks::new(form);
    let email = checks.required("email", "Please enter your email");
    checks.email("email", &email, "Please enter a valid email");
    let password = checks.required("password", "Please enter your password");
    checks.finish(LoginBody {
        email: email.trim().to_string(),
        password,
    })
}

fn to_json<T: serde::Serialize>(body: &T) -> Result<Value, Vec<FieldError>> {
    serde_json::to_value(body).map_err(|err| vec![FieldError::new("email", err.to_string())])
}

/// Auth responses carry `userId`; a bare user record is accepted too.
pub fn session_from_payload(payload: Value) -> Option<Session> {
    if let Ok(response) = serde_json::from_value::<AuthResponse>(payload.clone()) {
        return Some(Session::from(response));
    }
    let user = serde_json::from_value::<User>(payload).ok()?;
    Some(Session {
        id: user.id,
        name: user.name,
        email: user.email,
        token: None,
    })
}

/// String payloads are shown as-is; anything else goes through the presenter.
pub fn auth_failure_notice(failure: &Failure, fallback: &str) -> Notice {
    match failure {
        Failure::Status {
            body: Value::String(text),
            ..
        } if !text.trim().is_empty() => Notice::error(text.clone()),
        other => present_failure(other, fallback),
    }
}
