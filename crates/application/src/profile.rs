//! Self-edit view for the signed-in user.

use catalog_core::{
    ApiRequest, CallResult, EntityId, FormState, Method, Notice, Session, present_failure,
};
use tracing::warn;

use crate::panel::{PanelCall, PanelEffect};
use crate::resource::{user_body, user_form};

pub struct ProfilePanel {
    user_id: EntityId,
    pub form: FormState,
    pub focus: usize,
    submitting: bool,
    pending: Option<Session>,
}

impl ProfilePanel {
    pub fn new(user_id: EntityId, session: Option<&Session>) -> Self {
        let mut panel = Self {
            user_id,
            form: user_form(),
            focus: 0,
            submitting: false,
            pending: None,
        };
        panel.sync(session);
        panel
    }

    pub fn user_id(&self) -> EntityId {
        self.user_id
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Refills the form from the principal, dropping any unsaved edits.
    pub fn sync(&mut self, session: Option<&Session>) {
        self.form = user_form();
        if let Some(field) = self.form.field_mut("password") {
            field.hint = "leave blank to keep";
        }
        if let Some(owner) = self.owner(session) {
            self.form.set_text("name", owner.name.clone());
            self.form.set_text("email", owner.email.clone());
        }
    }

    fn owner<'a>(&self, session: Option<&'a Session>) -> Option<&'a Session> {
        session.filter(|session| session.id == self.user_id)
    }

    /// Why the form cannot be used, if it cannot.
    pub fn hint(&self, session: Option<&Session>) -> Option<&'static str> {
        match session {
            None => Some("Log in to view your profile"),
            Some(session) if session.id != self.user_id => {
                Some("You can only edit your own profile")
            }
            Some(_) => None,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.form.fields.len().max(1);
    }

    pub fn focus_prev(&mut self) {
        let len = self.form.fields.len().max(1);
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn submit(&mut self, session: Option<&Session>) -> PanelEffect {
        if self.submitting {
            return PanelEffect::default();
        }
        let Some(owner) = self.owner(session) else {
            let hint = self.hint(session).unwrap_or("Log in to view your profile");
            return PanelEffect::notice(Notice::warning(hint));
        };

        let body = match user_body(&self.form, false) {
            Ok(body) => body,
            Err(errors) => {
                self.form.errors = errors;
                return PanelEffect::default();
            }
        };
        self.form.errors.clear();
        let pending = Session {
            name: body.name.clone(),
            email: body.email.clone(),
            ..owner.clone()
        };
        let body = match serde_json::to_value(&body) {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "could not encode profile body");
                return PanelEffect::notice(Notice::error("Could not update the profile"));
            }
        };

        self.pending = Some(pending);
        self.submitting = true;
        let request = ApiRequest::new(Method::Patch, format!("/users/{}", self.user_id))
            .with_body(body);
        PanelEffect::dispatch(PanelCall::Submit, request)
    }

    pub fn apply(&mut self, result: CallResult) -> PanelEffect {
        self.submitting = false;
        let pending = self.pending.take();
        match result {
            Ok(_) => {
                self.form.set_text("password", "");
                PanelEffect {
                    notices: vec![Notice::success("Profile updated")],
                    dispatch: Vec::new(),
                    session: pending,
                }
            }
            Err(failure) => {
                PanelEffect::notice(present_failure(&failure, "Could not update the profile"))
            }
        }
    }
}
