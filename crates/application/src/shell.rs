//! Route table, mounted view, auth modal and notifications.

use std::time::Instant;

use catalog_core::{ApiRequest, CallResult, Notice, Route, Session, Settings};
use tracing::{debug, info, warn};

use crate::panel::{Panel, PanelCall, PanelEffect, ResourcePanel};
use crate::profile::ProfilePanel;
use crate::resource::{Authors, Books, Categories, ListQuery, Reviews, Search, Users};
use crate::session::{AuthMode, AuthModal, SessionStore};

/// Who receives the result of a backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    Panel(PanelCall),
    Profile,
    Auth,
}

/// Attached to every request; results from an older mount generation are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTag {
    pub generation: u64,
    pub target: CallTarget,
}

pub enum View {
    Panel(Box<dyn Panel>),
    Profile(ProfilePanel),
}

#[derive(Debug, Clone)]
pub struct ActiveNotice {
    pub notice: Notice,
    pub expires_at: Instant,
}

pub struct Shell {
    settings: Settings,
    route: Route,
    generation: u64,
    view: View,
    session: SessionStore,
    auth: Option<AuthModal>,
    notices: Vec<ActiveNotice>,
    outbox: Vec<(CallTag, ApiRequest)>,
}

fn mount(route: Route, session: Option<&Session>) -> View {
    match route {
        Route::Books { author_id } => View::Panel(Box::new(ResourcePanel::<Books>::new(
            None,
            ListQuery {
                search: None,
                author_id,
            },
        ))),
        Route::Authors => View::Panel(Box::new(ResourcePanel::<Authors>::new(
            None,
            ListQuery::default(),
        ))),
        Route::Categories => View::Panel(Box::new(ResourcePanel::<Categories>::new(
            None,
            ListQuery::default(),
        ))),
        Route::Reviews { book_id } => View::Panel(Box::new(ResourcePanel::<Reviews>::new(
            Some(book_id),
            ListQuery::default(),
        ))),
        Route::Users => View::Panel(Box::new(ResourcePanel::<Users>::new(
            None,
            ListQuery::default(),
        ))),
        Route::Profile { user_id } => View::Profile(ProfilePanel::new(user_id, session)),
    }
}

impl Shell {
    pub fn new(settings: Settings, session: SessionStore, route: Route) -> Self {
        let view = mount(route, session.current());
        let mut shell = Self {
            settings,
            route,
            generation: 1,
            view,
            session,
            auth: None,
            notices: Vec::new(),
            outbox: Vec::new(),
        };
        shell.refresh();
        shell
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Theme and token attachment apply immediately; a new API URL needs a new worker.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    pub fn panel(&self) -> Option<&dyn Panel> {
        match &self.view {
            View::Panel(panel) => Some(panel.as_ref()),
            View::Profile(_) => None,
        }
    }

    pub fn panel_mut(&mut self) -> Option<&mut (dyn Panel + 'static)> {
        match &mut self.view {
            View::Panel(panel) => Some(panel.as_mut()),
            View::Profile(_) => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.current()
    }

    pub fn auth(&self) -> Option<&AuthModal> {
        self.auth.as_ref()
    }

    pub fn auth_mut(&mut self) -> Option<&mut AuthModal> {
        self.auth.as_mut()
    }

    pub fn is_loading(&self) -> bool {
        self.panel().is_some_and(|panel| panel.is_loading())
    }

    /// Mounts the view for `route`. Late results for the previous view are dropped;
    /// an auth modal waiting on the backend stays open to receive its answer.
    pub fn navigate(&mut self, route: Route) {
        info!(%route, "navigate");
        if !self.auth.as_ref().is_some_and(|modal| modal.submitting) {
            self.auth = None;
        }
        self.remount(route);
    }

    pub fn refresh(&mut self) {
        let calls = match &mut self.view {
            View::Panel(panel) => panel.refresh(),
            View::Profile(profile) => {
                profile.sync(self.session.current());
                Vec::new()
            }
        };
        self.queue_panel_calls(calls);
    }

    fn remount(&mut self, route: Route) {
        self.generation += 1;
        self.route = route;
        self.view = mount(route, self.session.current());
        self.refresh();
    }

    fn queue(&mut self, target: CallTarget, request: ApiRequest) {
        let tag = CallTag {
            generation: self.generation,
            target,
        };
        self.outbox.push((tag, request));
    }

    fn queue_panel_calls(&mut self, calls: Vec<(PanelCall, ApiRequest)>) {
        for (call, request) in calls {
            self.queue(CallTarget::Panel(call), request);
        }
    }

    /// Requests waiting for the worker, with the bearer token attached when enabled.
    pub fn take_outbox(&mut self) -> Vec<(CallTag, ApiRequest)> {
        let token = if self.settings.attach_token {
            self.session.current().and_then(|s| s.token.clone())
        } else {
            None
        };
        self.outbox
            .drain(..)
            .map(|(tag, request)| (tag, request.with_bearer(token.clone())))
            .collect()
    }

    pub fn handle_result(&mut self, tag: CallTag, result: CallResult) {
        if tag.target == CallTarget::Auth {
            self.apply_auth(result);
            return;
        }
        if tag.generation != self.generation {
            debug!(?tag, current = self.generation, "dropping stale result");
            return;
        }

        let effect = match (tag.target, &mut self.view) {
            (CallTarget::Panel(call), View::Panel(panel)) => panel.apply(call, result),
            (CallTarget::Profile, View::Profile(profile)) => profile.apply(result),
            _ => {
                debug!(?tag, "result does not match the mounted view");
                return;
            }
        };
        let target = tag.target;
        self.absorb(effect, move |call| match target {
            CallTarget::Panel(_) => CallTarget::Panel(call),
            other => other,
        });
    }

    fn absorb(&mut self, effect: PanelEffect, target: impl Fn(PanelCall) -> CallTarget) {
        let PanelEffect {
            notices,
            dispatch,
            session,
        } = effect;
        for notice in notices {
            self.notify(notice);
        }
        for (call, request) in dispatch {
            self.queue(target(call), request);
        }
        if let Some(session) = session {
            if let Err(err) = self.session.establish(session) {
                warn!(error = %err, "could not persist session");
                self.notify(Notice::error("Could not save the session"));
            }
        }
    }

    pub fn open_editor(&mut self, target: Option<usize>) {
        let effect = match &mut self.view {
            View::Panel(panel) => panel.open_editor(target, self.session.current()),
            View::Profile(_) => return,
        };
        self.absorb(effect, CallTarget::Panel);
    }

    pub fn close_editor(&mut self) {
        if let Some(panel) = self.panel_mut() {
            panel.close_editor();
        }
    }

    pub fn submit(&mut self) {
        match &mut self.view {
            View::Panel(panel) => {
                let effect = panel.submit(self.session.current());
                self.absorb(effect, CallTarget::Panel);
            }
            View::Profile(profile) => {
                let effect = profile.submit(self.session.current());
                self.absorb(effect, |_| CallTarget::Profile);
            }
        }
    }

    pub fn request_delete(&mut self) {
        let effect = match self.panel_mut() {
            Some(panel) => panel.request_delete(),
            None => return,
        };
        self.absorb(effect, CallTarget::Panel);
    }

    pub fn confirm_delete(&mut self) {
        let effect = match self.panel_mut() {
            Some(panel) => panel.confirm_delete(),
            None => return,
        };
        self.absorb(effect, CallTarget::Panel);
    }

    pub fn cancel_delete(&mut self) {
        if let Some(panel) = self.panel_mut() {
            panel.cancel_delete();
        }
    }

    pub fn search(&mut self, search: Option<Search>) {
        if !self.panel().is_some_and(|panel| panel.searchable()) {
            self.notify(Notice::info("Search is available on the book list"));
            return;
        }
        let calls = self
            .panel_mut()
            .map(|panel| panel.search(search))
            .unwrap_or_default();
        self.queue_panel_calls(calls);
    }

    pub fn drill_down(&mut self) {
        if let Some(route) = self.panel().and_then(|panel| panel.drill_down()) {
            self.navigate(route);
        }
    }

    /// The signed-in user's profile, or the login modal when signed out.
    pub fn open_profile(&mut self) {
        match self.session.current().map(|s| s.id) {
            Some(user_id) => self.navigate(Route::Profile { user_id }),
            None => self.open_auth(AuthMode::Login),
        }
    }

    pub fn open_auth(&mut self, mode: AuthMode) {
        self.auth = Some(AuthModal::new(mode));
    }

    pub fn close_auth(&mut self) {
        if self.auth.as_ref().is_some_and(|modal| !modal.submitting) {
            self.auth = None;
        }
    }

    pub fn submit_auth(&mut self) {
        let Some(request) = self.auth.as_mut().and_then(AuthModal::submit) else {
            return;
        };
        self.queue(CallTarget::Auth, request);
    }

    fn apply_auth(&mut self, result: CallResult) {
        let Some(modal) = self.auth.as_mut() else {
            debug!("auth result arrived after the modal closed");
            return;
        };
        let mode = modal.mode;
        match modal.apply(result) {
            Ok(session) => {
                self.auth = None;
                let greeting = match mode {
                    AuthMode::Login => format!("Welcome back, {}", session.name),
                    AuthMode::Register => format!("Welcome, {}", session.name),
                };
                if let Err(err) = self.session.establish(session) {
                    warn!(error = %err, "could not persist session");
                }
                self.notify(Notice::success(greeting));
                if let View::Profile(profile) = &mut self.view {
                    profile.sync(self.session.current());
                }
            }
            Err(notice) => self.notify(notice),
        }
    }

    pub fn logout(&mut self) {
        if !self.session.is_signed_in() {
            return;
        }
        if let Err(err) = self.session.logout() {
            warn!(error = %err, "could not clear stored session");
        }
        self.notify(Notice::info("Logged out"));
        if self.route.is_principal_scoped() {
            self.navigate(Route::books());
        } else if let View::Profile(profile) = &mut self.view {
            profile.sync(None);
        }
    }

    pub fn notify(&mut self, notice: Notice) {
        self.notify_at(notice, Instant::now());
    }

    pub fn notify_at(&mut self, notice: Notice, now: Instant) {
        let expires_at = now + notice.duration;
        self.notices.push(ActiveNotice { notice, expires_at });
    }

    pub fn prune_notices(&mut self, now: Instant) {
        self.notices.retain(|active| active.expires_at > now);
    }

    pub fn notices(&self) -> &[ActiveNotice] {
        &self.notices
    }
}
