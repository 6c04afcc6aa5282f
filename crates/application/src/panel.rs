//! The generic list/create/edit/delete panel.

use std::marker::PhantomData;

use catalog_core::relation::parse_options;
use catalog_core::{
    ApiRequest, CallResult, Collection, EntityId, Failure, FormState, Method, Notice, Relations,
    Route, Session, present_failure,
};
use tracing::{debug, warn};

use crate::resource::{Column, EditorMode, ListQuery, Resource, Search, WriteContext};

/// Which panel operation a backend call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelCall {
    List,
    Relation(Collection),
    Submit,
    Delete,
}

/// What the shell must do after a panel operation.
#[derive(Debug, Default, PartialEq)]
pub struct PanelEffect {
    pub notices: Vec<Notice>,
    pub dispatch: Vec<(PanelCall, ApiRequest)>,
    /// Replacement for the signed-in principal.
    pub session: Option<Session>,
}

impl PanelEffect {
    pub fn notice(notice: Notice) -> Self {
        Self {
            notices: vec![notice],
            ..Self::default()
        }
    }

    pub fn dispatch(call: PanelCall, request: ApiRequest) -> Self {
        Self {
            dispatch: vec![(call, request)],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty() && self.dispatch.is_empty() && self.session.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
    pub mode: EditorMode,
    pub form: FormState,
    pub focus: usize,
}

impl Editor {
    pub fn focus_next(&mut self) {
        if !self.form.fields.is_empty() {
            self.focus = (self.focus + 1) % self.form.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.form.fields.is_empty() {
            self.focus = (self.focus + self.form.fields.len() - 1) % self.form.fields.len();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: EntityId,
    pub label: String,
}

/// Object-safe view of a mounted panel, whatever entity it lists.
pub trait Panel {
    fn title(&self) -> String;
    fn noun(&self) -> &'static str;
    fn columns(&self) -> &'static [Column];
    fn rows(&self) -> Vec<Vec<String>>;
    fn selected(&self) -> usize;
    fn select(&mut self, idx: usize);
    fn is_loading(&self) -> bool;
    fn is_submitting(&self) -> bool;
    fn searchable(&self) -> bool;
    fn query(&self) -> &ListQuery;
    fn relations(&self) -> &Relations;
    fn editor(&self) -> Option<&Editor>;
    fn editor_mut(&mut self) -> Option<&mut Editor>;
    fn pending_delete(&self) -> Option<&PendingDelete>;

    /// The list request plus one request per auxiliary collection.
    fn refresh(&mut self) -> Vec<(PanelCall, ApiRequest)>;
    fn search(&mut self, search: Option<Search>) -> Vec<(PanelCall, ApiRequest)>;
    fn open_editor(&mut self, target: Option<usize>, session: Option<&Session>) -> PanelEffect;
    fn close_editor(&mut self);
    fn submit(&mut self, session: Option<&Session>) -> PanelEffect;
    fn request_delete(&mut self) -> PanelEffect;
    fn confirm_delete(&mut self) -> PanelEffect;
    fn cancel_delete(&mut self);
    fn apply(&mut self, call: PanelCall, result: CallResult) -> PanelEffect;
    fn drill_down(&self) -> Option<Route>;

    fn len(&self) -> usize {
        self.rows().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct ResourcePanel<R: Resource> {
    parent: Option<EntityId>,
    query: ListQuery,
    fetched: Vec<R::Entity>,
    items: Vec<R::Entity>,
    selected: usize,
    relations: Relations,
    editor: Option<Editor>,
    pending_delete: Option<PendingDelete>,
    pending_principal: Option<Session>,
    loading: bool,
    submitting: bool,
    _resource: PhantomData<R>,
}

impl<R: Resource> ResourcePanel<R> {
    pub fn new(parent: Option<EntityId>, query: ListQuery) -> Self {
        Self {
            parent,
            query,
            fetched: Vec::new(),
            items: Vec::new(),
            selected: 0,
            relations: Relations::default(),
            editor: None,
            pending_delete: None,
            pending_principal: None,
            loading: false,
            submitting: false,
            _resource: PhantomData,
        }
    }

    fn list(&mut self) -> (PanelCall, ApiRequest) {
        self.loading = true;
        (PanelCall::List, R::list_request(self.parent, &self.query))
    }

    fn refilter(&mut self) {
        let query = &self.query;
        let relations = &self.relations;
        self.items = self
            .fetched
            .iter()
            .filter(|entity| R::retain(entity, query, relations))
            .cloned()
            .collect();
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }

    fn entity_path(&self, id: EntityId) -> String {
        format!("{}/{}", R::collection_path(self.parent), id)
    }

    fn apply_list(&mut self, result: CallResult) -> PanelEffect {
        self.loading = false;
        let fallback = format!("Could not load {}", R::TITLE.to_ascii_lowercase());
        let payload = match result {
            Ok(payload) => payload,
            Err(Failure::Status { status: 404, .. }) if R::empty_on_not_found(&self.query) => {
                debug!(resource = R::TITLE, "search found nothing");
                self.fetched.clear();
                self.refilter();
                return PanelEffect::notice(Notice::info(format!(
                    "No {} match",
                    R::TITLE.to_ascii_lowercase()
                )));
            }
            Err(failure) => {
                warn!(resource = R::TITLE, %failure, "list failed; keeping previous rows");
                return PanelEffect::notice(Notice::error(fallback));
            }
        };
        match serde_json::from_value::<Vec<R::Entity>>(payload) {
            Ok(entities) => {
                debug!(resource = R::TITLE, count = entities.len(), "list loaded");
                self.fetched = entities;
                self.refilter();
                PanelEffect::default()
            }
            Err(err) => {
                warn!(resource = R::TITLE, error = %err, "unexpected list payload");
                PanelEffect::notice(Notice::error(fallback))
            }
        }
    }

    fn apply_relation(&mut self, collection: Collection, result: CallResult) -> PanelEffect {
        match result {
            Ok(payload) => {
                self.relations.set(collection, parse_options(&payload));
                self.refilter();
                PanelEffect::default()
            }
            Err(failure) => {
                warn!(collection = collection.plural(), %failure, "relation fetch failed");
                PanelEffect::notice(Notice::error(format!(
                    "Could not load {}",
                    collection.plural()
                )))
            }
        }
    }

    fn apply_submit(&mut self, result: CallResult) -> PanelEffect {
        self.submitting = false;
        let mode = self.editor.as_ref().map(|editor| editor.mode);
        let principal = self.pending_principal.take();
        match result {
            Ok(_) => {
                let verb = match mode {
                    Some(EditorMode::Edit(_)) => "updated",
                    _ => "created",
                };
                self.editor = None;
                let list = self.list();
                PanelEffect {
                    notices: vec![Notice::success(format!(
                        "{} {verb}",
                        capitalize(R::NOUN)
                    ))],
                    dispatch: vec![list],
                    session: principal,
                }
            }
            Err(failure) => PanelEffect::notice(present_failure(
                &failure,
                &format!("Could not save the {}", R::NOUN),
            )),
        }
    }

    fn apply_delete(&mut self, result: CallResult) -> PanelEffect {
        match result {
            Ok(_) => {
                let list = self.list();
                PanelEffect {
                    notices: vec![Notice::success(format!("{} deleted", capitalize(R::NOUN)))],
                    dispatch: vec![list],
                    session: None,
                }
            }
            Err(failure) => PanelEffect::notice(present_failure(
                &failure,
                &format!("Could not delete the {}", R::NOUN),
            )),
        }
    }

    fn session_warning() -> PanelEffect {
        PanelEffect::notice(Notice::warning(format!(
            "Please log in to write a {}",
            R::NOUN
        )))
    }
}

impl<R: Resource> Panel for ResourcePanel<R> {
    fn title(&self) -> String {
        match (self.parent, self.query.author_id) {
            (Some(parent), _) => format!("{} of book #{parent}", R::TITLE),
            (None, Some(author)) => match self.relations.name_of(Collection::Authors, author) {
                Some(name) => format!("{} by {name}", R::TITLE),
                None => format!("{} by author #{author}", R::TITLE),
            },
            (None, None) => R::TITLE.to_string(),
        }
    }

    fn noun(&self) -> &'static str {
        R::NOUN
    }

    fn columns(&self) -> &'static [Column] {
        R::columns()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.items.iter().map(R::row).collect()
    }

    fn selected(&self) -> usize {
        self.selected
    }

    fn select(&mut self, idx: usize) {
        self.selected = idx.min(self.items.len().saturating_sub(1));
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn is_submitting(&self) -> bool {
        self.submitting
    }

    fn searchable(&self) -> bool {
        R::SEARCHABLE
    }

    fn query(&self) -> &ListQuery {
        &self.query
    }

    fn relations(&self) -> &Relations {
        &self.relations
    }

    fn editor(&self) -> Option<&Editor> {
        self.editor.as_ref()
    }

    fn editor_mut(&mut self) -> Option<&mut Editor> {
        self.editor.as_mut()
    }

    fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    fn refresh(&mut self) -> Vec<(PanelCall, ApiRequest)> {
        let mut calls = vec![self.list()];
        calls.extend(
            R::RELATIONS
                .iter()
                .map(|c| (PanelCall::Relation(*c), ApiRequest::get(c.path()))),
        );
        calls
    }

    fn search(&mut self, search: Option<Search>) -> Vec<(PanelCall, ApiRequest)> {
        if !R::SEARCHABLE {
            return Vec::new();
        }
        self.query.search = search.filter(|s| !s.text.trim().is_empty());
        vec![self.list()]
    }

    fn open_editor(&mut self, target: Option<usize>, session: Option<&Session>) -> PanelEffect {
        if R::REQUIRES_SESSION && session.is_none() {
            return Self::session_warning();
        }
        let editor = match target {
            None => Editor {
                mode: EditorMode::Create,
                form: R::blank_form(),
                focus: 0,
            },
            Some(idx) => {
                let Some(entity) = self.items.get(idx) else {
                    return PanelEffect::default();
                };
                Editor {
                    mode: EditorMode::Edit(R::id(entity)),
                    form: R::form_for(entity, &self.relations),
                    focus: 0,
                }
            }
        };
        self.pending_delete = None;
        self.editor = Some(editor);
        PanelEffect::default()
    }

    fn close_editor(&mut self) {
        if !self.submitting {
            self.editor = None;
        }
    }

    fn submit(&mut self, session: Option<&Session>) -> PanelEffect {
        if self.submitting {
            return PanelEffect::default();
        }
        if R::REQUIRES_SESSION && session.is_none() {
            return Self::session_warning();
        }
        let parent = self.parent;
        let Some(editor) = self.editor.as_mut() else {
            return PanelEffect::default();
        };

        let ctx = WriteContext {
            mode: editor.mode,
            session,
            parent,
        };
        let body = match R::body(&editor.form, &ctx) {
            Ok(body) => body,
            Err(errors) => {
                editor.form.errors = errors;
                return PanelEffect::default();
            }
        };
        editor.form.errors.clear();
        let body = match serde_json::to_value(&body) {
            Ok(body) => body,
            Err(err) => {
                warn!(resource = R::TITLE, error = %err, "could not encode body");
                return PanelEffect::notice(Notice::error(format!(
                    "Could not save the {}",
                    R::NOUN
                )));
            }
        };

        let mode = editor.mode;
        self.pending_principal = match (mode, session) {
            (EditorMode::Edit(id), Some(session)) => {
                R::principal_update(id, &editor.form, session)
            }
            _ => None,
        };
        let request = match mode {
            EditorMode::Create => ApiRequest::post(R::collection_path(parent), body),
            EditorMode::Edit(id) => {
                ApiRequest::new(R::UPDATE_METHOD, self.entity_path(id)).with_body(body)
            }
        };
        self.submitting = true;
        PanelEffect::dispatch(PanelCall::Submit, request)
    }

    fn request_delete(&mut self) -> PanelEffect {
        let Some(entity) = self.items.get(self.selected) else {
            return PanelEffect::default();
        };
        self.pending_delete = Some(PendingDelete {
            id: R::id(entity),
            label: R::label(entity),
        });
        PanelEffect::default()
    }

    fn confirm_delete(&mut self) -> PanelEffect {
        let Some(pending) = self.pending_delete.take() else {
            return PanelEffect::default();
        };
        let request = ApiRequest::new(Method::Delete, self.entity_path(pending.id));
        PanelEffect::dispatch(PanelCall::Delete, request)
    }

    fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    fn apply(&mut self, call: PanelCall, result: CallResult) -> PanelEffect {
        match call {
            PanelCall::List => self.apply_list(result),
            PanelCall::Relation(collection) => self.apply_relation(collection, result),
            PanelCall::Submit => self.apply_submit(result),
            PanelCall::Delete => self.apply_delete(result),
        }
    }

    fn drill_down(&self) -> Option<Route> {
        self.items.get(self.selected).and_then(R::drill_down)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
