//! Application orchestration layer for the catalog console.
//!
//! Everything here is synchronous and free of I/O: panels and the shell turn user
//! intents into [`catalog_core::ApiRequest`]s and fold the results back into state.
//! The terminal front end decides how and when requests actually run.

pub mod panel;
pub mod profile;
pub mod resource;
pub mod session;
pub mod shell;

pub use panel::{Editor, Panel, PanelCall, PanelEffect, PendingDelete, ResourcePanel};
pub use profile::ProfilePanel;
pub use resource::{
    Authors, Books, Categories, Column, EditorMode, ListQuery, Resource, Reviews, Search,
    SearchBy, Users, WriteContext,
};
pub use session::{AuthMode, AuthModal, SessionStore};
pub use shell::{ActiveNotice, CallTag, CallTarget, Shell, View};
