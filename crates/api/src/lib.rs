//! HTTP access to the catalog backend.

mod client;
mod worker;

pub use client::{ApiClient, parse_body};
pub use worker::ApiWorker;
