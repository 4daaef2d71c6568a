//! Turns an inbound portfolio URL or blog payload into uploaded media, one
//! content record and one outcome summary, tolerating per-asset failures.

pub mod blog;
mod outcome;
pub mod portfolio;

use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

pub use outcome::{ContentStatus, IngestionOutcome, SubFailure};

use crate::fetch::RemoteFetcher;
use crate::state::AppState;

/// Handles the pipeline needs, borrowed from the application state.
#[derive(Clone, Copy)]
pub struct Pipeline<'a> {
    pub db: &'a DatabaseConnection,
    pub store: &'a dyn ObjectStore,
    pub fetcher: &'a dyn RemoteFetcher,
    pub max_image_bytes: usize,
}

impl<'a> Pipeline<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        Self {
            db: &state.db,
            store: state.object_store.as_ref(),
            fetcher: state.fetcher.as_ref(),
            max_image_bytes: state.config.ingestion.max_image_bytes,
        }
    }
}
