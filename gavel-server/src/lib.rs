pub mod api;
pub mod config;
pub mod error;
pub mod mutation;
pub mod records;
pub mod repository;
pub mod tracker;

use std::sync::Arc;

use gavel_core::StatusEngine;

use repository::GrcRepository;
use tracker::TrackerClient;

pub struct AppState {
    pub repository: Arc<dyn GrcRepository>,
    pub engine: StatusEngine,
    pub tracker: Option<TrackerClient>,
}

impl AppState {
    pub fn new(repository: Arc<dyn GrcRepository>, tracker: Option<TrackerClient>) -> Self {
        Self {
            repository,
            engine: StatusEngine::new(),
            tracker,
        }
    }
}

pub fn service_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
