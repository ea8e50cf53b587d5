use crate::queue::JobQueue;
use echo_core::AppConfig;
use echo_runner::Runner;
use std::path::Path;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    pub fn new(config: AppConfig, runner: Arc<dyn Runner>) -> Self {
        let queue = JobQueue::new(
            runner,
            config.cas.artifact_name.clone(),
            config.cas.manifest_name.clone(),
        );
        Self {
            config: Arc::new(config),
            queue: Arc::new(queue),
        }
    }

    pub fn cas_root(&self) -> &Path {
        &self.config.cas.root
    }
}
