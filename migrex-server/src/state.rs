use std::fmt;
use std::sync::Arc;

use migrex_config::Config;
use migrex_core::monitor::{MetricAggregator, NetworkObserver};
use migrex_core::orchestrator::WorkDispatcher;
use migrex_core::ports::store::ProcessStore;
use migrex_model::WorkItem;
use tokio::sync::mpsc;

use crate::outbound::ProcessIdAllocator;

/// Shared handles behind every request handler.
///
/// The dispatcher owns the engine core; the intake sender feeds the worker
/// pool. Everything is `Arc`ed so the state clones per request for free.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: WorkDispatcher,
    pub processes: Arc<dyn ProcessStore>,
    pub intake: mpsc::Sender<WorkItem>,
    pub metrics: Arc<MetricAggregator>,
    pub network: Arc<NetworkObserver>,
    pub ids: Arc<ProcessIdAllocator>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
