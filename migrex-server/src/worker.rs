//! Bounded worker pool draining the intake queue.

use std::sync::Arc;

use migrex_core::orchestrator::WorkDispatcher;
use migrex_model::WorkItem;
use tokio::sync::{mpsc, Semaphore};

/// Spawns the queue pump. Each item dispatches on its own task with at most
/// `workers` running at once; the pump itself never blocks the queue while
/// a slow scan holds a permit.
pub fn spawn(
    dispatcher: WorkDispatcher,
    mut intake: mpsc::Receiver<WorkItem>,
    workers: usize,
) -> tokio::task::JoinHandle<()> {
    let permits = Arc::new(Semaphore::new(workers.max(1)));
    tokio::spawn(async move {
        while let Some(item) = intake.recv().await {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let status = dispatcher.dispatch(&item).await;
                tracing::debug!(
                    process_id = %item.process_id,
                    status = %status,
                    "worker slot released"
                );
                drop(permit);
            });
        }
        tracing::info!("intake queue closed, worker pump stopping");
    })
}
