use std::sync::Arc;

use dashmap::DashSet;
use migrex_model::ProcessId;

/// Shared set of processes an operator has asked to stop.
///
/// A cancellation request only lands at the two pipeline checkpoints (before
/// post-processing and before commit); whatever phase is in flight runs to
/// completion first. The dispatcher clears the entry once the run is over so
/// a stale request cannot leak into a later run reusing the same id.
#[derive(Debug, Clone, Default)]
pub struct CancellationRegistry {
    requested: Arc<DashSet<ProcessId>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_cancel(&self, process_id: ProcessId) {
        self.requested.insert(process_id);
    }

    pub fn is_cancelled(&self, process_id: ProcessId) -> bool {
        self.requested.contains(&process_id)
    }

    pub fn clear(&self, process_id: ProcessId) {
        self.requested.remove(&process_id);
    }

    /// Cheap per-run view bound to one process id.
    pub fn token(&self, process_id: ProcessId) -> CancelToken {
        CancelToken {
            registry: self.clone(),
            process_id,
        }
    }
}

/// Per-run handle polled at pipeline checkpoints.
#[derive(Debug, Clone)]
pub struct CancelToken {
    registry: CancellationRegistry,
    process_id: ProcessId,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.registry.is_cancelled(self.process_id)
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_sees_registry_state() {
        let registry = CancellationRegistry::new();
        let token = registry.token(ProcessId::new(7));
        assert!(!token.is_cancelled());

        registry.request_cancel(ProcessId::new(7));
        assert!(token.is_cancelled());

        registry.clear(ProcessId::new(7));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_per_process() {
        let registry = CancellationRegistry::new();
        registry.request_cancel(ProcessId::new(1));
        assert!(registry.is_cancelled(ProcessId::new(1)));
        assert!(!registry.is_cancelled(ProcessId::new(2)));
    }
}
