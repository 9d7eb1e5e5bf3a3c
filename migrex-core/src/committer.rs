//! Result commit: snapshot, report trigger, persistence.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use migrex_model::{ProcessId, ProcessStatus, WorkItem};

use crate::context::RunContext;
use crate::error::AssessError;
use crate::ports::outbound::ReportTrigger;
use crate::ports::store::ProcessStore;

pub const REPORT_FAILED_MESSAGE: &str = "Scan report create failed.";

/// Final status and operator message for a fatal pipeline error.
///
/// Unsupported targets and cancellations carry their message as-is; real
/// failures get their transport prefix scrubbed first.
pub fn classify_failure(error: &AssessError) -> (ProcessStatus, String) {
    match error {
        AssessError::NotSupported(message) => (ProcessStatus::NotSupported, message.clone()),
        AssessError::Cancelled(message) => (ProcessStatus::Cancelled, message.clone()),
        other => (
            ProcessStatus::Failed,
            scrub_transport_prefix(&other.detail()),
        ),
    }
}

/// Strips a leading `module::path::Type: ` head so operators read the cause
/// rather than the plumbing that carried it.
pub fn scrub_transport_prefix(raw: &str) -> String {
    if let Some((head, rest)) = raw.split_once(": ") {
        if head.contains("::") {
            return rest.trim().to_owned();
        }
    }
    raw.trim().to_owned()
}

/// Writes the snapshot, fires the report trigger and persists the run
/// outcome. Snapshot and persistence failures downgrade a completed run and
/// append [`REPORT_FAILED_MESSAGE`]; trigger failures are log-only.
pub struct Committer {
    process_store: Arc<dyn ProcessStore>,
    report_trigger: Arc<dyn ReportTrigger>,
    work_dir: PathBuf,
}

impl Committer {
    pub fn new(
        process_store: Arc<dyn ProcessStore>,
        report_trigger: Arc<dyn ReportTrigger>,
        work_dir: PathBuf,
    ) -> Self {
        Committer {
            process_store,
            report_trigger,
            work_dir,
        }
    }

    /// Scratch directory of one process; snapshots land here and cleanup
    /// removes it wholesale.
    pub fn process_dir(&self, process_id: ProcessId) -> PathBuf {
        self.work_dir.join("assessment").join(process_id.to_string())
    }

    fn snapshot_path(&self, item: &WorkItem) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let domain = item.domain.as_code().to_ascii_lowercase();
        let detail = item.detail_type_key().to_ascii_lowercase();
        self.process_dir(item.process_id)
            .join(format!("migrex_{domain}_assessment_{detail}_{stamp}.json"))
    }

    /// Commits a finished run. Returns the snapshot path when one was
    /// written.
    pub async fn commit(
        &self,
        item: &WorkItem,
        ctx: &mut RunContext,
        payload: Option<serde_json::Value>,
    ) -> Option<PathBuf> {
        let mut report_path = None;

        if ctx.is_report_eligible() {
            if let Some(payload) = payload {
                match self.write_snapshot(item, &payload).await {
                    Ok(path) => report_path = Some(path),
                    Err(error) => {
                        tracing::warn!(
                            process_id = %item.process_id,
                            %error,
                            "snapshot write failed"
                        );
                        ctx.downgrade_partial();
                        ctx.push_message(REPORT_FAILED_MESSAGE);
                    }
                }
            }
        }

        if let Err(error) = self
            .report_trigger
            .fire(
                item,
                report_path.as_deref(),
                ctx.status(),
                ctx.message().as_deref(),
                ctx.is_report_eligible(),
            )
            .await
        {
            tracing::warn!(process_id = %item.process_id, %error, "report trigger failed");
        }

        if let Err(error) = self
            .process_store
            .save_result(
                item.process_id,
                ctx.message().as_deref(),
                report_path.as_deref(),
                ctx.is_report_eligible(),
                Utc::now(),
            )
            .await
        {
            tracing::error!(process_id = %item.process_id, %error, "result persistence failed");
        }

        report_path
    }

    async fn write_snapshot(
        &self,
        item: &WorkItem,
        payload: &serde_json::Value,
    ) -> crate::Result<PathBuf> {
        let path = self.snapshot_path(item);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(payload)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

impl std::fmt::Debug for Committer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Committer")
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_prefixes_are_scrubbed() {
        assert_eq!(
            scrub_transport_prefix("ssh::transport::Error: connection reset"),
            "connection reset"
        );
        assert_eq!(
            scrub_transport_prefix("Connection refused: target unreachable"),
            "Connection refused: target unreachable"
        );
        assert_eq!(scrub_transport_prefix("plain message"), "plain message");
    }

    #[test]
    fn classification_keeps_policy_messages_verbatim() {
        let (status, message) = classify_failure(&AssessError::NotSupported(
            "Scan cannot be performed. It is not supported OS.".into(),
        ));
        assert_eq!(status, ProcessStatus::NotSupported);
        assert_eq!(message, "Scan cannot be performed. It is not supported OS.");

        let (status, _) =
            classify_failure(&AssessError::Cancelled("stopped by operator".into()));
        assert_eq!(status, ProcessStatus::Cancelled);

        let (status, message) =
            classify_failure(&AssessError::Command("io::driver::Error: broken pipe".into()));
        assert_eq!(status, ProcessStatus::Failed);
        assert_eq!(message, "broken pipe");
    }
}
