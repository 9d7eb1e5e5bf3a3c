use migrex_model::{ProcessStatus, RunId};

/// Mutable state threaded through one orchestration run.
///
/// Tracks the status the run will finish with, the operator-facing messages
/// accumulated along the way, and the report-eligibility latch. Status moves
/// are monotonic: a run can only get worse, never better, so a late failure
/// cannot wipe out an earlier downgrade and a commit failure cannot resurrect
/// a cancelled run.
#[derive(Debug)]
pub struct RunContext {
    run_id: RunId,
    status: ProcessStatus,
    report_eligible: bool,
    messages: Vec<String>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        RunContext {
            run_id: RunId::new(),
            status: ProcessStatus::InProgress,
            report_eligible: false,
            messages: Vec::new(),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    /// Latched once execution produced findings; later failures downgrade
    /// the status but the findings still merge and report.
    pub fn mark_report_eligible(&mut self) {
        self.report_eligible = true;
    }

    pub fn is_report_eligible(&self) -> bool {
        self.report_eligible
    }

    /// Appends an operator-facing message; empty strings are dropped so the
    /// joined result never carries blank lines.
    pub fn push_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !message.is_empty() {
            self.messages.push(message);
        }
    }

    /// All accumulated messages joined with newlines, or `None` when the run
    /// finished clean.
    pub fn message(&self) -> Option<String> {
        if self.messages.is_empty() {
            None
        } else {
            Some(self.messages.join("\n"))
        }
    }

    /// Moves an in-progress run to `Completed`; a run already downgraded or
    /// failed keeps its status.
    pub fn complete(&mut self) {
        if self.status == ProcessStatus::InProgress {
            self.status = ProcessStatus::Completed;
        }
    }

    /// Downgrades `InProgress` or `Completed` to `PartiallyCompleted`.
    /// Failure statuses are sticky and stay untouched.
    pub fn downgrade_partial(&mut self) {
        if matches!(
            self.status,
            ProcessStatus::InProgress | ProcessStatus::Completed
        ) {
            self.status = ProcessStatus::PartiallyCompleted;
        }
    }

    pub fn mark_not_supported(&mut self, message: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ProcessStatus::NotSupported;
        }
        self.push_message(message);
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ProcessStatus::Failed;
        }
        self.push_message(message);
    }

    pub fn mark_cancelled(&mut self, message: impl Into<String>) {
        if !self.status.is_terminal() {
            self.status = ProcessStatus::Cancelled;
        }
        self.push_message(message);
    }
}
