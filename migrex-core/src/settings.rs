use std::path::PathBuf;

/// Engine-level knobs threaded into the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Root under which per-process report artifacts are written.
    pub work_dir: PathBuf,
    /// Queue follow-on middleware assessments for installations noticed
    /// during server scans.
    pub middleware_auto_scan: bool,
    /// Queue follow-on application assessments for deployments noticed
    /// during middleware scans.
    pub application_auto_scan: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            work_dir: PathBuf::from("./work"),
            middleware_auto_scan: true,
            application_auto_scan: true,
        }
    }
}
