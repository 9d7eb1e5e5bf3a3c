//! End-to-end assessment runs through the dispatcher against the in-memory
//! store, with scripted scan components standing in for real remote scans.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use chrono::Utc;

use migrex_core::cancel::CancellationRegistry;
use migrex_core::error::AssessError;
use migrex_core::merge::middleware::StandardMiddlewarePlanner;
use migrex_core::orchestrator::{
    PipelineCore, ScanComponents, WorkDispatcher, INSUFFICIENT_CONNECTION_MESSAGE,
    SOFT_ERROR_MESSAGE,
};
use migrex_core::ports::outbound::{
    AssessmentEvent, EventPhase, FollowOnQueue, NotificationPublisher, ReportTrigger,
};
use migrex_core::ports::remote::{CommandOutput, ItemConnectionResolver, RemoteExecutor};
use migrex_core::ports::runner::{
    ApplicationScanRunner, DatabaseScanRunner, MiddlewareScanRunner, ServerScanRunner,
};
use migrex_core::ports::store::{GraphStore, ProcessStore};
use migrex_core::registry::ComponentKey;
use migrex_core::settings::EngineSettings;
use migrex_core::store::MemoryStore;
use migrex_core::Result;
use migrex_model::{
    AdminProbe, ApplicationFinding, ApplicationTarget, ConnectionDescriptor,
    DatabaseFinding, DatasourceFinding, DbLinkFinding, DeployedApp, Domain,
    HardCodedIpFinding, InstanceKey, InventoryId, MiddlewareFinding,
    MiddlewareHint, MiddlewareInstanceFinding, PackagingKind, ProcessId,
    ProcessStatus, ProjectId, SchemaFinding, ServerFinding, WorkItem,
};

const PROJECT: i64 = 1;
const INVENTORY: i64 = 10;

fn work_item(process_id: i64, domain: Domain, detail_type: &str) -> WorkItem {
    WorkItem {
        process_id: ProcessId::new(process_id),
        project_id: ProjectId::new(PROJECT),
        inventory_id: InventoryId::new(INVENTORY),
        domain,
        detail_type: detail_type.to_owned(),
        version_hint: None,
        connection: ConnectionDescriptor {
            ip_address: "10.20.0.5".into(),
            port: Some(22),
            username: Some("assess".into()),
            password: None,
            key_file: Some("/keys/assess.pem".into()),
            windows: false,
        },
        database: None,
        middleware: None,
        application: None,
        submitted_at: Utc::now(),
    }
}

fn ubuntu_finding() -> ServerFinding {
    ServerFinding {
        hostname: "web01".into(),
        os_name: "Ubuntu 20.04.3 LTS".into(),
        os_version: "20.04".into(),
        os_family: "UBUNTU".into(),
        cpu_cores: Some(8),
        memory_mb: Some(16384),
        admin: AdminProbe {
            sudoer: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

// Scan components scripted per test.

struct FixedServerRunner {
    finding: ServerFinding,
    scans: AtomicUsize,
}

impl FixedServerRunner {
    fn new(finding: ServerFinding) -> Self {
        FixedServerRunner {
            finding,
            scans: AtomicUsize::new(0),
        }
    }

    fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServerScanRunner for FixedServerRunner {
    async fn scan(
        &self,
        _connection: &ConnectionDescriptor,
        _item: &WorkItem,
    ) -> Result<ServerFinding> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(self.finding.clone())
    }
}

/// Requests its own cancellation mid-scan, landing exactly between Execute
/// and the post-processing checkpoint.
struct CancelDuringScan {
    finding: ServerFinding,
    cancellations: OnceLock<CancellationRegistry>,
}

#[async_trait]
impl ServerScanRunner for CancelDuringScan {
    async fn scan(
        &self,
        _connection: &ConnectionDescriptor,
        item: &WorkItem,
    ) -> Result<ServerFinding> {
        if let Some(registry) = self.cancellations.get() {
            registry.request_cancel(item.process_id);
        }
        Ok(self.finding.clone())
    }
}

struct FixedMiddlewareRunner {
    finding: MiddlewareFinding,
}

#[async_trait]
impl MiddlewareScanRunner for FixedMiddlewareRunner {
    async fn scan(
        &self,
        _connection: &ConnectionDescriptor,
        _item: &WorkItem,
    ) -> Result<MiddlewareFinding> {
        Ok(self.finding.clone())
    }
}

struct UnreachableMiddlewareRunner;

#[async_trait]
impl MiddlewareScanRunner for UnreachableMiddlewareRunner {
    async fn scan(
        &self,
        _connection: &ConnectionDescriptor,
        _item: &WorkItem,
    ) -> Result<MiddlewareFinding> {
        Err(AssessError::Connection("connection refused".into()))
    }
}

struct FixedDatabaseRunner {
    finding: DatabaseFinding,
}

#[async_trait]
impl DatabaseScanRunner for FixedDatabaseRunner {
    async fn scan(&self, _item: &WorkItem) -> Result<DatabaseFinding> {
        Ok(self.finding.clone())
    }
}

struct FixedApplicationRunner {
    finding: ApplicationFinding,
}

#[async_trait]
impl ApplicationScanRunner for FixedApplicationRunner {
    async fn scan(
        &self,
        _connection: &ConnectionDescriptor,
        _item: &WorkItem,
        _work_dir: &Path,
    ) -> Result<ApplicationFinding> {
        Ok(self.finding.clone())
    }
}

/// Remote executor answering the admin probe and replaying queued command
/// outputs, exhausted outputs come back empty and successful.
struct ScriptedExecutor {
    admin: bool,
    outputs: Mutex<VecDeque<CommandOutput>>,
}

impl ScriptedExecutor {
    fn with_admin() -> Self {
        ScriptedExecutor {
            admin: true,
            outputs: Mutex::new(VecDeque::new()),
        }
    }

    fn without_admin() -> Self {
        ScriptedExecutor {
            admin: false,
            outputs: Mutex::new(VecDeque::new()),
        }
    }

    fn scripted(outputs: Vec<&str>) -> Self {
        ScriptedExecutor {
            admin: true,
            outputs: Mutex::new(
                outputs
                    .into_iter()
                    .map(|stdout| CommandOutput {
                        stdout: stdout.to_owned(),
                        ..Default::default()
                    })
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _connection: &ConnectionDescriptor,
        _command: &str,
    ) -> Result<CommandOutput> {
        Ok(self
            .outputs
            .lock()
            .expect("executor outputs")
            .pop_front()
            .unwrap_or_default())
    }

    async fn probe_admin(&self, _connection: &ConnectionDescriptor) -> Result<bool> {
        Ok(self.admin)
    }
}

// Outbound recorders.

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<AssessmentEvent>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<AssessmentEvent> {
        self.events.lock().expect("events").clone()
    }
}

#[async_trait]
impl NotificationPublisher for RecordingNotifier {
    async fn publish(&self, event: AssessmentEvent) {
        self.events.lock().expect("events").push(event);
    }
}

#[derive(Default)]
struct RecordingTrigger {
    fired: Mutex<Vec<(ProcessStatus, Option<String>, bool)>>,
}

impl RecordingTrigger {
    fn fired(&self) -> Vec<(ProcessStatus, Option<String>, bool)> {
        self.fired.lock().expect("fired").clone()
    }
}

#[async_trait]
impl ReportTrigger for RecordingTrigger {
    async fn fire(
        &self,
        _item: &WorkItem,
        _report_path: Option<&Path>,
        status: ProcessStatus,
        message: Option<&str>,
        report_eligible: bool,
    ) -> Result<()> {
        self.fired.lock().expect("fired").push((
            status,
            message.map(str::to_owned),
            report_eligible,
        ));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingQueue {
    middleware: Mutex<Vec<String>>,
    applications: Mutex<Vec<String>>,
}

impl RecordingQueue {
    fn middleware(&self) -> Vec<String> {
        self.middleware.lock().expect("middleware queue").clone()
    }

    fn applications(&self) -> Vec<String> {
        self.applications.lock().expect("application queue").clone()
    }
}

#[async_trait]
impl FollowOnQueue for RecordingQueue {
    async fn enqueue_middleware(
        &self,
        _origin: &WorkItem,
        hint: &MiddlewareHint,
    ) -> Result<()> {
        self.middleware
            .lock()
            .expect("middleware queue")
            .push(hint.detail_type.clone());
        Ok(())
    }

    async fn enqueue_application(&self, _origin: &WorkItem, app: &DeployedApp) -> Result<()> {
        self.applications
            .lock()
            .expect("application queue")
            .push(app.name.clone());
        Ok(())
    }
}

struct Harness {
    dispatcher: WorkDispatcher,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    trigger: Arc<RecordingTrigger>,
    queue: Arc<RecordingQueue>,
    _work_dir: tempfile::TempDir,
}

impl Harness {
    async fn run(&self, item: &WorkItem) -> ProcessStatus {
        self.store.register(item).await.expect("register");
        self.dispatcher.dispatch(item).await
    }

    fn finished_event(&self) -> AssessmentEvent {
        self.notifier
            .events()
            .into_iter()
            .filter(|event| event.phase == EventPhase::Finished)
            .next_back()
            .expect("finished event")
    }
}

fn build_harness(
    components: ScanComponents,
    executor: Arc<dyn RemoteExecutor>,
    middleware_auto_scan: bool,
    application_auto_scan: bool,
) -> Harness {
    let work_dir = tempfile::tempdir().expect("work dir");
    let settings = EngineSettings {
        work_dir: work_dir.path().to_path_buf(),
        middleware_auto_scan,
        application_auto_scan,
    };
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let trigger = Arc::new(RecordingTrigger::default());
    let queue = Arc::new(RecordingQueue::default());
    let core = PipelineCore::new(
        settings,
        components,
        executor,
        Arc::new(ItemConnectionResolver),
        store.clone(),
        store.clone(),
        store.clone(),
        trigger.clone(),
        queue.clone(),
        notifier.clone(),
    );
    Harness {
        dispatcher: WorkDispatcher::new(Arc::new(core)),
        store,
        notifier,
        trigger,
        queue,
        _work_dir: work_dir,
    }
}

fn harness(components: ScanComponents, executor: Arc<dyn RemoteExecutor>) -> Harness {
    build_harness(components, executor, true, true)
}

#[tokio::test]
async fn completed_server_run_persists_profile_and_snapshot() {
    let mut components = ScanComponents::default();
    components.servers.register(
        ComponentKey::bare("LINUX"),
        Arc::new(FixedServerRunner::new(ubuntu_finding())),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));
    let item = work_item(100, Domain::Server, "LINUX");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::Completed);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(record.status, ProcessStatus::Completed);
    assert!(record.started_at.is_some());
    assert!(record.finished_at.is_some());
    assert!(record.report_eligible);
    assert_eq!(record.message, None);

    let report_path = record.report_path.expect("snapshot path");
    assert!(report_path.contains("migrex_svr_assessment_linux_"));
    assert!(Path::new(&report_path).exists());

    let profile = harness
        .store
        .server_profile(item.inventory_id)
        .expect("server profile");
    assert_eq!(profile.hostname, "web01");

    assert_eq!(
        harness.trigger.fired(),
        vec![(ProcessStatus::Completed, None, true)]
    );
    let phases: Vec<EventPhase> = harness
        .notifier
        .events()
        .iter()
        .map(|event| event.phase)
        .collect();
    assert_eq!(phases, vec![EventPhase::Started, EventPhase::Finished]);
}

#[tokio::test]
async fn soft_command_errors_downgrade_the_run() {
    let mut finding = ubuntu_finding();
    finding
        .error_map
        .insert("collect_cpu".into(), "command timed out".into());

    let mut components = ScanComponents::default();
    components.servers.register(
        ComponentKey::bare("LINUX"),
        Arc::new(FixedServerRunner::new(finding)),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));
    let item = work_item(101, Domain::Server, "LINUX");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::PartiallyCompleted);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(record.message.as_deref(), Some(SOFT_ERROR_MESSAGE));
    // Soft errors report what they could collect.
    assert!(record.report_eligible);
    assert!(record.report_path.is_some());
}

#[tokio::test]
async fn missing_admin_rights_downgrade_the_run() {
    let mut components = ScanComponents::default();
    components.servers.register(
        ComponentKey::bare("LINUX"),
        Arc::new(FixedServerRunner::new(ubuntu_finding())),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::without_admin()));
    let item = work_item(102, Domain::Server, "LINUX");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::PartiallyCompleted);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(
        record.message.as_deref(),
        Some("User haven't administrator privileges.")
    );
}

#[tokio::test]
async fn unknown_os_family_is_not_supported() {
    let harness = harness(
        ScanComponents::default(),
        Arc::new(ScriptedExecutor::with_admin()),
    );
    let item = work_item(103, Domain::Server, "HPUX");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::NotSupported);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(
        record.message.as_deref(),
        Some("Scan cannot be performed. It is not supported OS.")
    );
    assert!(!record.report_eligible);
    assert_eq!(record.report_path, None);
    assert_eq!(
        harness.trigger.fired(),
        vec![(
            ProcessStatus::NotSupported,
            Some("Scan cannot be performed. It is not supported OS.".into()),
            false
        )]
    );
}

#[tokio::test]
async fn untested_os_version_gets_an_advisory() {
    let mut finding = ubuntu_finding();
    finding.os_version = "12.04".into();

    let mut components = ScanComponents::default();
    components.servers.register(
        ComponentKey::bare("LINUX"),
        Arc::new(FixedServerRunner::new(finding)),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));
    let item = work_item(104, Domain::Server, "LINUX");

    let status = harness.run(&item).await;
    // Advisory only: the scan still counts as complete.
    assert_eq!(status, ProcessStatus::Completed);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(
        record.message.as_deref(),
        Some("Not tested OS version, some information may be missing.")
    );
}

#[tokio::test]
async fn insufficient_connection_fails_before_scanning() {
    let runner = Arc::new(FixedServerRunner::new(ubuntu_finding()));
    let mut components = ScanComponents::default();
    components
        .servers
        .register(ComponentKey::bare("LINUX"), runner.clone());
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));

    let mut item = work_item(105, Domain::Server, "LINUX");
    item.connection.key_file = None;

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::Failed);
    assert_eq!(runner.scan_count(), 0);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(record.message.as_deref(), Some(INSUFFICIENT_CONNECTION_MESSAGE));
}

#[tokio::test]
async fn cancel_before_start_skips_the_run() {
    let runner = Arc::new(FixedServerRunner::new(ubuntu_finding()));
    let mut components = ScanComponents::default();
    components
        .servers
        .register(ComponentKey::bare("LINUX"), runner.clone());
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));
    let item = work_item(106, Domain::Server, "LINUX");

    harness.store.register(&item).await.expect("register");
    harness
        .dispatcher
        .core()
        .cancellations
        .request_cancel(item.process_id);

    let status = harness.dispatcher.dispatch(&item).await;
    assert_eq!(status, ProcessStatus::Cancelled);
    assert_eq!(runner.scan_count(), 0);
    assert_eq!(harness.store.graph_write_count(), 0);

    // The skipped run still persists its terminal status.
    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(record.status, ProcessStatus::Cancelled);
    assert!(record.finished_at.is_some());

    let phases: Vec<EventPhase> = harness
        .notifier
        .events()
        .iter()
        .map(|event| event.phase)
        .collect();
    assert_eq!(phases, vec![EventPhase::Finished]);
}

#[tokio::test]
async fn cancel_during_the_run_writes_nothing() {
    let runner = Arc::new(CancelDuringScan {
        finding: ubuntu_finding(),
        cancellations: OnceLock::new(),
    });
    let mut components = ScanComponents::default();
    components
        .servers
        .register(ComponentKey::bare("LINUX"), runner.clone());
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));
    runner
        .cancellations
        .set(harness.dispatcher.core().cancellations.clone())
        .expect("wire registry");

    let item = work_item(107, Domain::Server, "LINUX");
    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::Cancelled);

    // Nothing reached the graph or the commit path.
    assert_eq!(harness.store.graph_write_count(), 0);
    assert!(harness.trigger.fired().is_empty());

    // The cancel route owns the status row; the dispatcher leaves it alone.
    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(record.status, ProcessStatus::InProgress);
    assert_eq!(record.message, None);
    assert_eq!(record.report_path, None);

    let finished = harness.finished_event();
    assert_eq!(finished.status, ProcessStatus::Cancelled);
}

#[tokio::test]
async fn middleware_follow_ons_respect_the_auto_scan_switch() {
    let mut finding = ubuntu_finding();
    finding.middleware_hints.push(MiddlewareHint {
        detail_type: "TOMCAT".into(),
        install_path: "/opt/tomcat".into(),
        version: Some("9.0.82".into()),
    });

    for (auto_scan, expected) in [(true, 1), (false, 0)] {
        let mut components = ScanComponents::default();
        components.servers.register(
            ComponentKey::bare("LINUX"),
            Arc::new(FixedServerRunner::new(finding.clone())),
        );
        let harness = build_harness(
            components,
            Arc::new(ScriptedExecutor::with_admin()),
            auto_scan,
            true,
        );
        let item = work_item(108, Domain::Server, "LINUX");

        let status = harness.run(&item).await;
        assert_eq!(status, ProcessStatus::Completed);
        assert_eq!(harness.queue.middleware().len(), expected);
    }
}

#[tokio::test]
async fn etc_middleware_rows_are_rejected() {
    let harness = harness(
        ScanComponents::default(),
        Arc::new(ScriptedExecutor::with_admin()),
    );
    let item = work_item(110, Domain::Middleware, "ETC");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::NotSupported);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(
        record.message.as_deref(),
        Some("Inventory Detail Type Code(ETC) does not supported.")
    );
}

#[tokio::test]
async fn containerized_middleware_reads_as_policy_not_failure() {
    let mut components = ScanComponents::default();
    components.middlewares.register(
        ComponentKey::bare("TOMCAT"),
        Arc::new(UnreachableMiddlewareRunner),
    );
    // First probe finds the engine pid, second finds a docker cgroup.
    let executor = ScriptedExecutor::scripted(vec![
        "1234\n",
        "1234 12:memory:/docker/51bc5e3a9f\n",
    ]);
    let harness = harness(components, Arc::new(executor));
    let item = work_item(111, Domain::Middleware, "TOMCAT");

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::NotSupported);

    let record = harness
        .store
        .fetch(item.process_id)
        .await
        .expect("fetch")
        .expect("record");
    assert_eq!(
        record.message.as_deref(),
        Some("Scan of middleware running as Docker containers is not yet supported.")
    );
}

fn tomcat_finding() -> MiddlewareFinding {
    MiddlewareFinding {
        engine_name: "Tomcat".into(),
        engine_version: Some("9.0.82".into()),
        vendor: Some("Apache".into()),
        java_version: Some("11.0.20".into()),
        instances: vec![MiddlewareInstanceFinding {
            name: "catalina".into(),
            instance_path: Some("/opt/tomcat".into()),
            config_path: Some("/opt/tomcat/conf".into()),
            run_user: Some("tomcat".into()),
            java_version: Some("11.0.20".into()),
            running: true,
            datasources: vec![DatasourceFinding {
                name: "jdbc/orders".into(),
                jdbc_url: "jdbc:mysql://10.20.0.40:3306/orders".into(),
                username: Some("app".into()),
            }],
            deployed_apps: vec![DeployedApp {
                name: "orders".into(),
                deploy_path: "/opt/tomcat/webapps/orders".into(),
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[tokio::test]
async fn middleware_merge_is_idempotent_across_reruns() {
    let mut components = ScanComponents::default();
    components.middlewares.register(
        ComponentKey::bare("TOMCAT"),
        Arc::new(FixedMiddlewareRunner {
            finding: tomcat_finding(),
        }),
    );
    components
        .middleware_post
        .register(ComponentKey::bare("TOMCAT"), Arc::new(StandardMiddlewarePlanner));
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));

    let first = work_item(120, Domain::Middleware, "TOMCAT");
    let status = harness.run(&first).await;
    assert_eq!(status, ProcessStatus::Completed);

    // One engine instance plus the database its datasource points at.
    let instances = harness
        .store
        .list_instances(first.project_id)
        .await
        .expect("list");
    assert_eq!(instances.len(), 2);
    assert_eq!(harness.queue.applications(), vec!["orders".to_owned()]);

    let finished = harness.finished_event();
    assert_eq!(finished.engine_version.as_deref(), Some("9.0.82"));
    assert_eq!(finished.instance_count, Some(1));

    let second = work_item(121, Domain::Middleware, "TOMCAT");
    let status = harness.run(&second).await;
    assert_eq!(status, ProcessStatus::Completed);

    let instances = harness
        .store
        .list_instances(first.project_id)
        .await
        .expect("list");
    assert_eq!(instances.len(), 2, "rescan must merge, not duplicate");

    let engine = harness
        .store
        .find_instance(&InstanceKey::new(first.project_id, "10.20.0.5", "/opt/tomcat"))
        .await
        .expect("find")
        .expect("engine instance");
    assert_eq!(engine.last_process_id, Some(second.process_id));
    assert_eq!(engine.version.as_deref(), Some("9.0.82"));

    let runtime = harness
        .store
        .middleware_runtime(engine.id)
        .expect("runtime row");
    assert_eq!(runtime.run_user.as_deref(), Some("tomcat"));

    let interfaces = harness
        .store
        .list_interfaces(engine.id)
        .await
        .expect("interfaces");
    assert_eq!(interfaces.len(), 1);
    assert_eq!(interfaces[0].endpoints[0].username.as_deref(), Some("app"));

    assert_eq!(
        harness.store.middleware_engine(first.inventory_id),
        Some(("9.0.82".to_owned(), String::new(), "11.0.20".to_owned()))
    );
}

#[tokio::test]
async fn database_schemas_merge_with_census_and_links() {
    let finding = DatabaseFinding {
        engine_version: Some("19.3.0.0.0".into()),
        schemas: vec![
            SchemaFinding {
                name: "SALES".into(),
                table_count: Some(120),
                view_count: Some(14),
                procedure_count: Some(33),
            },
            SchemaFinding {
                name: "HR".into(),
                ..Default::default()
            },
        ],
        db_links: vec![DbLinkFinding {
            name: "REPORTING".into(),
            host: "10.20.0.41".into(),
            port: Some(1521),
            service_name: Some("DWH".into()),
        }],
        ..Default::default()
    };

    let mut components = ScanComponents::default();
    components.databases.register(
        ComponentKey::bare("ORACLE"),
        Arc::new(FixedDatabaseRunner { finding }),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));

    let mut item = work_item(130, Domain::Database, "ORACLE");
    item.connection.port = Some(1521);

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::Completed);

    assert_eq!(
        harness.store.database_engine(item.inventory_id).as_deref(),
        Some("19.3.0.0.0")
    );

    let sales = harness
        .store
        .find_instance(&InstanceKey::new(item.project_id, "10.20.0.5", "1521|SALES"))
        .await
        .expect("find")
        .expect("sales schema instance");
    let census = harness.store.schema_census(sales.id).expect("census");
    assert_eq!(census.table_count, Some(120));

    let links = harness
        .store
        .list_interfaces(sales.id)
        .await
        .expect("interfaces");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].full_descriptor, "REPORTING@10.20.0.41:1521/DWH");

    let finished = harness.finished_event();
    assert_eq!(finished.instance_count, Some(2));
}

#[tokio::test]
async fn application_run_backfills_profile_and_merges_datasources() {
    let finding = ApplicationFinding {
        language: Some("java".into()),
        kinds: vec!["web".into()],
        libraries: vec![
            "commons-io-2.11.0.jar".into(),
            "spring-boot-2.7.5.jar".into(),
        ],
        build_descriptors: vec!["<endpoint>HTTPS://pay.example.com/api</endpoint>".into()],
        jdbc_urls: vec!["jdbc:oracle:thin:@10.20.0.60:1521:ORCL".into()],
        hard_coded_ips: vec![HardCodedIpFinding {
            file_path: "/work/unpack/config/app.properties".into(),
            line_number: 12,
            ip_address: "10.9.9.9".into(),
            port: Some(8080),
        }],
        ..Default::default()
    };

    let mut components = ScanComponents::default();
    components.applications.register(
        ComponentKey::bare("JAVA"),
        Arc::new(FixedApplicationRunner { finding }),
    );
    let harness = harness(components, Arc::new(ScriptedExecutor::with_admin()));

    let mut item = work_item(140, Domain::Application, "WAR");
    item.application = Some(ApplicationTarget {
        deploy_path: "/srv/apps/orders".into(),
        upload_source_path: None,
    });

    let status = harness.run(&item).await;
    assert_eq!(status, ProcessStatus::Completed);

    let profile = harness
        .store
        .application_profile(item.inventory_id)
        .expect("application profile");
    assert_eq!(profile.packaging, PackagingKind::War);
    assert_eq!(profile.framework.as_deref(), Some("Spring Boot 2.7.5"));
    assert!(profile.https_used);

    let recorded = harness.store.hard_coded_ips_for(item.inventory_id);
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].file_path, "app.properties");

    // The application instance plus the Oracle endpoint its JDBC URL names.
    let instances = harness
        .store
        .list_instances(item.project_id)
        .await
        .expect("list");
    assert_eq!(instances.len(), 2);

    let app = harness
        .store
        .find_instance(&InstanceKey::new(
            item.project_id,
            "10.20.0.5",
            "/srv/apps/orders",
        ))
        .await
        .expect("find")
        .expect("application instance");
    let interfaces = harness
        .store
        .list_interfaces(app.id)
        .await
        .expect("interfaces");
    assert_eq!(interfaces.len(), 1);
    assert_eq!(
        interfaces[0].full_descriptor,
        "jdbc:oracle:thin:@10.20.0.60:1521:ORCL"
    );

    let oracle = harness
        .store
        .find_instance(&InstanceKey::new(item.project_id, "10.20.0.60", "1521|ORCL"))
        .await
        .expect("find")
        .expect("discovered database");
    assert_eq!(oracle.owner_inventory_id, None);
    assert_eq!(oracle.finder_inventory_id, Some(item.inventory_id));
}
