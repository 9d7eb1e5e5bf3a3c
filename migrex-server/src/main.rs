//! # Migrex Server
//!
//! Assessment orchestration service for migration discovery.
//!
//! ## Overview
//!
//! The server fronts the assessment engine with a small HTTP surface:
//!
//! - **Intake**: assessment submissions are registered and queued; a worker
//!   pool drains the queue through the engine pipeline
//! - **Inspection**: process rows are readable while a run is in flight and
//!   after it lands
//! - **Cancellation**: operator cancel requests flip a shared flag that the
//!   pipeline honors at its checkpoints
//! - **Monitoring**: agent resource feeds aggregate into usage windows and
//!   network feeds grow the discovery graph
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for the discovery graph and process rows, or in-memory
//!   stores when no database is configured
//! - The system `ssh` client for remote command execution

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use migrex_config::Config;
use migrex_core::merge::middleware::StandardMiddlewarePlanner;
use migrex_core::monitor::{MetricAggregator, NetworkObserver};
use migrex_core::orchestrator::{PipelineCore, ScanComponents, WorkDispatcher};
use migrex_core::ports::outbound::TracingNotifier;
use migrex_core::ports::remote::ItemConnectionResolver;
use migrex_core::ports::store::{
    GraphStore, InventoryStore, MonitoringStore, ProcessStore,
};
use migrex_core::registry::ComponentKey;
use migrex_core::settings::EngineSettings;
use migrex_core::store::{MemoryStore, PostgresStore};
use migrex_server::outbound::{
    IntakeFollowOns, ProcessIdAllocator, ReportLogger,
};
use migrex_server::remote::OpenSshExecutor;
use migrex_server::{routes, worker, AppState};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "migrex-server")]
#[command(about = "Assessment orchestration service for migration discovery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Path to the configuration file
    #[arg(long, env = "MIGREX_CONFIG")]
    config: Option<PathBuf>,

    /// Server port (overrides config)
    #[arg(short, long, env = "MIGREX_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "MIGREX_HOST")]
    host: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(command) = cli.command {
        match command {
            Command::Db(DbCommand::Migrate) => {
                run_db_migrate(&cli.serve).await?;
                return Ok(());
            }
        }
    }

    run_server(cli.serve).await
}

fn load_config(args: &ServeArgs) -> anyhow::Result<Arc<Config>> {
    let mut config = migrex_config::load(args.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }
    Ok(Arc::new(config))
}

async fn connect_postgres(config: &Config, url: &str) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    migrex_core::MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;
    Ok(pool)
}

async fn run_db_migrate(args: &ServeArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;
    let url = config
        .database
        .url
        .as_deref()
        .context("database.url must be configured to migrate")?;
    connect_postgres(&config, url).await?;
    info!("database migrations applied");
    Ok(())
}

/// Store handles split per concern; one Postgres pool or one shared
/// in-memory store backs all four.
struct Stores {
    graph: Arc<dyn GraphStore>,
    processes: Arc<dyn ProcessStore>,
    inventory: Arc<dyn InventoryStore>,
    monitoring: Arc<dyn MonitoringStore>,
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match config.database.url.as_deref() {
        Some(url) => {
            let pool = connect_postgres(config, url).await?;
            info!(
                max_connections = config.database.max_connections,
                "postgres store ready"
            );
            let store = Arc::new(PostgresStore::new(pool));
            Ok(Stores {
                graph: store.clone(),
                processes: store.clone(),
                inventory: store.clone(),
                monitoring: store,
            })
        }
        None => {
            warn!("no database.url configured, findings stay in memory");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                graph: store.clone(),
                processes: store.clone(),
                inventory: store.clone(),
                monitoring: store,
            })
        }
    }
}

/// Components shipped with the server. Scanner crates register their
/// runners here; the stock build carries the merge planners only, so an
/// unscanned detail type resolves to a clean not-supported outcome.
fn scan_components() -> ScanComponents {
    let mut components = ScanComponents::default();
    for family in [
        "APACHE",
        "TOMCAT",
        "JBOSS",
        "WEBLOGIC",
        "WEBSPHERE",
        "JEUS",
        "WEBTOB",
        "NGINX",
    ] {
        components
            .middleware_post
            .register(ComponentKey::bare(family), Arc::new(StandardMiddlewarePlanner));
    }
    components
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    info!(
        workers = config.engine.workers,
        work_dir = %config.engine.work_dir.display(),
        middleware_auto_scan = config.engine.middleware_auto_scan,
        application_auto_scan = config.engine.application_auto_scan,
        command_timeout_secs = config.engine.command_timeout_secs,
        "engine configuration loaded"
    );

    let stores = build_stores(&config).await?;
    let settings = EngineSettings {
        work_dir: config.engine.work_dir.clone(),
        middleware_auto_scan: config.engine.middleware_auto_scan,
        application_auto_scan: config.engine.application_auto_scan,
    };

    let (intake_tx, intake_rx) = tokio::sync::mpsc::channel(1024);
    let ids = Arc::new(ProcessIdAllocator::new());
    let follow_ons = Arc::new(IntakeFollowOns::new(
        intake_tx.clone(),
        stores.processes.clone(),
        ids.clone(),
    ));

    let core = Arc::new(PipelineCore::new(
        settings,
        scan_components(),
        Arc::new(OpenSshExecutor::new(config.engine.command_timeout_secs)),
        Arc::new(ItemConnectionResolver),
        stores.graph.clone(),
        stores.processes.clone(),
        stores.inventory.clone(),
        Arc::new(ReportLogger),
        follow_ons,
        Arc::new(TracingNotifier),
    ));
    let dispatcher = WorkDispatcher::new(core.clone());
    let pump = worker::spawn(dispatcher.clone(), intake_rx, config.engine.workers);

    let metrics = Arc::new(MetricAggregator::new(stores.monitoring.clone()));
    let network = Arc::new(NetworkObserver::new(
        stores.graph.clone(),
        stores.inventory.clone(),
        core.locks.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        dispatcher,
        processes: stores.processes.clone(),
        intake: intake_tx,
        metrics: metrics.clone(),
        network,
        ids,
    };

    let address: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server.host/server.port combination")?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Starting Migrex Assessment Server on {address}");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Close out partial monitoring windows; queued work that never started
    // stays pending for the next start.
    if let Err(error) = metrics.flush_all().await {
        warn!(%error, "monitoring window flush failed during shutdown");
    }
    pump.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "shutdown signal handler failed");
    }
}
