use std::sync::Arc;

use tracing::info;

use chronod_engine::{
    jobs::{ActivityReportJob, BackupDatabaseJob},
    Dispatcher, MaintenanceJob, RegistryBuilder, SchedulerService,
};
use chronod_store::ScheduleStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chronod=info".into()),
        )
        .init();

    // load config: explicit path via CHRONOD_CONFIG > ~/.chronod/chronod.toml
    let config_path = std::env::var("CHRONOD_CONFIG").ok();
    let config = chronod_core::ChronodConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        chronod_core::ChronodConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = Arc::new(ScheduleStore::new(db)?);

    // closed registry: every dispatchable job is bound here, at startup
    let registry = Arc::new(
        RegistryBuilder::new()
            .register(Arc::new(BackupDatabaseJob::new(
                Arc::clone(&store),
                &config.backup,
            )))?
            .register(Arc::new(ActivityReportJob::new(Arc::clone(&store))))?
            .register(Arc::new(MaintenanceJob::new(
                Arc::clone(&store),
                &config.maintenance,
            )))?
            .build(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let dispatcher = Dispatcher::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        &config.dispatcher,
        shutdown_rx,
    );

    let service = SchedulerService::new(Arc::clone(&store), registry, dispatcher.handle());
    let seeded = service.install_defaults()?;
    if seeded > 0 {
        info!(seeded, "seeded default job definitions (disabled; enable to opt in)");
    }

    let loop_task = tokio::spawn(dispatcher.run());
    info!("chronod running; press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    let _ = loop_task.await;

    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
