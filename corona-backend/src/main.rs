use corona_backend::config;
use corona_backend::module::connector::Connector;
use corona_backend::module::feed::{FeedClient, HttpFeedClient};
use corona_backend::module::hospitalization::HospitalizationConnector;
use corona_backend::module::incidence::IncidenceConnector;
use corona_backend::module::rvalue::RValueConnector;
use corona_backend::module::scheduled::{Orchestrator, ScheduledTaskManager};
use corona_backend::module::store::StateStore;
use corona_backend::module::vaccination::VaccinationConnector;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    config::read_config()?;
    let config = config::CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Configuration not initialized"))?;

    // Initialize logging
    let _logging_guard = corona_backend::logging::init_logging(
        &config.log_dir,
        "corona-backend",
        &config.log_level,
    )?;

    tracing::info!("Corona backend starting...");
    tracing::info!(
        "Cached data: {} (backup {})",
        config.data_file,
        config.backup_file
    );

    let store = Arc::new(StateStore::load(&config.data_file, &config.backup_file).await);

    let client: Arc<dyn FeedClient> = Arc::new(HttpFeedClient::new(
        Duration::from_secs(config.http_timeout_secs),
        &config.user_agent,
    )?);

    // Registration order is execution order within a pass
    let connectors: Vec<Arc<dyn Connector>> = vec![
        Arc::new(IncidenceConnector::new(client.clone(), &config.feeds.incidence)),
        Arc::new(RValueConnector::new(client.clone(), &config.feeds.reproduction_number)),
        Arc::new(VaccinationConnector::new(client.clone(), &config.feeds.vaccination)),
        Arc::new(HospitalizationConnector::new(client, &config.feeds.hospitalization)),
    ];

    let orchestrator = Arc::new(Orchestrator::new(
        store,
        connectors,
        Duration::from_secs(config.connector_timeout_secs),
    ));

    let mut task_manager = ScheduledTaskManager::new(config.schedule.clone(), orchestrator);
    task_manager.start_all();
    tracing::info!("All scheduled tasks started successfully");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    task_manager.shutdown().await;

    Ok(())
}
