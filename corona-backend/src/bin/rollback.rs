//! Roll the persisted incidence data back by one day.
//!
//! Used to undo a bad incidence update by hand. The previous version is
//! kept as backup like for any other update.

use corona_backend::config;
use corona_backend::module::rollback::rollback_one_day;
use corona_backend::module::store::StateStore;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    config::read_config()?;
    let config = config::CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Configuration not initialized"))?;

    let _logging_guard = corona_backend::logging::init_logging(
        &config.log_dir,
        "corona-rollback",
        &config.log_level,
    )?;

    let store = StateStore::load(&config.data_file, &config.backup_file).await;
    let current = store
        .read()
        .filter(|state| state.has_incidence())
        .ok_or_else(|| anyhow::anyhow!("No incidence data in {}", store.data_file().display()))?;

    let mut state = current.as_ref().clone();
    let from = state.source_updated_at;
    rollback_one_day(&mut state);
    let to = state.source_updated_at;

    store.update(state).await?;
    tracing::info!(
        "Rolled back {} from {:?} to {:?}, previous version saved to {}",
        store.data_file().display(),
        from,
        to,
        store.backup_file().display()
    );

    Ok(())
}
