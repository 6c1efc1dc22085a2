///! Update orchestrator and scheduled passes
///!
///! Connectors are grouped by cadence class:
///! - regular passes (incidence) fire at `regular_minute` past every hour
///! - frequent passes (R value, vaccination, hospitalization) at `frequent_minute`
///!
///! A pass runs its connectors one after another; every accepted result is
///! persisted before the next connector sees the state.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::connector::{CadenceClass, Connector, NoChangeReason, UpdateOutcome};
use super::store::StateStore;
use crate::config::ScheduleConfig;
use crate::error::EngineError;

/// Summary of one pass
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub cadence: CadenceClass,
    pub updated: Vec<&'static str>,
    pub unchanged: Vec<(&'static str, NoChangeReason)>,
    pub failed: Vec<(&'static str, String)>,
    /// Another pass of the same class was still running
    pub skipped: bool,
    pub duration: Duration,
}

impl PassReport {
    fn new(cadence: CadenceClass) -> Self {
        Self {
            cadence,
            updated: Vec::new(),
            unchanged: Vec::new(),
            failed: Vec::new(),
            skipped: false,
            duration: Duration::ZERO,
        }
    }
}

/// Clears the in-progress flag when the pass ends, even on cancellation
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Orchestrator {
    store: Arc<StateStore>,
    connectors: Vec<Arc<dyn Connector>>,
    connector_timeout: Duration,
    regular_running: AtomicBool,
    frequent_running: AtomicBool,
    /// Serializes read-update-persist across cadence classes
    mutation_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<StateStore>,
        connectors: Vec<Arc<dyn Connector>>,
        connector_timeout: Duration,
    ) -> Self {
        Self {
            store,
            connectors,
            connector_timeout,
            regular_running: AtomicBool::new(false),
            frequent_running: AtomicBool::new(false),
            mutation_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    fn running_flag(&self, cadence: CadenceClass) -> &AtomicBool {
        match cadence {
            CadenceClass::Regular => &self.regular_running,
            CadenceClass::Frequent => &self.frequent_running,
        }
    }

    /// Run every connector of `cadence` once, in registration order.
    pub async fn run_pass(&self, cadence: CadenceClass) -> PassReport {
        let mut report = PassReport::new(cadence);

        let flag = self.running_flag(cadence);
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Previous {} pass still running, skipping", cadence);
            report.skipped = true;
            return report;
        }
        let _guard = PassGuard(flag);

        let started = Instant::now();
        tracing::info!("Starting {} update pass", cadence);

        for connector in self.connectors.iter().filter(|c| c.cadence() == cadence) {
            let id = connector.id();
            let _lock = self.mutation_lock.lock().await;

            let previous = self.store.read();
            match self.invoke(connector.clone(), previous).await {
                UpdateOutcome::Updated(state) => match self.store.update(*state).await {
                    Ok(_) => {
                        tracing::info!("{} Update persisted", id);
                        report.updated.push(id);
                    }
                    Err(e) => {
                        tracing::error!("{} Update could not be persisted: {}", id, e);
                        report.failed.push((id, e.to_string()));
                    }
                },
                UpdateOutcome::NoChange(reason) => {
                    tracing::info!("{} No update ({})", id, reason);
                    report.unchanged.push((id, reason));
                }
                UpdateOutcome::Failed(e) => {
                    tracing::error!("{} Update failed [{}]: {}", id, e.category(), e);
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        report.duration = started.elapsed();
        tracing::info!(
            "Finished {} pass in {:.1}s: {} updated, {} unchanged, {} failed",
            cadence,
            report.duration.as_secs_f64(),
            report.updated.len(),
            report.unchanged.len(),
            report.failed.len()
        );
        report
    }

    /// Run one connector in its own task, bounded by the connector timeout
    async fn invoke(
        &self,
        connector: Arc<dyn Connector>,
        previous: Option<Arc<corona_common::CoronaState>>,
    ) -> UpdateOutcome {
        let id = connector.id();
        let mut handle = tokio::spawn(async move { connector.update(previous).await });

        match tokio::time::timeout(self.connector_timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => UpdateOutcome::Failed(EngineError::Aborted {
                connector: id,
                message: format!("task failed: {}", e),
            }),
            Err(_) => {
                handle.abort();
                UpdateOutcome::Failed(EngineError::Aborted {
                    connector: id,
                    message: format!("timed out after {} seconds", self.connector_timeout.as_secs()),
                })
            }
        }
    }
}

/// Drives the two cadence loops
pub struct ScheduledTaskManager {
    config: ScheduleConfig,
    orchestrator: Arc<Orchestrator>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    pub fn new(config: ScheduleConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            task_handles: Vec::new(),
        }
    }

    /// Start the initial pass (if configured) and both cadence loops
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        if self.config.perform_initial_update {
            let orchestrator = self.orchestrator.clone();
            self.task_handles.push(tokio::spawn(async move {
                tracing::info!("Performing initial update...");
                orchestrator.run_pass(CadenceClass::Regular).await;
                orchestrator.run_pass(CadenceClass::Frequent).await;
            }));
        }

        self.start_cadence_task(CadenceClass::Regular, self.config.regular_minute);
        self.start_cadence_task(CadenceClass::Frequent, self.config.frequent_minute);

        tracing::info!(
            "Started {} scheduled tasks (regular at :{:02}, frequent at :{:02})",
            self.task_handles.len(),
            self.config.regular_minute,
            self.config.frequent_minute
        );
    }

    fn start_cadence_task(&mut self, cadence: CadenceClass, minute: u32) {
        let orchestrator = self.orchestrator.clone();
        tracing::info!("Scheduling {} passes at minute {:02} of every hour", cadence, minute);

        let handle = tokio::spawn(async move {
            Self::cadence_loop(orchestrator, cadence, minute).await;
        });
        self.task_handles.push(handle);
    }

    async fn cadence_loop(orchestrator: Arc<Orchestrator>, cadence: CadenceClass, minute: u32) {
        loop {
            let now = Utc::now();
            let next_trigger = Self::calculate_next_trigger(now, minute);
            let sleep_duration = (next_trigger - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));

            tracing::info!(
                "Next {} pass at: {} (in {:.1} min)",
                cadence,
                next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                sleep_duration.as_secs_f64() / 60.0
            );

            tokio::time::sleep(sleep_duration).await;
            orchestrator.run_pass(cadence).await;
        }
    }

    /// Next instant strictly after `now` at `minute` past the hour
    fn calculate_next_trigger(now: DateTime<Utc>, minute: u32) -> DateTime<Utc> {
        let this_hour = now
            .with_minute(minute)
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0));

        match this_hour {
            Some(trigger) if trigger > now => trigger,
            Some(trigger) => trigger + ChronoDuration::hours(1),
            None => now + ChronoDuration::hours(1),
        }
    }

    /// Abort all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}
