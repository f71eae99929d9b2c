//! Scheduled retention sweep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::audit::{AuditEvent, AuditLogger, RiskLevel};
use crate::config::RetentionConfig;
use crate::observability::metrics;
use crate::resilience::CollaboratorError;
use crate::store::RecordStore;

/// Who asked for a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepTrigger {
    Scheduled,
    Manual { actor: String },
}

impl SweepTrigger {
    fn is_automated(&self) -> bool {
        matches!(self, SweepTrigger::Scheduled)
    }
}

/// Summary of one completed sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub marked: u64,
    pub automated: bool,
    pub triggered_by: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("retention sweep already in progress")]
    AlreadyRunning,

    #[error("retention sweep failed: {0}")]
    Store(#[from] CollaboratorError),
}

/// Clears the in-progress flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RetentionSweeper {
    store: Arc<dyn RecordStore>,
    audit: AuditLogger,
    config: RetentionConfig,
    running: AtomicBool,
    last_report: ArcSwapOption<SweepReport>,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn RecordStore>, audit: AuditLogger, config: RetentionConfig) -> Self {
        Self {
            store,
            audit,
            config,
            running: AtomicBool::new(false),
            last_report: ArcSwapOption::empty(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn last_report(&self) -> Option<Arc<SweepReport>> {
        self.last_report.load_full()
    }

    /// Run one sweep. A run already in progress makes this return
    /// [`SweepError::AlreadyRunning`] without touching the store.
    pub async fn run_once(&self, trigger: SweepTrigger) -> Result<SweepReport, SweepError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(trigger = ?trigger, "Retention sweep already running, skipping");
            metrics::record_retention_run("skipped");
            return Err(SweepError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let started_at = Utc::now();
        let marked = match self.store.mark_for_deletion().await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, trigger = ?trigger, "Retention sweep failed, skipping this run");
                metrics::record_retention_run("failed");
                return Err(SweepError::Store(e));
            }
        };

        let automated = trigger.is_automated();
        let triggered_by = match &trigger {
            SweepTrigger::Manual { actor } => Some(actor.clone()),
            SweepTrigger::Scheduled => None,
        };

        let mut event = AuditEvent::new("data_retention_cleanup", "retention")
            .risk(RiskLevel::Low)
            .meta("count", marked)
            .meta("automated", automated);
        if let Some(actor) = &triggered_by {
            event = event.actor(actor.as_str());
        }
        self.audit.record(event).await;

        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            marked,
            automated,
            triggered_by,
        };
        self.last_report.store(Some(Arc::new(report.clone())));
        metrics::record_retention_run("completed");
        tracing::info!(marked, automated, "Retention sweep completed");
        Ok(report)
    }

    /// Timer loop. Exits when the shutdown signal fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Retention sweeper disabled");
            return;
        }

        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let start = Instant::now() + Duration::from_secs(self.config.initial_delay_secs);
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            interval_secs = self.config.interval_secs,
            initial_delay_secs = self.config.initial_delay_secs,
            "Retention sweeper starting"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are already logged; the next tick is the retry.
                    let _ = self.run_once(SweepTrigger::Scheduled).await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Retention sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
