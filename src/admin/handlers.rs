use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::auth::Identity;
use crate::http::{ApiError, AppState};
use crate::retention::{SweepError, SweepReport, SweepTrigger};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub retention_running: bool,
    pub last_retention: Option<SweepReport>,
    pub rate_limit_keys: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        retention_running: state.sweeper.is_running(),
        last_retention: state.sweeper.last_report().map(|r| SweepReport::clone(&r)),
        rate_limit_keys: state.limiter.tracked_keys(),
    })
}

/// Manual retention sweep; same effect as the scheduled run.
pub async fn run_sweep(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<SweepReport>, ApiError> {
    let trigger = SweepTrigger::Manual {
        actor: identity.id.clone(),
    };
    match state.sweeper.run_once(trigger).await {
        Ok(report) => Ok(Json(report)),
        Err(SweepError::AlreadyRunning) => {
            Err(ApiError::Conflict("Retention sweep already in progress"))
        }
        Err(SweepError::Store(e)) => Err(ApiError::Unavailable(e)),
    }
}
