use std::sync::Arc;

use approvals_core::SnapshotStore;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    store: Arc<SnapshotStore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub tiers: usize,
    pub extensions: usize,
    pub roster_size: usize,
    pub reference_currency: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub policy: HealthCheck,
    pub snapshot: SnapshotSummary,
    pub checked_at: String,
}

pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { store })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = state.store.current();
    let summary = SnapshotSummary {
        tiers: snapshot.policy.tiers().len(),
        extensions: snapshot.extensions.len(),
        roster_size: snapshot.roster.len(),
        reference_currency: snapshot.rates.reference().code(),
    };

    let policy = if summary.tiers == 0 {
        HealthCheck { status: "degraded", detail: "policy table has no tiers".to_string() }
    } else if summary.roster_size == 0 {
        HealthCheck { status: "degraded", detail: "roster has no candidates".to_string() }
    } else {
        HealthCheck {
            status: "ready",
            detail: format!("{} tiers, {} candidates", summary.tiers, summary.roster_size),
        }
    };
    let ready = policy.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "approvals-server runtime initialized".to_string(),
        },
        policy,
        snapshot: summary,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approvals_core::{fixtures, Roster, SnapshotStore};
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, HealthState};

    #[tokio::test]
    async fn health_reports_ready_with_reference_snapshot() {
        let store = Arc::new(SnapshotStore::new(fixtures::reference_snapshot()));

        let (status, Json(payload)) = health(State(HealthState { store })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.snapshot.tiers, 5);
        assert_eq!(payload.snapshot.roster_size, 13);
        assert_eq!(payload.snapshot.reference_currency, "KRW");
    }

    #[tokio::test]
    async fn health_is_degraded_with_empty_roster() {
        let mut snapshot = fixtures::reference_snapshot();
        snapshot.roster = Roster::default();
        let store = Arc::new(SnapshotStore::new(snapshot));

        let (status, Json(payload)) = health(State(HealthState { store })).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.policy.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
