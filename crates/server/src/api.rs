use std::str::FromStr;
use std::sync::Arc;

use approvals_core::currency::parse_amount;
use approvals_core::{
    ApplicationError, ApproverSelector, Currency, EngineSnapshot, InterfaceError, PolicyMatchResult,
    SnapshotStore,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    store: Arc<SnapshotStore>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub transaction_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, "bad_request", message.clone())
            }
            InterfaceError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                self.0.user_message().to_string(),
            ),
        };
        let body = ErrorBody {
            error: error.to_string(),
            message,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/v1/approvals/evaluate", post(evaluate))
        .with_state(ApiState { store })
}

pub async fn evaluate(
    State(state): State<ApiState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<PolicyMatchResult>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(request) = payload.map_err(|rejection| {
        warn!(
            event_name = "system.api.request_rejected",
            correlation_id = %correlation_id,
            error = %rejection.body_text(),
            "evaluate request body rejected"
        );
        ApiError(InterfaceError::BadRequest {
            message: rejection.body_text(),
            correlation_id: correlation_id.clone(),
        })
    })?;

    match evaluate_request(state.store.current(), &request) {
        Ok(result) => {
            info!(
                event_name = "system.api.evaluated",
                correlation_id = %correlation_id,
                currency = %request.currency,
                tier = %result.tier.id,
                approvers = result.selected_approvers.len(),
                missing = result.missing_requirements.len(),
                "approval requirements evaluated"
            );
            Ok(Json(result))
        }
        Err(error) => {
            warn!(
                event_name = "system.api.evaluate_failed",
                correlation_id = %correlation_id,
                error = %error,
                "evaluate request failed"
            );
            Err(ApiError(error.into_interface(correlation_id)))
        }
    }
}

fn evaluate_request(
    snapshot: Arc<EngineSnapshot>,
    request: &EvaluateRequest,
) -> Result<PolicyMatchResult, ApplicationError> {
    let amount = parse_amount(request.amount)?;
    let currency = Currency::from_str(&request.currency)?;
    let result = ApproverSelector::new(snapshot).select_approvers(
        amount,
        currency,
        request.transaction_type.as_deref(),
    )?;
    Ok(result)
}
