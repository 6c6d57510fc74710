//! GET /health: provider probes plus a database ping.

use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{extract::State, http::StatusCode, response::Response};
use rag_store::pool;
use serde::Serialize;
use tracing::warn;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// `None` when no database is attached.
    pub database: Option<DatabaseStatus>,
    pub providers: Vec<HealthStatus>,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub ok: bool,
    pub message: String,
}

impl HealthReport {
    fn healthy(&self) -> bool {
        self.database.as_ref().is_none_or(|d| d.ok) && self.providers.iter().all(|p| p.ok)
    }
}

/// Always answers; a failing dependency yields 503 with the full report.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Response {
    let providers = match &state.llm {
        Some(llm) => llm.health_all().await,
        None => Vec::new(),
    };

    let database = match &state.db {
        Some(db) => Some(match pool::ping(db).await {
            Ok(()) => DatabaseStatus {
                ok: true,
                message: "database is reachable".into(),
            },
            Err(e) => {
                warn!(error = %e, "health_route: database ping failed");
                DatabaseStatus {
                    ok: false,
                    message: e.to_string(),
                }
            }
        }),
        None => None,
    };

    let report = HealthReport {
        database,
        providers,
    };

    if report.healthy() {
        ApiResponse::success(report).into_response_with_status(StatusCode::OK)
    } else {
        ApiResponse::failure("DEGRADED", "one or more dependencies are unhealthy", report)
            .into_response_with_status(StatusCode::SERVICE_UNAVAILABLE)
    }
}
