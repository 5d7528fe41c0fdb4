use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use std::sync::Arc;
use validator::Validate;

use crate::core::MatchingEngine;
use crate::models::{ErrorResponse, HealthResponse, RunMatchingRequest, RunMatchingResponse};
use crate::services::PostgresClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: MatchingEngine,
    /// Absent when running on the in-memory store
    pub postgres: Option<Arc<PostgresClient>>,
}

/// Configure all matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matching/run", web::post().to(run_matching))
        .route("/matching/preview", web::post().to(preview_matching));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(pg) => pg.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

fn validation_failed(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Run matching endpoint
///
/// POST /api/v1/matching/run
///
/// Request body:
/// ```json
/// {
///   "deploymentId": "string",
///   "scheduledAt": "2024-04-15T14:00:00Z"
/// }
/// ```
async fn run_matching(
    state: web::Data<AppState>,
    req: web::Json<RunMatchingRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let deployment_id = &req.deployment_id;
    let scheduled_at = req.scheduled_at.unwrap_or_else(Utc::now);

    tracing::info!("Running matching for deployment {}", deployment_id);

    match state.engine.run_at(deployment_id, scheduled_at).await {
        Ok(matches) => HttpResponse::Ok().json(RunMatchingResponse {
            deployment_id: deployment_id.clone(),
            total_matches: matches.len(),
            matches,
        }),
        Err(e) => {
            tracing::error!("Matching failed for deployment {}: {}", deployment_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Matching failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Preview matching endpoint
///
/// POST /api/v1/matching/preview
///
/// Same body as the run endpoint. Returns the groups a run would create
/// without storing them.
async fn preview_matching(
    state: web::Data<AppState>,
    req: web::Json<RunMatchingRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_failed(errors);
    }

    let scheduled_at = req.scheduled_at.unwrap_or_else(Utc::now);

    match state.engine.plan_at(&req.deployment_id, scheduled_at).await {
        Ok(groups) => HttpResponse::Ok().json(serde_json::json!({
            "deploymentId": req.deployment_id,
            "groups": groups,
            "count": groups.len(),
        })),
        Err(e) => {
            tracing::error!("Preview failed for deployment {}: {}", req.deployment_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Preview failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
