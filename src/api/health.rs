//! Liveness and readiness checks for load balancers and orchestrators.

use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::services::{EventBroadcaster, SpecLocks};

#[derive(Serialize, ToSchema)]
pub struct LivenessResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    status: &'static str,
    database: &'static str,
    /// Spec aggregates with a merge in flight or queued
    active_spec_locks: usize,
    live_subscribers: usize,
}

/// The process is up. Never touches the database.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Process is alive", body = LivenessResponse)
    )
)]
#[get("/health")]
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(LivenessResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready to ingest: the database answers.
#[utoipa::path(
    get,
    path = "/api/v1/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to ingest", body = ReadinessResponse),
        (status = 503, description = "Database unreachable", body = crate::error::ErrorResponse)
    )
)]
#[get("/ready")]
pub async fn readiness(
    pool: web::Data<DbPool>,
    locks: web::Data<SpecLocks>,
    broadcaster: web::Data<EventBroadcaster>,
) -> AppResult<HttpResponse> {
    pool.ping().await?;

    Ok(HttpResponse::Ok().json(ReadinessResponse {
        status: "ready",
        database: "connected",
        active_spec_locks: locks.active_keys(),
        live_subscribers: broadcaster.subscriber_count(),
    }))
}

pub fn configure_health_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(liveness).service(readiness);
}
