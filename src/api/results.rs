//! Test result ingestion endpoints.
//!
//! `/result` accepts results for any build; the framework variants also
//! check that the build was registered for that framework.

use actix_web::{HttpResponse, web};

use crate::auth::ApiKeyAuth;
use crate::config::IngestLimits;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{Framework, SubmitResultRequest, SubmitResultResponse};
use crate::services::{EventBroadcaster, SpecLocks, merge_test_result};

async fn submit(
    pool: &DbPool,
    locks: &SpecLocks,
    limits: &IngestLimits,
    broadcaster: &EventBroadcaster,
    body: SubmitResultRequest,
    framework: Option<Framework>,
) -> AppResult<HttpResponse> {
    let request = body.validate(framework)?;
    let outcome = merge_test_result(pool, locks, limits.merge_timeout, request).await?;

    broadcaster.spec_result_updated(&outcome);

    Ok(HttpResponse::Ok().json(SubmitResultResponse {
        success: true,
        spec: outcome.spec_file,
        test_count: outcome.test_count,
    }))
}

/// Merge one finished test into its spec aggregate.
#[utoipa::path(
    post,
    path = "/api/v1/result",
    tag = "Ingestion",
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Result merged", body = SubmitResultResponse),
        (status = 400, description = "Missing field", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown build", body = crate::error::ErrorResponse),
        (status = 503, description = "Lock timeout or transient storage error", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn submit_result(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    locks: web::Data<SpecLocks>,
    limits: web::Data<IngestLimits>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<SubmitResultRequest>,
) -> AppResult<HttpResponse> {
    submit(&pool, &locks, &limits, &broadcaster, body.into_inner(), None).await
}

/// Merge one finished Cypress test.
#[utoipa::path(
    post,
    path = "/api/v1/cypress/result",
    tag = "Ingestion",
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Result merged", body = SubmitResultResponse),
        (status = 400, description = "Missing field or not a Cypress build", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown build", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn submit_cypress_result(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    locks: web::Data<SpecLocks>,
    limits: web::Data<IngestLimits>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<SubmitResultRequest>,
) -> AppResult<HttpResponse> {
    submit(
        &pool,
        &locks,
        &limits,
        &broadcaster,
        body.into_inner(),
        Some(Framework::Cypress),
    )
    .await
}

/// Merge one finished Playwright test.
#[utoipa::path(
    post,
    path = "/api/v1/playwright/result",
    tag = "Ingestion",
    request_body = SubmitResultRequest,
    responses(
        (status = 200, description = "Result merged", body = SubmitResultResponse),
        (status = 400, description = "Missing field or not a Playwright build", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown build", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn submit_playwright_result(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    locks: web::Data<SpecLocks>,
    limits: web::Data<IngestLimits>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<SubmitResultRequest>,
) -> AppResult<HttpResponse> {
    submit(
        &pool,
        &locks,
        &limits,
        &broadcaster,
        body.into_inner(),
        Some(Framework::Playwright),
    )
    .await
}

/// Configure result ingestion routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/result").route(web::post().to(submit_result)))
        .service(web::resource("/cypress/result").route(web::post().to(submit_cypress_result)))
        .service(
            web::resource("/playwright/result").route(web::post().to(submit_playwright_result)),
        );
}
