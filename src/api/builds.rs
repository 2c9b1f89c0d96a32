//! Build registration and build read endpoints.

use actix_web::{HttpResponse, web};

use crate::auth::ApiKeyAuth;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    BuildDetailResponse, RegisterBuildRequest, RegisterBuildResponse, SpecFileQuery,
    SpecResultResponse,
};
use crate::services::{EventBroadcaster, register_build};

/// Register a build for a test session.
///
/// Workers sharing a `session_id` all receive the same build id.
#[utoipa::path(
    post,
    path = "/api/v1/build",
    tag = "Ingestion",
    request_body = RegisterBuildRequest,
    responses(
        (status = 201, description = "Build created", body = RegisterBuildResponse),
        (status = 200, description = "Existing session build reused", body = RegisterBuildResponse),
        (status = 400, description = "Missing project_id", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown project", body = crate::error::ErrorResponse),
        (status = 503, description = "Transient storage error", body = crate::error::ErrorResponse),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn register(
    _auth: ApiKeyAuth,
    pool: web::Data<DbPool>,
    broadcaster: web::Data<EventBroadcaster>,
    body: web::Json<RegisterBuildRequest>,
) -> AppResult<HttpResponse> {
    let new = body.into_inner().validate()?;
    let registration = register_build(pool.get_ref(), new).await?;
    broadcaster.build_registered(&registration);
    let build = &registration.build;

    let response = RegisterBuildResponse {
        success: true,
        build_id: build.id,
        project_id: build.project_id,
        organization_id: build.organization_id,
    };

    if registration.created {
        Ok(HttpResponse::Created().json(response))
    } else {
        Ok(HttpResponse::Ok().json(response))
    }
}

/// Get a build with every spec aggregate and its counts.
#[utoipa::path(
    get,
    path = "/api/v1/builds/{build_id}",
    tag = "Builds",
    params(
        ("build_id" = i32, Path, description = "Build ID")
    ),
    responses(
        (status = 200, description = "Build with spec aggregates", body = BuildDetailResponse),
        (status = 404, description = "Build not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_build(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let build_id = path.into_inner();

    let build = pool
        .get_build_by_id(build_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Build {}", build_id)))?;

    let specs = pool
        .get_spec_results_by_build_id(build_id)
        .await?
        .into_iter()
        .map(SpecResultResponse::from_model)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(HttpResponse::Ok().json(BuildDetailResponse {
        build: build.into(),
        specs,
    }))
}

/// Get the aggregate of one spec file in a build.
#[utoipa::path(
    get,
    path = "/api/v1/builds/{build_id}/specs",
    tag = "Builds",
    params(
        ("build_id" = i32, Path, description = "Build ID"),
        ("spec_file" = String, Query, description = "Spec file path as reported by the runner")
    ),
    responses(
        (status = 200, description = "Spec aggregate", body = SpecResultResponse),
        (status = 404, description = "No results for this spec", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_build_spec(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    query: web::Query<SpecFileQuery>,
) -> AppResult<HttpResponse> {
    let build_id = path.into_inner();
    let spec_file = query.into_inner().spec_file;

    let spec = pool
        .find_spec_result(build_id, &spec_file)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Spec {} of build {}", spec_file, build_id)))?;

    Ok(HttpResponse::Ok().json(SpecResultResponse::from_model(spec)?))
}

/// Get a spec aggregate by its ID.
#[utoipa::path(
    get,
    path = "/api/v1/spec-results/{spec_result_id}",
    tag = "Builds",
    params(
        ("spec_result_id" = i32, Path, description = "Spec result ID")
    ),
    responses(
        (status = 200, description = "Spec aggregate", body = SpecResultResponse),
        (status = 404, description = "Spec result not found", body = crate::error::ErrorResponse),
    )
)]
pub async fn get_spec_result(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();

    let spec = pool
        .get_spec_result_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Spec result {}", id)))?;

    Ok(HttpResponse::Ok().json(SpecResultResponse::from_model(spec)?))
}

/// Configure build routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/build").route(web::post().to(register)))
        .service(web::resource("/builds/{build_id}").route(web::get().to(get_build)))
        .service(web::resource("/builds/{build_id}/specs").route(web::get().to(get_build_spec)))
        .service(
            web::resource("/spec-results/{spec_result_id}").route(web::get().to(get_spec_result)),
        );
}
