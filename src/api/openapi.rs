//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Test Run Dashboard Server",
        version = "0.1.0",
        description = "Ingests per-test results streamed by parallel Cypress and Playwright workers and aggregates them per build and spec file"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::liveness,
        api::health::readiness,
        // Ingestion endpoints
        api::builds::register,
        api::results::submit_result,
        api::results::submit_cypress_result,
        api::results::submit_playwright_result,
        // Read endpoints
        api::builds::get_build,
        api::builds::get_build_spec,
        api::builds::get_spec_result,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::LivenessResponse,
            api::health::ReadinessResponse,
            // Builds
            models::Framework,
            models::BuildStatus,
            models::RegisterBuildRequest,
            models::RegisterBuildResponse,
            models::BuildResponse,
            models::BuildDetailResponse,
            // Results
            models::CanonicalStatus,
            models::TestError,
            models::TestEntry,
            models::TestResultInput,
            models::SubmitResultRequest,
            models::SubmitResultResponse,
            models::SpecSummary,
            models::SpecResultResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Ingestion", description = "Build registration and per-test result submission"),
        (name = "Builds", description = "Read aggregated build and spec results")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add API key security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(
                            crate::config::API_KEY_HEADER,
                        ),
                    ),
                ),
            );
        }
    }
}
