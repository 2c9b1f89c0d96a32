//! Actix-web extractor for API key authentication.
//!
//! The header value is wrapped in `SecretString` as soon as it is read and is
//! never logged.

use actix_web::dev::Payload;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, web};
use secrecy::{ExposeSecret, SecretString};
use std::future::{Ready, ready};
use tracing::warn;

use super::IngestKey;
use crate::config::API_KEY_HEADER;
use crate::error::ErrorResponse;

/// Extract a secret header value, wrapping it in SecretString.
/// Returns None if the header is missing or invalid UTF-8.
fn extract_secret_header(req: &HttpRequest, header_name: &str) -> Option<SecretString> {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| SecretString::from(s.to_string()))
}

/// Authentication error for extractors.
#[derive(Debug)]
pub struct AuthError {
    message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::UNAUTHORIZED).json(ErrorResponse {
            error: "UNAUTHORIZED".to_string(),
            message: self.message.clone(),
            retryable: false,
        })
    }
}

/// Extractor that requires the ingestion API key.
///
/// ```ignore
/// async fn ingest(_auth: ApiKeyAuth, body: web::Json<Body>) -> impl Responder { .. }
/// ```
///
/// Extractors run in argument order, so listing `ApiKeyAuth` first rejects
/// unauthenticated calls before the body is parsed.
pub struct ApiKeyAuth;

impl FromRequest for ApiKeyAuth {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(expected) = req.app_data::<web::Data<IngestKey>>() else {
            return ready(Err(AuthError {
                message: "Internal configuration error".to_string(),
            }));
        };

        match extract_secret_header(req, API_KEY_HEADER) {
            Some(ref provided) if expected.verify(provided.expose_secret()) => ready(Ok(ApiKeyAuth)),
            Some(_) => {
                warn!(path = %req.path(), "Rejected request with invalid API key");
                ready(Err(AuthError {
                    message: "Invalid API key".to_string(),
                }))
            }
            None => ready(Err(AuthError {
                message: "Missing API key. Provide X-API-Key header.".to_string(),
            })),
        }
    }
}
