//! Test Run Dashboard server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use trd_lib::api::{self, ApiDoc};
use trd_lib::auth::IngestKey;
use trd_lib::config::Config;
use trd_lib::db::DbPool;
use trd_lib::error::json_error_handler;
use trd_lib::middleware::{REQUEST_ID_HEADER, RequestLogger};
use trd_lib::services::{EventBroadcaster, SpecLocks};

/// Request bodies carry a single test entry; large logs still fit.
const JSON_BODY_LIMIT: usize = 4 * 1024 * 1024;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, TRD_DB_URL (or TRD_DB_*) and TRD_API_KEY must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Test Run Dashboard Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
        info!("Using development defaults for database and API key");
    }

    let pool = match DbPool::new(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Database connection established");

    if let Err(e) = pool.run_migrations().await {
        error!("{}", e);
        std::process::exit(1);
    }
    info!("Database migrations complete");

    let bind_address = config.bind_address();
    let ingest_key = IngestKey::new(config.api_key.clone());
    let locks = SpecLocks::new(config.ingest.lock_timeout);
    let limits = config.ingest;
    let broadcaster = EventBroadcaster::new();
    let is_development = config.is_development();
    let openapi = ApiDoc::openapi();

    info!(
        lock_timeout_ms = limits.lock_timeout.as_millis() as u64,
        merge_timeout_ms = limits.merge_timeout.as_millis() as u64,
        "Ingestion limits"
    );

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!(
            "Starting server at http://{} ({} workers)",
            bind_address, cpus
        );
        cpus
    };

    let api_key_header = header::HeaderName::from_static("x-api-key");
    let request_id_header = header::HeaderName::from_static(REQUEST_ID_HEADER);

    let server = HttpServer::new(move || {
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
        } else {
            // Same-origin only in production
            Cors::default()
        }
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::ACCEPT,
            header::CONTENT_TYPE,
            api_key_header.clone(),
            request_id_header.clone(),
        ])
        .expose_headers(vec![request_id_header.clone()])
        .max_age(3600);

        App::new()
            // CORS must wrap outermost
            .wrap(cors)
            .wrap(RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(ingest_key.clone()))
            .app_data(web::Data::new(locks.clone()))
            .app_data(web::Data::new(limits))
            .app_data(web::Data::new(broadcaster.clone()))
            .app_data(
                web::JsonConfig::default()
                    .limit(JSON_BODY_LIMIT)
                    .error_handler(json_error_handler),
            )
            .service(web::scope("/api/v1").configure(api::configure_api))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    });

    server
        .workers(worker_count)
        .bind(&bind_address)?
        .run()
        .await
}
