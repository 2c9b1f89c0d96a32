//! API endpoint modules.

pub mod builds;
pub mod health;
pub mod openapi;
pub mod results;
pub mod websocket;

pub use builds::configure_routes as configure_build_routes;
pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use results::configure_routes as configure_result_routes;
pub use websocket::configure_routes as configure_websocket_routes;

use actix_web::web;

/// Mount every `/api/v1` route on the given scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.configure(configure_health_routes)
        .configure(configure_build_routes)
        .configure(configure_result_routes)
        .configure(configure_websocket_routes);
}
