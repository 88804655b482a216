use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use tracing::*;
use tracing_actix_web::TracingLogger;

use super::pages;

fn json_error_handler(error: JsonPayloadError, _: &HttpRequest) -> actix_web::Error {
    warn!("Problem with json: {error}");
    error.into()
}

// Start REST API server with the desired address
pub async fn run(server_address: &str) -> Result<(), std::io::Error> {
    let server_address = server_address.to_string();
    info!("Server running at {server_address}");

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .send_wildcard()
                    .max_age(3600),
            )
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            // Versioned API routes (canonical)
            .service(web::scope("/v1").configure(configure_api_routes))
            // Flat routes, same handlers
            .configure(configure_api_routes)
    })
    .bind(server_address)?
    .run()
    .await
}

/// Register all API routes on a `ServiceConfig`.
/// Used for both the `/v1` scope and the flat routes.
pub fn configure_api_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/info", web::get().to(pages::info))
        .route("/stats", web::get().to(pages::stats))
        .route("/stats/ws", web::get().to(pages::stats_ws))
        .route("/dashboard", web::get().to(pages::dashboard))
        .route("/refresh", web::post().to(pages::refresh))
        .route("/trash/empty", web::post().to(pages::empty_trash))
        .route("/trash/permission", web::post().to(pages::trash_permission))
        .route("/settings", web::get().to(pages::settings))
        .route("/settings/modules", web::post().to(pages::settings_module))
        .route("/settings/language", web::post().to(pages::settings_language))
        .route(
            "/settings/network_interfaces",
            web::post().to(pages::settings_network_interfaces),
        )
        .route("/reset_settings", web::post().to(pages::reset_settings))
        .route("/log", web::get().to(pages::log));
}
