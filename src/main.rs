use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

use maps_harvester::api::{self, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let state = web::Data::new(AppState::new());

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid number");

    log::info!("🚀 Starting Maps Harvester");
    log::info!("🌐 Server running at http://{}:{}", host, port);
    log::info!("📖 Health probe at http://{}:{}/api/health", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            .route("/api/health", web::get().to(api::health_check))
            .route("/api/scrape", web::post().to(api::scrape_handler))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
