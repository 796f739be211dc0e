use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use yatra_api::db;
use yatra_api::routes;
use yatra_api::services::pricing_service::PricingConfig;
use yatra_api::services::rule_cache::RuleCache;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    println!("Logger initialized");

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    println!("Got MongoDB URI, attempting connection...");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;
    println!("MongoDB connection established");

    let config = PricingConfig::from_env();
    println!("Pricing engine configured: {:?}", config);
    let rule_cache = Arc::new(RuleCache::new(Duration::from_secs(
        config.rule_cache_ttl_seconds,
    )));

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(web::Data::new(client.clone()))
            .app_data(web::Data::new(rule_cache.clone()))
            .app_data(web::Data::new(config.clone()))
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api").service(
                    web::scope("/packages")
                        .route("", web::get().to(routes::package::get_packages))
                        .route("/{id}", web::get().to(routes::package::get_by_id))
                        .route(
                            "/{id}/calculate_price",
                            web::post().to(routes::package::calculate_price),
                        )
                        .route(
                            "/{id}/price_range",
                            web::get().to(routes::package::price_range),
                        )
                        .route(
                            "/{id}/validate_price",
                            web::post().to(routes::package::validate_price),
                        ),
                ),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
