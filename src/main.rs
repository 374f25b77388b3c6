use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{error, info};
use reqwest::Client;

use inkwell_be::config::{self, mask_key, AppConfig};
use inkwell_be::services::auth_services::AuthService;
use inkwell_be::services::media_uploader::StorageUploader;
use inkwell_be::services::post_services::PostService;
use inkwell_be::services::token_service::TokenService;
use inkwell_be::{routes, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Media host: {} (bucket {})", cfg.media.base_url, cfg.media.bucket);
    info!("Media key: {}", mask_key(&cfg.media.api_key));
    info!("JWT secret: {}", mask_key(&cfg.jwt_secret));
    if cfg.debug_errors {
        info!("DEBUG_ERRORS on: internal error detail is returned to clients");
    }

    let pg_pool = match config::get_pg_pool(&cfg.pg) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create PG pool: {:#}", e);
            std::process::exit(1);
        }
    };

    let http_client = match Client::builder().user_agent("inkwell-be/0.1").build() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build http client: {}", e);
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenService::new(&cfg.jwt_secret));
    let uploader = Arc::new(StorageUploader::new(http_client, &cfg.media));

    let state = web::Data::new(AppState {
        auth: AuthService::new(pg_pool.clone(), tokens.clone()),
        posts: PostService::new(pg_pool, uploader),
        debug_errors: cfg.debug_errors,
    });
    let token_data = web::Data::from(tokens);

    let bind_address = format!("0.0.0.0:{}", cfg.port);
    info!("Starting server on {}", bind_address);

    let allowed_origins = cfg.allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec!["authorization", "content-type", "accept"])
            .max_age(3600);

        for origin in &allowed_origins {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(token_data.clone())
            .configure(routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
