pub mod config;
pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use actix_web::web;

use crate::dtos::post_dtos::MAX_TEXT_BYTES;
use crate::errors::json_error;
use crate::handlers::auth_handlers::{login, register};
use crate::handlers::health_handlers::health;
use crate::handlers::post_handlers::{
    create_post, delete_post, get_post, list_posts, list_user_posts, update_post,
};
use crate::services::auth_services::AuthService;
use crate::services::post_services::PostService;

/// Shared handles injected into every handler. The token service is
/// registered separately so the auth extractor can reach it on its own.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub posts: PostService,
    pub debug_errors: bool,
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_TEXT_BYTES)
            .error_handler(json_error),
    )
    .service(health)
    .service(register)           // POST /register
    .service(login)              // POST /login
    .service(list_user_posts)    // GET /posts/user/{user_id}
    .service(list_posts)         // GET /posts
    .service(get_post)           // GET /posts/{id}
    .service(create_post)        // POST /posts
    .service(update_post)        // PUT /posts/{id}
    .service(delete_post);       // DELETE /posts/{id}
}
