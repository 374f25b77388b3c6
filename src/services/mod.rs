pub mod auth_services;
pub mod media_uploader;
pub mod post_services;
pub mod token_service;
