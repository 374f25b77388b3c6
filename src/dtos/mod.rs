pub mod auth_dtos;
pub mod post_dtos;
// alias so callers can write `crate::dtos::auth`
pub use auth_dtos as auth;

use serde::Serialize;

/// Plain acknowledgement body, e.g. after a delete.
#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub status: String,
    pub message: String,
}

impl MessageOut {
    pub fn success(message: impl Into<String>) -> Self {
        Self { status: "success".to_string(), message: message.into() }
    }
}
