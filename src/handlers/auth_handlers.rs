use std::sync::LazyLock;

use actix_web::{post, web, HttpResponse};
use log::{error, warn};
use regex::Regex;

use crate::dtos::auth::{LoginIn, RegisterIn};
use crate::errors::{error_chain, AppError};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$").expect("email regex compiles")
});

fn looks_like_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trimmed name, normalized email; rejects anything the store should never see.
fn validate_register(body: &RegisterIn) -> Result<(String, String), AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let email = body.email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }

    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    Ok((name.to_string(), email))
}

/// POST /register
#[post("/register")]
pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterIn>) -> HttpResponse {
    let (name, email) = match validate_register(&body) {
        Ok(v) => v,
        Err(e) => return e.to_response(state.debug_errors),
    };

    match state.auth.register(&name, &email, &body.password).await {
        Ok(user) => HttpResponse::Created().json(user),
        Err(e) => {
            error!("Register error for {}: {}", email, error_chain(&e));
            AppError::from(e).to_response(state.debug_errors)
        }
    }
}

/// POST /login
#[post("/login")]
pub async fn login(state: web::Data<AppState>, body: web::Json<LoginIn>) -> HttpResponse {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return AppError::Validation("Email and password are required".into())
            .to_response(state.debug_errors);
    }

    match state.auth.login(&email, &body.password).await {
        Ok(session) => HttpResponse::Ok().json(session),
        Err(e) => {
            warn!("Login failed for {}: {}", email, error_chain(&e));
            AppError::from(e).to_response(state.debug_errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, email: &str, password: &str) -> RegisterIn {
        RegisterIn { name: name.into(), email: email.into(), password: password.into() }
    }

    #[test]
    fn register_input_is_normalized() {
        let (name, email) = validate_register(&body("  Ada ", " Ada@Example.COM ", "secret1")).unwrap();
        assert_eq!(name, "Ada");
        assert_eq!(email, "ada@example.com");
    }

    #[test]
    fn register_input_rejections() {
        assert!(validate_register(&body("", "a@example.com", "secret1")).is_err());
        assert!(validate_register(&body("Ada", "not-an-email", "secret1")).is_err());
        assert!(validate_register(&body("Ada", "a@example.com", "short")).is_err());
    }
}
