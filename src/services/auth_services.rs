// src/services/auth_services.rs - registration, login, password hashing
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use deadpool_postgres::Pool;
use log::info;
use thiserror::Error;

use crate::dtos::auth::LoginOut;
use crate::models::user::{User, UserPublic};
use crate::repositories::user_repository::UserRepository;
use crate::repositories::RepoError;
use crate::services::token_service::{TokenError, TokenService};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("repository error: {0}")]
    Repo(#[from] RepoError),
    #[error("token error: {0}")]
    Token(#[from] TokenError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Salted Argon2id hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}

/// Runs a hashing job on tokio's blocking pool so it does not stall the
/// worker serving other requests.
async fn off_worker<T, F>(job: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
}

#[derive(Clone)]
pub struct AuthService {
    pool: Pool,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(pool: Pool, tokens: Arc<TokenService>) -> Self {
        Self { pool, tokens }
    }

    /// Expects already-normalized input (trimmed, lower-cased email).
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let password = password.to_string();
        let password_hash = off_worker(move || hash_password(&password)).await?;
        let user = UserRepository::create(&self.pool, name, email, &password_hash).await?;
        info!("registered user {}", user.id);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOut, AuthError> {
        let user = UserRepository::find_by_email(&self.pool, email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let (candidate, stored) = (password.to_string(), user.password.clone());
        if !off_worker(move || verify_password(&candidate, &stored)).await? {
            return Err(AuthError::InvalidPassword);
        }

        let token = self.tokens.issue(user.id, &user.email)?;
        Ok(LoginOut { token, user: UserPublic::from(&user) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_salted_and_verifies() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
        assert!(verify_password("hunter22", &a).unwrap());
        assert!(!verify_password("hunter23", &a).unwrap());
    }

    #[tokio::test]
    async fn hashing_runs_on_the_blocking_pool() {
        let hash = off_worker(|| hash_password("hunter22")).await.unwrap();
        let ok = off_worker(move || verify_password("hunter22", &hash)).await.unwrap();
        assert!(ok);

        let err = off_worker(|| verify_password("x", "plaintext")).await;
        assert!(matches!(err, Err(AuthError::Hash(_))));
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        assert!(matches!(verify_password("x", "plaintext"), Err(AuthError::Hash(_))));
    }
}
