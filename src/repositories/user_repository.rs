// src/repositories/user_repository.rs
use deadpool_postgres::Pool;

use crate::models::user::User;
use crate::repositories::RepoError;

pub struct UserRepository;

impl UserRepository {
    /// Inserts a user; `password_hash` must already be hashed. A duplicate
    /// email surfaces as the store's unique-constraint error.
    pub async fn create(
        pool: &Pool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepoError> {
        let client = pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) \
                 RETURNING id, name, email, password",
                &[&name, &email, &password_hash],
            )
            .await?;
        Ok(User::try_from(&row)?)
    }

    pub async fn find_by_email(pool: &Pool, email: &str) -> Result<Option<User>, RepoError> {
        let client = pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, name, email, password FROM users WHERE email = $1",
                &[&email],
            )
            .await?;
        Ok(row.as_ref().map(User::try_from).transpose()?)
    }
}
