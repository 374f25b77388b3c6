pub mod post_repository;
pub mod user_repository;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
