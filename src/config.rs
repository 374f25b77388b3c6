use std::env;
use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, Runtime, PoolConfig};
use tokio_postgres::NoTls;

const DEFAULT_POOL_SIZE: usize = 16;
const DEFAULT_BUCKET: &str = "attachments";
const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct PgSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
    pub pool_size: usize,
}

#[derive(Clone, Debug)]
pub struct MediaSettings {
    pub base_url: String,
    pub api_key: String,
    pub bucket: String,
}

/// Everything the server needs, read once at startup and handed to each
/// component when it is built.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pg: PgSettings,
    pub jwt_secret: String,
    pub media: MediaSettings,
    pub allowed_origins: Vec<String>,
    pub port: u16,
    pub debug_errors: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let pg = PgSettings {
            host: env::var("PG_HOST").context("PG_HOST not set")?,
            port: parse_or("PG_PORT", 5432)?,
            user: env::var("PG_USER").context("PG_USER not set")?,
            password: env::var("PG_PASS").ok(),
            dbname: env::var("PG_DB").context("PG_DB not set")?,
            pool_size: parse_or("PG_POOL_SIZE", DEFAULT_POOL_SIZE)?,
        };

        let media = MediaSettings {
            base_url: env::var("MEDIA_HOST_URL")
                .context("MEDIA_HOST_URL not set")?
                .trim()
                .trim_end_matches('/')
                .to_string(),
            api_key: env::var("MEDIA_API_KEY")
                .context("MEDIA_API_KEY not set")?
                .trim()
                .to_string(),
            bucket: env::var("MEDIA_BUCKET").unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
        };

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            pg,
            jwt_secret,
            media,
            allowed_origins,
            port: parse_or("PORT", 8080)?,
            debug_errors: parse_flag(env::var("DEBUG_ERRORS").ok().as_deref()),
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

pub fn mask_key(k: &str) -> String {
    let chars: Vec<char> = k.chars().collect();
    if chars.len() <= 8 { return "[REDACTED]".to_string(); }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Builds the shared connection pool. No connection is opened until the
/// first checkout.
pub fn get_pg_pool(settings: &PgSettings) -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(settings.host.clone());
    cfg.port = Some(settings.port);
    cfg.user = Some(settings.user.clone());
    cfg.password = settings.password.clone();
    cfg.dbname = Some(settings.dbname.clone());

    let mut pool_cfg = PoolConfig::default();
    pool_cfg.max_size = settings.pool_size;
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
       .context("failed to create postgres pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_accepts_common_truthy_values() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" 1 ")));
        assert!(parse_flag(Some("YES")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn mask_key_hides_short_and_middle_of_long_keys() {
        assert_eq!(mask_key("short"), "[REDACTED]");
        assert_eq!(mask_key("abcd1234efgh"), "abcd***efgh");
        // multi-byte characters on both edges
        assert_eq!(mask_key("ééééxxxxxxüüüü"), "éééé***üüüü");
        assert_eq!(mask_key("日本語の鍵です"), "[REDACTED]");
    }

    #[tokio::test]
    async fn pool_is_built_without_connecting() {
        let settings = PgSettings {
            host: "127.0.0.1".into(),
            port: 1,
            user: "nobody".into(),
            password: None,
            dbname: "nothing".into(),
            pool_size: 2,
        };
        let pool = get_pg_pool(&settings).expect("pool builds lazily");
        assert_eq!(pool.status().max_size, 2);
    }
}
