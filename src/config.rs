use std::env;
use std::str::FromStr;

use anyhow::{bail, Context};

/// Upper bound for `CHALLENGE_DAYS` (ten years).
pub const MAX_CHALLENGE_DAYS: i64 = 3650;

fn parse_challenge_days(raw: &str) -> anyhow::Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("CHALLENGE_DAYS must be a number")?;
    if !(1..=MAX_CHALLENGE_DAYS).contains(&days) {
        bail!("CHALLENGE_DAYS must be between 1 and {}", MAX_CHALLENGE_DAYS);
    }
    Ok(days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown STORE_BACKEND `{}` (expected postgres or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub site_url: String,
    /// Origins allowed by CORS besides `site_url`.
    pub cors_extra_origins: Vec<String>,

    pub jwt_secret: String,
    pub session_ttl_secs: i64,
    pub login_code_ttl_secs: i64,

    pub off_base_url: String,
    pub off_user_agent: String,
    pub off_timeout_secs: u64,

    pub upload_dir: String,
    pub upload_public_url: String,

    pub challenge_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        Ok(Self {
            store_backend,
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            cors_extra_origins: env::var("CORS_EXTRA_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),

            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .unwrap_or_else(|_| "604800".into()) // 7 days
                .parse()
                .context("SESSION_TTL_SECS must be a number")?,
            login_code_ttl_secs: env::var("LOGIN_CODE_TTL_SECS")
                .unwrap_or_else(|_| "3600".into())
                .parse()
                .context("LOGIN_CODE_TTL_SECS must be a number")?,

            off_base_url: env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| "https://world.openfoodfacts.org".into())
                .trim_end_matches('/')
                .to_string(),
            off_user_agent: env::var("OFF_USER_AGENT").unwrap_or_else(|_| {
                format!("nosugar-api/{} (no-sugar challenge tracker)", env!("CARGO_PKG_VERSION"))
            }),
            off_timeout_secs: env::var("OFF_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .context("OFF_TIMEOUT_SECS must be a number")?,

            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into()),
            upload_public_url: env::var("UPLOAD_PUBLIC_URL")
                .unwrap_or_else(|_| "/uploads".into())
                .trim_end_matches('/')
                .to_string(),

            challenge_days: parse_challenge_days(
                &env::var("CHALLENGE_DAYS").unwrap_or_else(|_| "14".into()),
            )?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Session cookies only carry `Secure` when the site itself is served over TLS.
    pub fn session_cookie_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    pub fn auth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_bad_timeout_is_an_error() {
        env::set_var("STORE_BACKEND", "memory");
        env::set_var("JWT_SECRET", "config-test-secret");
        env::set_var("OFF_TIMEOUT_SECS", "soon");
        let err = Config::from_env().unwrap_err();
        env::remove_var("OFF_TIMEOUT_SECS");

        assert_eq!(err.to_string(), "OFF_TIMEOUT_SECS must be a number");
    }

    #[test]
    fn test_challenge_days_bounds() {
        assert_eq!(parse_challenge_days("14").unwrap(), 14);
        assert_eq!(parse_challenge_days(" 30 ").unwrap(), 30);
        assert!(parse_challenge_days("two weeks").is_err());
        assert!(parse_challenge_days("0").is_err());
        assert!(parse_challenge_days("-3").is_err());
        assert!(parse_challenge_days("9223372036854775807").is_err());
    }
}
