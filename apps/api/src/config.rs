use anyhow::{bail, Context, Result};

/// Which external execution service verifies challenge submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionBackend {
    Judge0,
    Piston,
}

impl ExecutionBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "judge0" => Ok(Self::Judge0),
            "piston" => Ok(Self::Piston),
            other => bail!("EXECUTION_BACKEND must be 'judge0' or 'piston', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub execution_backend: ExecutionBackend,
    pub judge0_url: String,
    pub judge0_api_key: Option<String>,
    pub piston_url: String,
    pub execution_poll_attempts: u32,
    pub execution_poll_interval_ms: u64,
    pub github_api_url: String,
    pub github_token: Option<String>,
    pub signed_url_ttl_secs: u64,
    pub share_link_max_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            jwt_ttl_hours: parse_env("JWT_TTL_HOURS", 24)?,
            execution_backend: ExecutionBackend::parse(
                &std::env::var("EXECUTION_BACKEND").unwrap_or_else(|_| "judge0".to_string()),
            )?,
            judge0_url: std::env::var("JUDGE0_URL")
                .unwrap_or_else(|_| "https://judge0-ce.p.rapidapi.com".to_string()),
            judge0_api_key: optional_env("JUDGE0_API_KEY"),
            piston_url: std::env::var("PISTON_URL")
                .unwrap_or_else(|_| "https://emkc.org/api/v2/piston".to_string()),
            execution_poll_attempts: parse_env("EXECUTION_POLL_ATTEMPTS", 10)?,
            execution_poll_interval_ms: parse_env("EXECUTION_POLL_INTERVAL_MS", 1000)?,
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_token: optional_env("GITHUB_TOKEN"),
            signed_url_ttl_secs: parse_env("SIGNED_URL_TTL_SECS", 900)?,
            share_link_max_ttl_secs: parse_env("SHARE_LINK_MAX_TTL_SECS", 7 * 24 * 3600)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse_is_case_insensitive() {
        assert_eq!(ExecutionBackend::parse("Judge0").unwrap(), ExecutionBackend::Judge0);
        assert_eq!(ExecutionBackend::parse(" PISTON ").unwrap(), ExecutionBackend::Piston);
    }

    #[test]
    fn test_backend_parse_rejects_unknown() {
        assert!(ExecutionBackend::parse("docker").is_err());
    }
}
