use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::config::Config;
use crate::execution::ExecutionAdapter;
use crate::projects::github::GithubClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Portfolio share-link tokens live here with a TTL.
    pub redis: RedisClient,
    pub s3: S3Client,
    pub config: Config,
    /// Pluggable execution backend (Judge0 or Piston), chosen via EXECUTION_BACKEND.
    pub executor: Arc<dyn ExecutionAdapter>,
    pub github: GithubClient,
}
