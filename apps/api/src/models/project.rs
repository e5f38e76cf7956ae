use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub repo_url: String,
    pub name: String,
    pub description: Option<String>,
    pub stars: i32,
    pub forks: i32,
    pub primary_language: Option<String>,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
}
