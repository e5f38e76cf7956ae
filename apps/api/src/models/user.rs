use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub is_public: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// The subset of a student profile that anyone may see.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
    pub skills: Vec<String>,
    pub location: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            bio: user.bio.clone(),
            university: user.university.clone(),
            graduation_year: user.graduation_year,
            skills: user.skills.clone(),
            location: user.location.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Recruiter {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub company: String,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A badge joined with the challenge it was earned on.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub challenge_id: Uuid,
    pub submission_id: Uuid,
    pub challenge_slug: String,
    pub challenge_title: String,
    pub awarded_at: DateTime<Utc>,
}
