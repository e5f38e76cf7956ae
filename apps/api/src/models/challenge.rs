use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Languages a challenge can be authored in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeLanguage {
    Javascript,
    Typescript,
    Python,
    Java,
    Cpp,
    C,
    Go,
    Rust,
}

impl ChallengeLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Python => "python",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Go => "go",
            Self::Rust => "rust",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub language: String,
    pub starter_code: String,
    pub test_cases: Json<Vec<TestCase>>,
    pub total_attempts: i64,
    pub total_passes: i64,
    pub created_at: DateTime<Utc>,
}

impl ChallengeRow {
    pub fn visible_test_cases(&self) -> Vec<TestCase> {
        self.test_cases
            .iter()
            .filter(|tc| !tc.hidden)
            .cloned()
            .collect()
    }

    /// Blanks out the input and expected output of hidden test cases.
    pub fn redact_hidden(mut self) -> Self {
        for tc in self.test_cases.0.iter_mut().filter(|tc| tc.hidden) {
            tc.input.clear();
            tc.expected_output.clear();
        }
        self
    }
}
