//! Recruiter-side talent search and bookmarks.

pub mod handlers;

use serde::Deserialize;

use crate::auth::handlers::normalize_skills;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 50;
pub const MAX_PAGE: i64 = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub skills: Option<String>,
    pub university: Option<String>,
    pub graduation_year: Option<i32>,
    pub location: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Search filters after trimming and defaulting. `None` means "don't filter".
#[derive(Debug, PartialEq)]
pub struct SearchFilters {
    pub text_pattern: Option<String>,
    pub skills: Option<Vec<String>>,
    pub university_pattern: Option<String>,
    pub graduation_year: Option<i32>,
    pub location_pattern: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

impl SearchFilters {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

/// `ILIKE` substring pattern with the wildcard characters escaped.
pub fn like_pattern(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let escaped = trimmed
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

impl From<SearchQuery> for SearchFilters {
    fn from(query: SearchQuery) -> Self {
        let skills = query
            .skills
            .map(|raw| normalize_skills(raw.split(',').map(str::to_string).collect()))
            .filter(|s| !s.is_empty());
        Self {
            text_pattern: like_pattern(query.q.as_deref()),
            skills,
            university_pattern: like_pattern(query.university.as_deref()),
            graduation_year: query.graduation_year,
            location_pattern: like_pattern(query.location.as_deref()),
            page: query.page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        }
    }
}
