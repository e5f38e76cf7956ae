//! Job-application tracker.

pub mod handlers;

use std::collections::BTreeMap;

use crate::models::application::ApplicationStatus;

pub const MAX_TEXT_FIELD_LENGTH: usize = 200;

/// Per-status counts with every status present, zero when unused.
pub fn count_by_status<'a>(statuses: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = ApplicationStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();
    for status in statuses {
        *counts.entry(status.to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} is required"));
    }
    if value.chars().count() > MAX_TEXT_FIELD_LENGTH {
        return Err(format!(
            "{field} must be at most {MAX_TEXT_FIELD_LENGTH} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_include_every_status() {
        let counts = count_by_status(["applied", "applied", "offer"]);
        assert_eq!(counts.len(), ApplicationStatus::ALL.len());
        assert_eq!(counts["applied"], 2);
        assert_eq!(counts["offer"], 1);
        assert_eq!(counts["rejected"], 0);
    }

    #[test]
    fn test_required_fields() {
        assert!(validate_required("company", "Acme").is_ok());
        assert!(validate_required("company", "   ").is_err());
        assert!(validate_required("company", &"a".repeat(201)).is_err());
    }
}
