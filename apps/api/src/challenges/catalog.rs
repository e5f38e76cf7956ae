//! Built-in challenge set inserted by `POST /api/v1/admin/challenges/seed`.

use serde::Deserialize;

use crate::models::challenge::{ChallengeLanguage, Difficulty, TestCase};

/// A challenge definition before it has an id or counters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeDefinition {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub language: ChallengeLanguage,
    #[serde(default)]
    pub starter_code: String,
    pub test_cases: Vec<TestCase>,
}

impl ChallengeDefinition {
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_slug(&self.slug) {
            return Err(format!(
                "slug '{}' must be 1-64 lowercase letters, digits or '-'",
                self.slug
            ));
        }
        if self.title.trim().is_empty() {
            return Err("title is required".to_string());
        }
        if self.test_cases.is_empty() {
            return Err("at least one test case is required".to_string());
        }
        if let Some(tc) = self.test_cases.iter().find(|tc| tc.name.trim().is_empty()) {
            return Err(format!(
                "test case with expected output '{}' has no name",
                tc.expected_output
            ));
        }
        Ok(())
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 64
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn case(name: &str, input: &str, expected: &str, hidden: bool) -> TestCase {
    TestCase {
        name: name.to_string(),
        input: input.to_string(),
        expected_output: expected.to_string(),
        hidden,
    }
}

pub fn builtin_challenges() -> Vec<ChallengeDefinition> {
    vec![
        ChallengeDefinition {
            slug: "two-fer".to_string(),
            title: "Two Fer".to_string(),
            description: "Read a name from stdin and print \"One for <name>, one for me.\". \
                          When the input is empty, use \"you\" as the name."
                .to_string(),
            difficulty: Difficulty::Easy,
            language: ChallengeLanguage::Python,
            starter_code: "name = input().strip()\n".to_string(),
            test_cases: vec![
                case("named", "Alice", "One for Alice, one for me.", false),
                case("empty", "", "One for you, one for me.", false),
                case("another name", "Bob", "One for Bob, one for me.", true),
            ],
        },
        ChallengeDefinition {
            slug: "reverse-string".to_string(),
            title: "Reverse String".to_string(),
            description: "Read one line from stdin and print it reversed.".to_string(),
            difficulty: Difficulty::Easy,
            language: ChallengeLanguage::Javascript,
            starter_code: "const line = require('fs').readFileSync(0, 'utf8').trim();\n"
                .to_string(),
            test_cases: vec![
                case("word", "stressed", "desserts", false),
                case("sentence", "I'm hungry!", "!yrgnuh m'I", false),
                case("palindrome", "racecar", "racecar", true),
            ],
        },
        ChallengeDefinition {
            slug: "sum-of-multiples".to_string(),
            title: "Sum of Multiples".to_string(),
            description: "Read a limit N from stdin and print the sum of all natural numbers \
                          below N that are multiples of 3 or 5."
                .to_string(),
            difficulty: Difficulty::Medium,
            language: ChallengeLanguage::Python,
            starter_code: "n = int(input())\n".to_string(),
            test_cases: vec![
                case("ten", "10", "23", false),
                case("one", "1", "0", false),
                case("thousand", "1000", "233168", true),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid_and_unique() {
        let defs = builtin_challenges();
        for def in &defs {
            def.validate().unwrap();
        }
        let mut slugs: Vec<_> = defs.iter().map(|d| d.slug.as_str()).collect();
        slugs.sort();
        slugs.dedup();
        assert_eq!(slugs.len(), defs.len());
    }

    #[test]
    fn test_slug_rules() {
        assert!(is_valid_slug("two-fer"));
        assert!(!is_valid_slug("Two-Fer"));
        assert!(!is_valid_slug("-lead"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("has space"));
    }

    #[test]
    fn test_definition_requires_test_cases() {
        let mut def = builtin_challenges().remove(0);
        def.test_cases.clear();
        assert!(def.validate().is_err());
    }
}
