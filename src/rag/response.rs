//! Query responses.

use crate::agent::Source;
use serde::{Deserialize, Serialize};

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: String,
    /// Sources the answer drew on, empty if no tool ran.
    pub sources: Vec<Source>,
    /// The session the exchange was recorded in.
    pub session_id: String,
}

impl QueryResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!("\n{}", source));
                if let Some(link) = &source.link {
                    output.push_str(&format!("\n  {}", link));
                }
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_for_display() {
        let response = QueryResponse {
            answer: "Ownership moves.".to_string(),
            sources: vec![
                Source {
                    course_title: "Rust".to_string(),
                    lesson_number: Some(1),
                    link: Some("https://example.com/rust/1".to_string()),
                },
                Source {
                    course_title: "Rust".to_string(),
                    lesson_number: None,
                    link: None,
                },
            ],
            session_id: "s".to_string(),
        };

        assert_eq!(
            response.format_for_display(),
            "Ownership moves.\n\n--- Sources ---\n\nRust - Lesson 1\n  https://example.com/rust/1\nRust"
        );
    }

    #[test]
    fn test_serializes_for_http() {
        let response = QueryResponse {
            answer: "a".to_string(),
            sources: Vec::new(),
            session_id: "abc".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["session_id"], "abc");
        assert!(json["sources"].as_array().unwrap().is_empty());
    }
}
