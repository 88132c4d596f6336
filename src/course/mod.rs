//! Course documents: the structured model and the parser that produces it.
//!
//! A raw course document is turned into one [`Course`] with its ordered
//! [`Lesson`]s, plus the context-prefixed [`CourseChunk`]s that get indexed.

mod parser;

pub use parser::{context_prefix, CourseParser, ParsedCourse};

use serde::{Deserialize, Serialize};

/// A course, identified by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Unique, case-sensitive course title.
    pub title: String,
    /// Course landing page.
    pub link: Option<String>,
    /// Course instructor.
    pub instructor: Option<String>,
    /// Lessons in document order.
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Create a course with no lessons.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: None,
            instructor: None,
            lessons: Vec::new(),
        }
    }

    /// Find a lesson by its number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within the course.
    pub number: u32,
    /// Lesson title (empty for the implicit lesson of an unstructured document).
    pub title: String,
    /// Lesson page.
    pub link: Option<String>,
}

/// A chunk of lesson text, ready to be embedded and stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Context-prefixed chunk text.
    pub text: String,
    /// Title of the owning course.
    pub course_title: String,
    /// Number of the lesson this chunk was cut from.
    pub lesson_number: Option<u32>,
    /// Position within the course's chunk sequence.
    pub chunk_index: usize,
}

impl CourseChunk {
    /// Storage key for this chunk. Stable across re-indexing of the same course.
    pub fn storage_id(&self) -> String {
        chunk_storage_id(&self.course_title, self.chunk_index)
    }
}

/// Build the content-collection key for a course chunk.
///
/// The title's byte length prefixes the key so that no two (title, index)
/// pairs share an id, whatever characters the titles contain.
pub fn chunk_storage_id(course_title: &str, chunk_index: usize) -> String {
    format!("{}:{}_{}", course_title.len(), course_title, chunk_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_storage_id() {
        let chunk = CourseChunk {
            text: "text".to_string(),
            course_title: "Intro to Rust".to_string(),
            lesson_number: Some(1),
            chunk_index: 7,
        };
        assert_eq!(chunk.storage_id(), "13:Intro to Rust_7");
    }

    #[test]
    fn test_chunk_storage_id_is_unambiguous() {
        assert_ne!(chunk_storage_id("Intro Rust", 0), chunk_storage_id("Intro_Rust", 0));
        assert_ne!(chunk_storage_id("A_1", 2), chunk_storage_id("A", 12));
        assert_ne!(chunk_storage_id("A_1", 0), chunk_storage_id("A", 10));
    }

    #[test]
    fn test_lesson_lookup() {
        let mut course = Course::new("Test Course");
        course.lessons.push(Lesson {
            number: 3,
            title: "Third".to_string(),
            link: Some("https://example.com/3".to_string()),
        });

        assert_eq!(course.lesson(3).map(|l| l.title.as_str()), Some("Third"));
        assert!(course.lesson(1).is_none());
    }
}
