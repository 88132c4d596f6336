//! Course document parser.
//!
//! Documents are read line by line through a small state machine:
//!
//! ```text
//! Header ──(lesson marker)──────────────▶ Lesson ◀─┐
//!   │                                       │      │ (lesson marker)
//!   └──(other text)──▶ Preamble ──(marker)──┘──────┘
//! ```
//!
//! The header block holds `Course Title:`, `Course Link:` and
//! `Course Instructor:` fields. A document that never reaches the `Lesson`
//! state becomes a single implicit lesson numbered 0.

use super::{Course, CourseChunk, Lesson};
use crate::chunking::SentenceChunker;
use crate::error::{PensumError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, instrument, warn};

const TITLE_MARKER: &str = "Course Title:";
const LINK_MARKER: &str = "Course Link:";
const INSTRUCTOR_MARKER: &str = "Course Instructor:";

static LESSON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.*)$").expect("valid lesson regex"));

static LESSON_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^lesson\s+link\s*:\s*(.*)$").expect("valid lesson link regex"));

/// A parsed course with its chunks.
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub course: Course,
    pub chunks: Vec<CourseChunk>,
}

/// Context header prepended to every chunk before indexing.
pub fn context_prefix(course_title: &str, lesson_number: Option<u32>) -> String {
    match lesson_number {
        Some(number) => format!("Course {} Lesson {} content:", course_title, number),
        None => format!("Course {} content:", course_title),
    }
}

/// Parses raw course documents and chunks their lessons.
pub struct CourseParser {
    chunker: SentenceChunker,
}

impl CourseParser {
    /// Create a parser that chunks lessons with the given chunker.
    pub fn new(chunker: SentenceChunker) -> Self {
        Self { chunker }
    }

    /// Read and parse a document from disk.
    #[instrument(skip(self))]
    pub fn parse_file(&self, path: &Path) -> Result<ParsedCourse> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content).map_err(|e| match e {
            PensumError::MalformedDocument(reason) => {
                PensumError::MalformedDocument(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Parse a document into a course and its context-prefixed chunks.
    pub fn parse(&self, text: &str) -> Result<ParsedCourse> {
        let document = DocumentReader::default().read(text)?;

        let mut chunks = Vec::new();
        for block in &document.blocks {
            let prefix = context_prefix(&document.course.title, Some(block.number));
            for piece in self.chunker.chunk(&block.content) {
                chunks.push(CourseChunk {
                    text: format!("{} {}", prefix, piece),
                    course_title: document.course.title.clone(),
                    lesson_number: Some(block.number),
                    chunk_index: chunks.len(),
                });
            }
        }

        debug!(
            "Parsed course '{}' into {} lessons and {} chunks",
            document.course.title,
            document.course.lessons.len(),
            chunks.len()
        );

        Ok(ParsedCourse {
            course: document.course,
            chunks,
        })
    }
}

/// Raw content of one lesson, before chunking.
#[derive(Debug)]
struct LessonBlock {
    number: u32,
    content: String,
}

#[derive(Debug)]
struct ParsedDocument {
    course: Course,
    blocks: Vec<LessonBlock>,
}

#[derive(Debug)]
struct OpenLesson {
    lesson: Lesson,
    lines: Vec<String>,
}

#[derive(Debug)]
enum ReaderState {
    Header,
    Preamble,
    Lesson(OpenLesson),
}

#[derive(Debug, Default)]
struct Header {
    title: Option<String>,
    link: Option<String>,
    instructor: Option<String>,
}

struct DocumentReader {
    state: ReaderState,
    header: Header,
    preamble: Vec<String>,
    lessons: Vec<(Lesson, Vec<String>)>,
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self {
            state: ReaderState::Header,
            header: Header::default(),
            preamble: Vec::new(),
            lessons: Vec::new(),
        }
    }
}

impl DocumentReader {
    fn read(mut self, text: &str) -> Result<ParsedDocument> {
        for line in text.lines() {
            let state = std::mem::replace(&mut self.state, ReaderState::Preamble);
            self.state = self.step(state, line);
        }
        if let ReaderState::Lesson(open) = std::mem::replace(&mut self.state, ReaderState::Preamble) {
            self.close_lesson(open);
        }
        self.finish()
    }

    fn step(&mut self, state: ReaderState, line: &str) -> ReaderState {
        let trimmed = line.trim();

        match state {
            ReaderState::Header => {
                if trimmed.is_empty() {
                    return ReaderState::Header;
                }
                if self.read_header_field(trimmed) {
                    return ReaderState::Header;
                }
                match parse_lesson_marker(trimmed) {
                    Some(lesson) => ReaderState::Lesson(OpenLesson {
                        lesson,
                        lines: Vec::new(),
                    }),
                    None => {
                        self.preamble.push(line.to_string());
                        ReaderState::Preamble
                    }
                }
            }
            ReaderState::Preamble => match parse_lesson_marker(trimmed) {
                Some(lesson) => ReaderState::Lesson(OpenLesson {
                    lesson,
                    lines: Vec::new(),
                }),
                None => {
                    self.preamble.push(line.to_string());
                    ReaderState::Preamble
                }
            },
            ReaderState::Lesson(mut open) => {
                if let Some(lesson) = parse_lesson_marker(trimmed) {
                    self.close_lesson(open);
                    return ReaderState::Lesson(OpenLesson {
                        lesson,
                        lines: Vec::new(),
                    });
                }

                let awaiting_link = open.lesson.link.is_none()
                    && open.lines.iter().all(|l| l.trim().is_empty());
                if awaiting_link {
                    if let Some(caps) = LESSON_LINK.captures(trimmed) {
                        open.lesson.link = parse_link(caps[1].trim());
                        return ReaderState::Lesson(open);
                    }
                }

                open.lines.push(line.to_string());
                ReaderState::Lesson(open)
            }
        }
    }

    /// Record a header field. Returns false when the line is not a header field.
    fn read_header_field(&mut self, line: &str) -> bool {
        if let Some(value) = line.strip_prefix(TITLE_MARKER) {
            let value = value.trim();
            if !value.is_empty() {
                self.header.title = Some(value.to_string());
            }
            true
        } else if let Some(value) = line.strip_prefix(LINK_MARKER) {
            self.header.link = parse_link(value.trim());
            true
        } else if let Some(value) = line.strip_prefix(INSTRUCTOR_MARKER) {
            let value = value.trim();
            self.header.instructor = (!value.is_empty()).then(|| value.to_string());
            true
        } else {
            false
        }
    }

    fn close_lesson(&mut self, open: OpenLesson) {
        match self
            .lessons
            .iter_mut()
            .find(|(lesson, _)| lesson.number == open.lesson.number)
        {
            Some((existing, lines)) => {
                warn!(
                    "Lesson {} appears more than once, merging its content",
                    existing.number
                );
                if existing.link.is_none() {
                    existing.link = open.lesson.link;
                }
                lines.extend(open.lines);
            }
            None => self.lessons.push((open.lesson, open.lines)),
        }
    }

    fn finish(self) -> Result<ParsedDocument> {
        let title = self.header.title.ok_or_else(|| {
            PensumError::MalformedDocument(format!("missing '{}' header", TITLE_MARKER))
        })?;

        let mut course = Course {
            title,
            link: self.header.link,
            instructor: self.header.instructor,
            lessons: Vec::new(),
        };

        let preamble = join_lines(&self.preamble);
        let mut blocks = Vec::new();

        if self.lessons.is_empty() {
            course.lessons.push(Lesson {
                number: 0,
                title: String::new(),
                link: None,
            });
            blocks.push(LessonBlock {
                number: 0,
                content: preamble,
            });
        } else {
            for (i, (lesson, lines)) in self.lessons.into_iter().enumerate() {
                let mut content = join_lines(&lines);
                if i == 0 && !preamble.is_empty() {
                    content = if content.is_empty() {
                        preamble.clone()
                    } else {
                        format!("{}\n{}", preamble, content)
                    };
                }
                blocks.push(LessonBlock {
                    number: lesson.number,
                    content,
                });
                course.lessons.push(lesson);
            }
        }

        Ok(ParsedDocument { course, blocks })
    }
}

fn parse_lesson_marker(line: &str) -> Option<Lesson> {
    let caps = LESSON_MARKER.captures(line)?;
    let number = caps[1].parse::<u32>().ok()?;
    Some(Lesson {
        number,
        title: caps[2].trim().to_string(),
        link: None,
    })
}

fn parse_link(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    match url::Url::parse(value) {
        Ok(_) => Some(value.to_string()),
        Err(e) => {
            warn!("Ignoring invalid link '{}': {}", value, e);
            None
        }
    }
}

fn join_lines(lines: &[String]) -> String {
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> CourseParser {
        CourseParser::new(SentenceChunker::new(800, 100))
    }

    const SAMPLE: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/0
Welcome to the course. We will look at computer use.

Lesson 1: API Basics
Lesson Link: https://example.com/computer-use/1
In this lesson you make your first request. Authentication comes first.
";

    #[test]
    fn test_parse_header_and_lessons() {
        let parsed = parser().parse(SAMPLE).unwrap();
        let course = &parsed.course;

        assert_eq!(course.title, "Building Towards Computer Use");
        assert_eq!(course.link.as_deref(), Some("https://example.com/computer-use"));
        assert_eq!(course.instructor.as_deref(), Some("Colt Steele"));
        assert_eq!(course.lessons.len(), 2);
        assert_eq!(course.lessons[0].number, 0);
        assert_eq!(course.lessons[0].title, "Introduction");
        assert_eq!(
            course.lessons[1].link.as_deref(),
            Some("https://example.com/computer-use/1")
        );
    }

    #[test]
    fn test_chunk_prefix_matches_lesson_block() {
        let parsed = parser().parse(SAMPLE).unwrap();

        assert_eq!(parsed.chunks.len(), 2);
        for chunk in &parsed.chunks {
            let number = chunk.lesson_number.unwrap();
            let prefix = format!("Course Building Towards Computer Use Lesson {} content:", number);
            assert!(chunk.text.starts_with(&prefix), "bad prefix: {}", chunk.text);
        }
        assert!(parsed.chunks[0].text.contains("Welcome to the course."));
        assert!(parsed.chunks[1].text.contains("first request"));
        assert!(!parsed.chunks[1].text.contains("Lesson Link"));
        assert_eq!(parsed.chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_missing_title_is_malformed() {
        let err = parser()
            .parse("Course Instructor: Nobody\n\nLesson 1: Intro\nHello there.")
            .unwrap_err();
        assert!(matches!(err, PensumError::MalformedDocument(_)));
    }

    #[test]
    fn test_no_lesson_markers_becomes_implicit_lesson() {
        let parsed = parser()
            .parse("Course Title: Loose Notes\n\nSome notes without structure. They still count.")
            .unwrap();

        assert_eq!(parsed.course.lessons.len(), 1);
        assert_eq!(parsed.course.lessons[0].number, 0);
        assert!(parsed.course.lessons[0].title.is_empty());
        assert_eq!(parsed.chunks.len(), 1);
        assert_eq!(parsed.chunks[0].lesson_number, Some(0));
        assert_eq!(
            parsed.chunks[0].text,
            "Course Loose Notes Lesson 0 content: Some notes without structure. They still count."
        );
    }

    #[test]
    fn test_preamble_joins_first_lesson() {
        let text = "Course Title: Preamble Course\nAn overview paragraph.\nLesson 2: Second\nBody text.";
        let parsed = parser().parse(text).unwrap();

        assert_eq!(parsed.course.lessons.len(), 1);
        assert_eq!(parsed.chunks.len(), 1);
        assert!(parsed.chunks[0].text.contains("An overview paragraph."));
        assert!(parsed.chunks[0].text.contains("Body text."));
        assert_eq!(parsed.chunks[0].lesson_number, Some(2));
    }

    #[test]
    fn test_invalid_link_is_dropped() {
        let parsed = parser()
            .parse("Course Title: Links\nCourse Link: not a url\n\nLesson 1: One\nText.")
            .unwrap();
        assert!(parsed.course.link.is_none());
    }

    #[test]
    fn test_non_contiguous_lesson_numbers() {
        let text = "Course Title: Gaps\n\nLesson 1: One\nFirst.\n\nLesson 5: Five\nFifth.";
        let parsed = parser().parse(text).unwrap();
        let numbers: Vec<u32> = parsed.course.lessons.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![1, 5]);
    }

    #[test]
    fn test_context_prefix_without_lesson() {
        assert_eq!(context_prefix("Rust", None), "Course Rust content:");
        assert_eq!(context_prefix("Rust", Some(2)), "Course Rust Lesson 2 content:");
    }
}
