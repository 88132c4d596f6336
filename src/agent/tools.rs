//! Tool definitions and implementations exposed to the model.

use crate::course::Course;
use crate::error::{PensumError, Result};
use crate::generation::ToolSpec;
use crate::index::{CourseIndex, SearchResults};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const SEARCH_TOOL: &str = "search_course_content";
pub const OUTLINE_TOOL: &str = "get_course_outline";

/// Available tools for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    /// Search course content, optionally narrowed to a course and lesson.
    SearchCourseContent {
        query: String,
        course_name: Option<String>,
        lesson_number: Option<u32>,
    },

    /// Get a course's title, link, instructor and lesson list.
    GetCourseOutline { course_name: String },
}

/// A citation for content used in an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub link: Option<String>,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lesson_number {
            Some(n) => write!(f, "{} - Lesson {}", self.course_title, n),
            None => write!(f, "{}", self.course_title),
        }
    }
}

/// Text handed back to the model plus the sources it drew on.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub text: String,
    pub sources: Vec<Source>,
}

/// Tool execution context with access to the course index.
pub struct ToolContext {
    index: Arc<CourseIndex>,
    max_results: usize,
}

impl ToolContext {
    pub fn new(index: Arc<CourseIndex>, max_results: usize) -> Self {
        Self { index, max_results }
    }

    /// Execute a tool call. Every call starts with an empty source list.
    #[instrument(skip(self))]
    pub async fn execute(&self, tool: &ToolCall) -> Result<ToolOutput> {
        match tool {
            ToolCall::SearchCourseContent {
                query,
                course_name,
                lesson_number,
            } => {
                self.execute_search(query, course_name.as_deref(), *lesson_number)
                    .await
            }
            ToolCall::GetCourseOutline { course_name } => self.execute_outline(course_name).await,
        }
    }

    async fn execute_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<ToolOutput> {
        let results = self
            .index
            .search(query, course_name, lesson_number, self.max_results)
            .await?;

        if let Some(error) = results.error {
            return Ok(ToolOutput {
                text: error,
                sources: Vec::new(),
            });
        }

        if results.is_empty() {
            return Ok(ToolOutput {
                text: empty_results_message(&results),
                sources: Vec::new(),
            });
        }

        let sources = self.collect_sources(&results).await?;
        info!("Search returned {} hits from {} sources", results.hits.len(), sources.len());

        Ok(ToolOutput {
            text: format_results(&results),
            sources,
        })
    }

    async fn collect_sources(&self, results: &SearchResults) -> Result<Vec<Source>> {
        let mut courses: HashMap<String, Option<Course>> = HashMap::new();
        let mut sources: Vec<Source> = Vec::new();

        for hit in &results.hits {
            let title = &hit.chunk.course_title;
            let lesson_number = hit.chunk.lesson_number;
            if sources
                .iter()
                .any(|s| &s.course_title == title && s.lesson_number == lesson_number)
            {
                continue;
            }

            if !courses.contains_key(title) {
                courses.insert(title.clone(), self.index.course(title).await?);
            }
            let course = courses.get(title).and_then(Option::as_ref);
            let link = match (course, lesson_number) {
                (Some(course), Some(n)) => course.lesson(n).and_then(|l| l.link.clone()),
                (Some(course), None) => course.link.clone(),
                (None, _) => None,
            };

            sources.push(Source {
                course_title: title.clone(),
                lesson_number,
                link,
            });
        }

        Ok(sources)
    }

    async fn execute_outline(&self, course_name: &str) -> Result<ToolOutput> {
        let Some(course) = self.index.course_by_name(course_name).await? else {
            return Ok(ToolOutput {
                text: format!("No course found matching '{}'", course_name),
                sources: Vec::new(),
            });
        };

        debug!("Outline for '{}' resolved to '{}'", course_name, course.title);

        Ok(ToolOutput {
            text: format_outline(&course),
            sources: vec![Source {
                course_title: course.title.clone(),
                lesson_number: None,
                link: course.link.clone(),
            }],
        })
    }
}

fn empty_results_message(results: &SearchResults) -> String {
    let mut message = "No relevant content found".to_string();
    if let Some(title) = &results.course_title {
        message.push_str(&format!(" in course '{}'", title));
    }
    if let Some(n) = results.lesson_number {
        message.push_str(&format!(" in lesson {}", n));
    }
    message.push('.');
    message
}

/// Format hits as `[Course - Lesson n]` headed blocks separated by blank lines.
fn format_results(results: &SearchResults) -> String {
    results
        .hits
        .iter()
        .map(|hit| {
            let header = match hit.chunk.lesson_number {
                Some(n) => format!("[{} - Lesson {}]", hit.chunk.course_title, n),
                None => format!("[{}]", hit.chunk.course_title),
            };
            format!("{}\n{}", header, hit.chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format a course outline for the model.
pub fn format_outline(course: &Course) -> String {
    let mut lines = vec![
        format!("**{}**", course.title),
        format!(
            "Instructor: {}",
            course.instructor.as_deref().unwrap_or("Unknown Instructor")
        ),
        format!(
            "Course Link: {}",
            course.link.as_deref().unwrap_or("No link available")
        ),
        String::new(),
        "**Course Lessons:**".to_string(),
    ];

    if course.lessons.is_empty() {
        lines.push("No lessons available".to_string());
    } else {
        for lesson in &course.lessons {
            if lesson.title.is_empty() {
                lines.push(format!("{}. Lesson {}", lesson.number, lesson.number));
            } else {
                lines.push(format!("{}. {}", lesson.number, lesson.title));
            }
        }
    }

    lines.join("\n")
}

/// Tool specs offered to the model.
pub fn tool_specs() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: SEARCH_TOOL.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolSpec {
            name: OUTLINE_TOOL.to_string(),
            description: "Get the complete outline of a course: title, course link, instructor and \
                          the numbered list of lessons"
                .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work)"
                    }
                },
                "required": ["course_name"]
            }),
        },
    ]
}

/// Parse a tool call from the model's name and JSON arguments.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall> {
    let args: serde_json::Value = serde_json::from_str(arguments)
        .map_err(|e| PensumError::Agent(format!("Invalid tool arguments: {}", e)))?;

    match name {
        SEARCH_TOOL => {
            let query = args["query"]
                .as_str()
                .ok_or_else(|| PensumError::Agent("Missing 'query' argument".to_string()))?
                .to_string();
            let course_name = args["course_name"]
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from);
            let lesson_number = match &args["lesson_number"] {
                serde_json::Value::Null => None,
                serde_json::Value::Number(n) => Some(lesson_from_u64(n.as_u64())?),
                serde_json::Value::String(s) => Some(lesson_from_u64(s.trim().parse().ok())?),
                other => {
                    return Err(PensumError::Agent(format!(
                        "Invalid 'lesson_number' argument: {}",
                        other
                    )))
                }
            };
            Ok(ToolCall::SearchCourseContent {
                query,
                course_name,
                lesson_number,
            })
        }
        OUTLINE_TOOL => {
            let course_name = args["course_name"]
                .as_str()
                .ok_or_else(|| PensumError::Agent("Missing 'course_name' argument".to_string()))?
                .to_string();
            Ok(ToolCall::GetCourseOutline { course_name })
        }
        _ => Err(PensumError::Agent(format!("Unknown tool: {}", name))),
    }
}

fn lesson_from_u64(value: Option<u64>) -> Result<u32> {
    value
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| PensumError::Agent("Invalid 'lesson_number' argument".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::SentenceChunker;
    use crate::course::{CourseParser, Lesson};
    use crate::embedding::LocalEmbedder;
    use crate::vector_store::MemoryVectorStore;

    const DOC: &str = "Course Title: Building Towards Computer Use
Course Link: https://example.com/computer-use
Course Instructor: Colt Steele

Lesson 0: Introduction
Lesson Link: https://example.com/computer-use/0
Welcome to the course. Computer use lets a model operate a desktop.

Lesson 1: API Basics
Lesson Link: https://example.com/computer-use/1
Every request needs an API key. Requests are sent as JSON.
";

    async fn context() -> ToolContext {
        let index = Arc::new(CourseIndex::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(LocalEmbedder::default()),
        ));
        let parsed = CourseParser::new(SentenceChunker::new(800, 100)).parse(DOC).unwrap();
        index.index_course(&parsed.course, &parsed.chunks).await.unwrap();
        ToolContext::new(index, 5)
    }

    #[test]
    fn test_parse_search_tool() {
        let tool = parse_tool_call(
            SEARCH_TOOL,
            r#"{"query": "authentication", "course_name": "MCP", "lesson_number": 2}"#,
        )
        .unwrap();
        assert_eq!(
            tool,
            ToolCall::SearchCourseContent {
                query: "authentication".to_string(),
                course_name: Some("MCP".to_string()),
                lesson_number: Some(2),
            }
        );

        let tool = parse_tool_call(SEARCH_TOOL, r#"{"query": "x", "lesson_number": "3"}"#).unwrap();
        assert!(matches!(tool, ToolCall::SearchCourseContent { lesson_number: Some(3), .. }));
    }

    #[test]
    fn test_parse_rejects_bad_calls() {
        assert!(parse_tool_call(SEARCH_TOOL, r#"{"course_name": "x"}"#).is_err());
        assert!(parse_tool_call(SEARCH_TOOL, r#"{"query": "x", "lesson_number": -1}"#).is_err());
        assert!(parse_tool_call(OUTLINE_TOOL, "not json").is_err());
        assert!(parse_tool_call("delete_everything", "{}").is_err());
    }

    #[test]
    fn test_tool_specs() {
        let specs = tool_specs();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec![SEARCH_TOOL, OUTLINE_TOOL]);
        assert_eq!(specs[1].parameters["required"], serde_json::json!(["course_name"]));
    }

    #[tokio::test]
    async fn test_search_formats_results_and_sources() {
        let tools = context().await;
        let output = tools
            .execute(&ToolCall::SearchCourseContent {
                query: "API key".to_string(),
                course_name: Some("Computer Use".to_string()),
                lesson_number: Some(1),
            })
            .await
            .unwrap();

        assert!(output.text.starts_with("[Building Towards Computer Use - Lesson 1]\n"));
        assert_eq!(
            output.sources,
            vec![Source {
                course_title: "Building Towards Computer Use".to_string(),
                lesson_number: Some(1),
                link: Some("https://example.com/computer-use/1".to_string()),
            }]
        );
        assert_eq!(output.sources[0].to_string(), "Building Towards Computer Use - Lesson 1");
    }

    #[tokio::test]
    async fn test_search_empty_and_unresolved() {
        let tools = context().await;
        let output = tools
            .execute(&ToolCall::SearchCourseContent {
                query: "anything".to_string(),
                course_name: Some("Computer Use".to_string()),
                lesson_number: Some(7),
            })
            .await
            .unwrap();
        assert_eq!(
            output.text,
            "No relevant content found in course 'Building Towards Computer Use' in lesson 7."
        );
        assert!(output.sources.is_empty());

        let empty = ToolContext::new(
            Arc::new(CourseIndex::new(
                Arc::new(MemoryVectorStore::new()),
                Arc::new(LocalEmbedder::default()),
            )),
            5,
        );
        let output = empty
            .execute(&ToolCall::SearchCourseContent {
                query: "anything".to_string(),
                course_name: Some("Quantum Computing".to_string()),
                lesson_number: None,
            })
            .await
            .unwrap();
        assert_eq!(output.text, "No course found matching 'Quantum Computing'");
        assert!(output.sources.is_empty());
    }

    #[tokio::test]
    async fn test_outline() {
        let tools = context().await;
        let output = tools
            .execute(&ToolCall::GetCourseOutline {
                course_name: "computer use".to_string(),
            })
            .await
            .unwrap();

        assert!(output.text.contains("**Building Towards Computer Use**"));
        assert!(output.text.contains("Instructor: Colt Steele"));
        assert!(output.text.contains("Course Link: https://example.com/computer-use"));
        assert!(output.text.contains("**Course Lessons:**"));
        assert!(output.text.contains("0. Introduction"));
        assert!(output.text.contains("1. API Basics"));
        assert_eq!(output.sources.len(), 1);
        assert_eq!(output.sources[0].lesson_number, None);
    }

    #[test]
    fn test_format_outline_minimal() {
        let formatted = format_outline(&Course::new("Minimal Course"));
        assert!(formatted.contains("**Minimal Course**"));
        assert!(formatted.contains("Instructor: Unknown Instructor"));
        assert!(formatted.contains("Course Link: No link available"));
        assert!(formatted.contains("No lessons available"));

        let mut course = Course::new("Loose");
        course.lessons.push(Lesson {
            number: 0,
            title: String::new(),
            link: None,
        });
        assert!(format_outline(&course).contains("0. Lesson 0"));
    }
}
