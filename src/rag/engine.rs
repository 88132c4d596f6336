//! The query engine.

use super::{QueryResponse, QueryState};
use crate::agent::{parse_tool_call, tool_specs, Source, ToolContext, ToolOutput};
use crate::config::Prompts;
use crate::error::{PensumError, Result};
use crate::generation::{ChatMessage, Decision, GenerationRequest, Generator, ToolRequest};
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tool result sent when the model asks for a second tool in one query.
const TOOL_UNAVAILABLE: &str =
    "Tool unavailable: the tool limit for this question has been reached. Answer with the information you already have.";

/// RAG engine for question answering.
pub struct RagEngine {
    generator: Arc<dyn Generator>,
    tools: ToolContext,
    sessions: Arc<SessionStore>,
    prompts: Prompts,
}

impl RagEngine {
    pub fn new(generator: Arc<dyn Generator>, tools: ToolContext, sessions: Arc<SessionStore>) -> Self {
        Self {
            generator,
            tools,
            sessions,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer a question within a session, creating the session if needed.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryResponse> {
        let session_id = self.sessions.get_or_create(session_id);
        info!("Processing query in session {}", session_id);

        let mut request = GenerationRequest {
            system: self.system_prompt(&session_id),
            messages: vec![ChatMessage::user(self.prompts.render_query(query))],
            tools: tool_specs(),
        };
        let mut sources: Vec<Source> = Vec::new();
        let mut refused_extra_tool = false;

        let mut state = QueryState::Received;
        let answer = loop {
            state = match state {
                QueryState::Received => match self.generator.generate(&request).await? {
                    Decision::Answer(text) => QueryState::Answered(text),
                    Decision::ToolRequest(call) => QueryState::ToolInvoked(call),
                },
                QueryState::ToolInvoked(call) => {
                    let output = self.run_tool(&call).await;
                    sources = output.sources;
                    request.messages.push(ChatMessage::ToolRequest(call.clone()));
                    request.messages.push(ChatMessage::tool_result(call.id, output.text));
                    request.tools.clear();
                    QueryState::ToolResultIncorporated
                }
                QueryState::ToolResultIncorporated => match self.generator.generate(&request).await? {
                    Decision::Answer(text) => QueryState::Answered(text),
                    Decision::ToolRequest(extra) => {
                        if refused_extra_tool {
                            return Err(PensumError::Generation(format!(
                                "Model kept requesting tools after the limit was reached (last: {})",
                                extra.name
                            )));
                        }
                        warn!("Refusing second tool call '{}' for this query", extra.name);
                        refused_extra_tool = true;
                        request.messages.push(ChatMessage::ToolRequest(extra.clone()));
                        request
                            .messages
                            .push(ChatMessage::tool_result(extra.id, TOOL_UNAVAILABLE));
                        QueryState::ToolResultIncorporated
                    }
                },
                QueryState::Answered(text) => break text,
            };
        };

        self.sessions.append_exchange(&session_id, query, &answer);
        debug!("Answered with {} sources", sources.len());

        Ok(QueryResponse {
            answer,
            sources,
            session_id,
        })
    }

    fn system_prompt(&self, session_id: &str) -> String {
        let system = self.prompts.system_prompt();
        match self.sessions.format_history(session_id) {
            Some(history) => format!(
                "{}\n\n{}\n{}",
                system, self.prompts.assistant.history_header, history
            ),
            None => system,
        }
    }

    /// Run a requested tool. Failures become text for the model.
    async fn run_tool(&self, call: &ToolRequest) -> ToolOutput {
        info!("Model calling tool: {} with args: {}", call.name, call.arguments);

        let tool = match parse_tool_call(&call.name, &call.arguments) {
            Ok(tool) => tool,
            Err(e) => {
                warn!("Rejected tool call: {}", e);
                return ToolOutput {
                    text: format!("Failed to parse tool call: {}", e),
                    sources: Vec::new(),
                };
            }
        };

        match self.tools.execute(&tool).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {}", call.name, e);
                ToolOutput {
                    text: format!("Search failed: {}", e),
                    sources: Vec::new(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SEARCH_TOOL;
    use crate::chunking::SentenceChunker;
    use crate::course::CourseParser;
    use crate::embedding::LocalEmbedder;
    use crate::index::CourseIndex;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays fixed decisions and records every request.
    struct ScriptedGenerator {
        script: Mutex<VecDeque<Decision>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Decision>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<Decision> {
            self.requests.lock().unwrap().push(request.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| PensumError::Generation("script exhausted".to_string()))
        }
    }

    fn search(id: &str, arguments: &str) -> Decision {
        Decision::ToolRequest(ToolRequest {
            id: id.to_string(),
            name: SEARCH_TOOL.to_string(),
            arguments: arguments.to_string(),
        })
    }

    async fn engine(generator: Arc<ScriptedGenerator>) -> RagEngine {
        let index = Arc::new(CourseIndex::new(
            Arc::new(MemoryVectorStore::new()),
            Arc::new(LocalEmbedder::default()),
        ));
        let parsed = CourseParser::new(SentenceChunker::new(800, 100))
            .parse("Course Title: Rust Basics\n\nLesson 1: Ownership\nEvery value has one owner.")
            .unwrap();
        index.index_course(&parsed.course, &parsed.chunks).await.unwrap();

        RagEngine::new(generator, ToolContext::new(index, 5), Arc::new(SessionStore::new(4)))
    }

    #[tokio::test]
    async fn test_direct_answer_skips_tools() {
        let generator = ScriptedGenerator::new(vec![Decision::Answer("42".to_string())]);
        let engine = engine(generator.clone()).await;

        let response = engine.query("What is six times seven?", None).await.unwrap();
        assert_eq!(response.answer, "42");
        assert!(response.sources.is_empty());

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools.len(), 2);
        assert_eq!(
            requests[0].messages,
            vec![ChatMessage::user(
                "Answer this question about course materials: What is six times seven?"
            )]
        );
    }

    #[tokio::test]
    async fn test_tool_result_is_fed_back_without_tools() {
        let generator = ScriptedGenerator::new(vec![
            search("call_1", r#"{"query": "owner", "course_name": "Rust"}"#),
            Decision::Answer("One owner.".to_string()),
        ]);
        let engine = engine(generator.clone()).await;

        let response = engine.query("Who owns a value?", None).await.unwrap();
        assert_eq!(response.answer, "One owner.");
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].course_title, "Rust Basics");

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].tools.is_empty());
        match &requests[1].messages[2] {
            ChatMessage::ToolResult { id, content } => {
                assert_eq!(id, "call_1");
                assert!(content.starts_with("[Rust Basics - Lesson 1]"));
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_tool_request_is_refused_once() {
        let generator = ScriptedGenerator::new(vec![
            search("call_1", r#"{"query": "owner"}"#),
            search("call_2", r#"{"query": "borrow"}"#),
            Decision::Answer("Done.".to_string()),
        ]);
        let engine = engine(generator.clone()).await;

        let response = engine.query("Explain ownership and borrowing", None).await.unwrap();
        assert_eq!(response.answer, "Done.");

        let requests = generator.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests[2].messages.last(),
            Some(&ChatMessage::tool_result("call_2", TOOL_UNAVAILABLE))
        );
    }

    #[tokio::test]
    async fn test_persistent_tool_requests_fail() {
        let generator = ScriptedGenerator::new(vec![
            search("call_1", r#"{"query": "a"}"#),
            search("call_2", r#"{"query": "b"}"#),
            search("call_3", r#"{"query": "c"}"#),
        ]);
        let engine = engine(generator).await;

        let err = engine.query("loop forever", None).await.unwrap_err();
        assert!(matches!(err, PensumError::Generation(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_session_untouched() {
        let generator = ScriptedGenerator::new(Vec::new());
        let engine = engine(generator).await;

        let session = engine.sessions().get_or_create(None);
        assert!(engine.query("hello", Some(&session)).await.is_err());
        assert!(engine.sessions().history(&session).is_empty());
    }

    #[tokio::test]
    async fn test_history_goes_into_system_prompt() {
        let generator = ScriptedGenerator::new(vec![
            Decision::Answer("First answer".to_string()),
            Decision::Answer("Second answer".to_string()),
        ]);
        let engine = engine(generator.clone()).await;

        let first = engine.query("First question", None).await.unwrap();
        let second = engine.query("Second question", Some(&first.session_id)).await.unwrap();
        assert_eq!(first.session_id, second.session_id);

        let requests = generator.requests();
        assert!(!requests[0].system.contains("Previous conversation:"));
        assert!(requests[1]
            .system
            .ends_with("\n\nPrevious conversation:\nUser: First question\nAssistant: First answer"));
        assert_eq!(
            requests[1].messages,
            vec![ChatMessage::user(
                "Answer this question about course materials: Second question"
            )]
        );
    }

    #[tokio::test]
    async fn test_malformed_tool_call_is_reported_to_model() {
        let generator = ScriptedGenerator::new(vec![
            search("call_1", "{not json"),
            Decision::Answer("Sorry.".to_string()),
        ]);
        let engine = engine(generator.clone()).await;

        let response = engine.query("anything", None).await.unwrap();
        assert!(response.sources.is_empty());
        match &generator.requests()[1].messages[2] {
            ChatMessage::ToolResult { content, .. } => {
                assert!(content.starts_with("Failed to parse tool call"))
            }
            other => panic!("expected tool result, got {:?}", other),
        }
    }
}
