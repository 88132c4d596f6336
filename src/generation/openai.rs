//! OpenAI chat completions with function tools.

use super::{ChatMessage, Decision, GenerationRequest, Generator, ToolRequest, ToolSpec};
use crate::error::{PensumError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Generator backed by the OpenAI chat completions API.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAIGenerator {
    pub fn new(model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: 800,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_messages(request: &GenerationRequest) -> Result<Vec<ChatCompletionRequestMessage>> {
        let mut messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(|e| PensumError::Generation(e.to_string()))?
                .into(),
        ];

        for message in &request.messages {
            let converted: ChatCompletionRequestMessage = match message {
                ChatMessage::User { content } => ChatCompletionRequestUserMessageArgs::default()
                    .content(content.clone())
                    .build()
                    .map_err(|e| PensumError::Generation(e.to_string()))?
                    .into(),
                ChatMessage::ToolRequest(call) => ChatCompletionRequestAssistantMessageArgs::default()
                    .tool_calls(vec![ChatCompletionMessageToolCall {
                        id: call.id.clone(),
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    }])
                    .build()
                    .map_err(|e| PensumError::Generation(e.to_string()))?
                    .into(),
                ChatMessage::ToolResult { id, content } => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(id.clone())
                    .content(content.clone())
                    .build()
                    .map_err(|e| PensumError::Generation(e.to_string()))?
                    .into(),
            };
            messages.push(converted);
        }

        Ok(messages)
    }

    fn build_tools(specs: &[ToolSpec]) -> Vec<ChatCompletionTool> {
        specs
            .iter()
            .map(|spec| ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name: spec.name.clone(),
                    description: Some(spec.description.clone()),
                    parameters: Some(spec.parameters.clone()),
                    strict: None,
                },
            })
            .collect()
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len(), tools = request.tools.len()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Decision> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(Self::build_messages(request)?)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);

        // The API rejects an empty tools array.
        if !request.tools.is_empty() {
            args.tools(Self::build_tools(&request.tools));
        }

        let completion = args
            .build()
            .map_err(|e| PensumError::Generation(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(completion)
            .await
            .map_err(|e| PensumError::Generation(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PensumError::Generation("No response from model".to_string()))?;

        let mut tool_calls = choice.message.tool_calls.unwrap_or_default();
        if !tool_calls.is_empty() {
            if tool_calls.len() > 1 {
                warn!(
                    "Model requested {} tool calls, only the first is honoured",
                    tool_calls.len()
                );
            }
            let call = tool_calls.swap_remove(0);
            debug!("Model requested tool {}", call.function.name);
            return Ok(Decision::ToolRequest(ToolRequest {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            }));
        }

        Ok(Decision::Answer(choice.message.content.unwrap_or_default()))
    }
}
