//! Prompt templates for Pensum.
//!
//! The built-in prompts can be replaced by placing a `system.toml` file in
//! the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub assistant: AssistantPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the course assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantPrompts {
    /// System instructions sent with every query.
    pub system: String,
    /// Wraps the user's question. `{{query}}` is replaced with it.
    pub query_template: String,
    /// Heading placed before the conversation history in the system prompt.
    pub history_header: String,
}

impl Default for AssistantPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an AI assistant specialized in course materials and educational content with access to tools for course information.

Available Tools:
1. **search_course_content**: Search within course materials for specific content and detailed educational materials
2. **get_course_outline**: Get complete course information including title, instructor, course link, and all lesson numbers/titles

Tool Usage Guidelines:
- For course outline or structure questions: use get_course_outline
- For questions about specific course content: use search_course_content
- For general knowledge questions: answer from existing knowledge without using a tool
- **One tool call per query maximum**
- Synthesize tool results into accurate, fact-based responses
- If a tool yields no results, state this clearly without offering alternatives

Response Protocol:
- Provide direct answers only, with no meta-commentary about your reasoning or the tools
- Do not mention "based on the search results" or "using the tool"
- For outline questions, include the course title, course link and the complete numbered lesson list when available

All responses must be brief and focused, educational, clear, and supported by examples where they aid understanding.
Provide only the direct answer to what was asked."#
                .to_string(),
            query_template: "Answer this question about course materials: {{query}}".to_string(),
            history_header: "Previous conversation:".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, with an optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let system_path = custom_path.join("system.toml");
            if system_path.exists() {
                let content = std::fs::read_to_string(&system_path)?;
                prompts.assistant = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// The system prompt with custom variables applied.
    pub fn system_prompt(&self) -> String {
        self.render_with_custom(&self.assistant.system, &HashMap::new())
    }

    /// Wrap a user question in the query template.
    pub fn render_query(&self, query: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("query".to_string(), query.to_string());
        self.render_with_custom(&self.assistant.query_template, &vars)
    }
}
