//! Tools the model can call while answering a question.
//!
//! The model may search course content or fetch a course outline. Each
//! call returns the text handed back to the model and the sources it drew
//! on.

mod tools;

pub use tools::{
    format_outline, parse_tool_call, tool_specs, Source, ToolCall, ToolContext, ToolOutput,
    OUTLINE_TOOL, SEARCH_TOOL,
};
