//! Conversions between canonical types and the shared chat wire format

pub mod messages;
pub mod tools;
pub mod usage;

pub use messages::{ConvertOptions, convert_messages, escape_template_delimiters, unescape_template_delimiters};
pub use tools::{convert_tools, response_format_value, tool_choice_value};
pub use usage::{convert_usage, merge_usage};
