//! Canonical messages to backend chat messages

use crate::error::{LlmError, UnifiedError};
use crate::protocol::chat::{ChatContent, ChatContentPart, ChatFunctionCall, ChatImageUrl, ChatMessage, ChatToolCall};
use crate::types::{Message, Part, Role};

/// Inserted between the two characters of a template delimiter
const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// Characters that open a template directive when preceded by `{`
const DELIMITER_SECONDS: [char; 3] = ['{', '%', '#'];

/// Switches for message conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Forward reasoning parts as `<think>` text
    pub include_reasoning: bool,
    /// Break up `{{`, `{%` and `{#` in text
    pub escape_template_delimiters: bool,
}

/// Convert a canonical prompt into backend chat messages
///
/// Tool-role messages expand to one backend message per result.
///
/// # Errors
///
/// Returns a configuration error for parts the role cannot carry, such as
/// files, or images outside user messages
pub fn convert_messages(messages: &[Message], options: ConvertOptions) -> Result<Vec<ChatMessage>, LlmError> {
    let mut out = Vec::with_capacity(messages.len());

    for (index, message) in messages.iter().enumerate() {
        match message.role {
            Role::System => out.push(convert_system(message, index, options)?),
            Role::User => out.push(convert_user(message, index, options)?),
            Role::Assistant => out.push(convert_assistant(message, index, options)?),
            Role::Tool => out.extend(convert_tool(message, index)?),
        }
    }

    Ok(out)
}

/// Escape template delimiters by splitting them with a zero-width space
///
/// A `{` already followed by zero-width spaces and a delimiter character
/// gets one more, so [`unescape_template_delimiters`] is an exact inverse.
pub fn escape_template_delimiters(text: &str) -> String {
    rewrite_delimiters(text, |run| Some(run + 1))
}

/// Reverse [`escape_template_delimiters`]
pub fn unescape_template_delimiters(text: &str) -> String {
    rewrite_delimiters(text, |run| run.checked_sub(1))
}

/// Resize every zero-width run between `{` and a delimiter character
///
/// `resize` gets the run length and returns the new one, or `None` to
/// keep the run as is.
fn rewrite_delimiters(text: &str, resize: impl Fn(usize) -> Option<usize>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c != '{' {
            continue;
        }

        let run = chars[i..].iter().take_while(|&&z| z == ZERO_WIDTH_SPACE).count();
        let delimited = chars.get(i + run).is_some_and(|next| DELIMITER_SECONDS.contains(next));
        if let Some(len) = resize(run).filter(|_| delimited) {
            out.extend(std::iter::repeat_n(ZERO_WIDTH_SPACE, len));
            i += run;
        }
    }

    out
}

fn unsupported(part: &Part, role: Role, index: usize) -> LlmError {
    UnifiedError::config(format!(
        "unsupported '{}' part in {role} message at index {index}",
        part.kind()
    ))
    .into()
}

fn prepare_text(text: &str, options: ConvertOptions) -> String {
    if options.escape_template_delimiters {
        escape_template_delimiters(text)
    } else {
        text.to_owned()
    }
}

fn think(text: &str) -> String {
    format!("<think>{text}</think>")
}

fn convert_system(message: &Message, index: usize, options: ConvertOptions) -> Result<ChatMessage, LlmError> {
    let mut text = String::new();

    for part in &message.content {
        match part {
            Part::Text { text: t } => text.push_str(&prepare_text(t, options)),
            Part::Reasoning { text: t } if options.include_reasoning => {
                text.push_str(&prepare_text(&think(t), options));
            }
            Part::Reasoning { .. } => {}
            other => return Err(unsupported(other, message.role, index)),
        }
    }

    Ok(ChatMessage::text("system", text))
}

fn push_text(parts: &mut Vec<ChatContentPart>, text: String) {
    match parts.last_mut() {
        Some(ChatContentPart::Text { text: last }) => last.push_str(&text),
        _ => parts.push(ChatContentPart::Text { text }),
    }
}

fn convert_user(message: &Message, index: usize, options: ConvertOptions) -> Result<ChatMessage, LlmError> {
    let mut parts: Vec<ChatContentPart> = Vec::new();

    for part in &message.content {
        match part {
            Part::Text { text } => push_text(&mut parts, prepare_text(text, options)),
            Part::Reasoning { text } if options.include_reasoning => {
                push_text(&mut parts, prepare_text(&think(text), options));
            }
            Part::Reasoning { .. } => {}
            Part::Image { url, .. } => parts.push(ChatContentPart::ImageUrl {
                image_url: ChatImageUrl {
                    url: url.clone(),
                    detail: None,
                },
            }),
            other => return Err(unsupported(other, message.role, index)),
        }
    }

    let content = if message.has_image() {
        ChatContent::Parts(parts)
    } else {
        let text = parts
            .into_iter()
            .map(|p| match p {
                ChatContentPart::Text { text } => text,
                ChatContentPart::ImageUrl { .. } => String::new(),
            })
            .collect();
        ChatContent::Text(text)
    };

    Ok(ChatMessage {
        role: "user".to_owned(),
        content: Some(content),
        tool_calls: None,
        tool_call_id: None,
    })
}

fn convert_assistant(message: &Message, index: usize, options: ConvertOptions) -> Result<ChatMessage, LlmError> {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in &message.content {
        match part {
            Part::Text { text: t } => text.push_str(&prepare_text(t, options)),
            Part::Reasoning { text: t } if options.include_reasoning => {
                text.push_str(&prepare_text(&think(t), options));
            }
            Part::Reasoning { .. } => {}
            Part::ToolCall { id, name, input } => tool_calls.push(ChatToolCall {
                id: id.clone(),
                tool_type: "function".to_owned(),
                function: ChatFunctionCall {
                    name: name.clone(),
                    arguments: match input {
                        serde_json::Value::String(raw) => raw.clone(),
                        other => other.to_string(),
                    },
                },
            }),
            other => return Err(unsupported(other, message.role, index)),
        }
    }

    let content = (!text.is_empty() || tool_calls.is_empty()).then(|| ChatContent::Text(text));

    Ok(ChatMessage {
        role: "assistant".to_owned(),
        content,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        tool_call_id: None,
    })
}

fn convert_tool(message: &Message, index: usize) -> Result<Vec<ChatMessage>, LlmError> {
    message
        .content
        .iter()
        .map(|part| match part {
            Part::ToolResult { id, output, .. } => Ok(ChatMessage {
                role: "tool".to_owned(),
                content: Some(ChatContent::Text(output.render())),
                tool_calls: None,
                tool_call_id: Some(id.clone()),
            }),
            other => Err(unsupported(other, message.role, index)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::types::ToolOutput;

    fn user(parts: Vec<Part>) -> Message {
        Message {
            role: Role::User,
            content: parts,
        }
    }

    #[test]
    fn adjacent_text_parts_concatenate() {
        let messages = vec![user(vec![Part::text("Hello, "), Part::text("world")])];
        let out = convert_messages(&messages, ConvertOptions::default()).unwrap();
        assert_eq!(out[0].content, Some(ChatContent::Text("Hello, world".to_owned())));
    }

    #[test]
    fn images_become_content_parts() {
        let messages = vec![user(vec![
            Part::text("a"),
            Part::text("b"),
            Part::Image {
                url: "https://example.com/cat.png".to_owned(),
                media_type: Some("image/png".to_owned()),
            },
            Part::text("c"),
        ])];
        let out = convert_messages(&messages, ConvertOptions::default()).unwrap();
        let value = serde_json::to_value(&out[0]).unwrap();
        assert_eq!(
            value["content"],
            json!([
                {"type": "text", "text": "ab"},
                {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}},
                {"type": "text", "text": "c"}
            ])
        );
    }

    #[test]
    fn tool_results_expand_to_separate_messages() {
        let messages = vec![
            Message {
                role: Role::Assistant,
                content: vec![Part::ToolCall {
                    id: "call_1".to_owned(),
                    name: "weather".to_owned(),
                    input: json!({"city": "Paris"}),
                }],
            },
            Message {
                role: Role::Tool,
                content: vec![
                    Part::ToolResult {
                        id: "call_1".to_owned(),
                        name: "weather".to_owned(),
                        output: ToolOutput::Json(json!({"temp": 21})),
                    },
                    Part::ToolResult {
                        id: "call_2".to_owned(),
                        name: "time".to_owned(),
                        output: ToolOutput::Text("noon".to_owned()),
                    },
                ],
            },
        ];

        let out = convert_messages(&messages, ConvertOptions::default()).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].content, None);
        let call = &out[0].tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.function.arguments, r#"{"city":"Paris"}"#);
        assert_eq!(out[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(out[1].content, Some(ChatContent::Text(r#"{"temp":21}"#.to_owned())));
        assert_eq!(out[2].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn reasoning_is_dropped_unless_requested() {
        let messages = vec![Message {
            role: Role::Assistant,
            content: vec![Part::Reasoning { text: "hmm".to_owned() }, Part::text("42")],
        }];

        let out = convert_messages(&messages, ConvertOptions::default()).unwrap();
        assert_eq!(out[0].content, Some(ChatContent::Text("42".to_owned())));

        let options = ConvertOptions {
            include_reasoning: true,
            ..ConvertOptions::default()
        };
        let out = convert_messages(&messages, options).unwrap();
        assert_eq!(out[0].content, Some(ChatContent::Text("<think>hmm</think>42".to_owned())));
    }

    #[test]
    fn file_parts_are_rejected_as_configuration_errors() {
        let messages = vec![user(vec![Part::File {
            url: "https://example.com/a.pdf".to_owned(),
            media_type: "application/pdf".to_owned(),
        }])];

        let err = convert_messages(&messages, ConvertOptions::default()).unwrap_err();
        let unified = err.as_unified().unwrap();
        assert_eq!(unified.kind, ErrorKind::AuthenticationOrConfig);
        assert!(!unified.retryable);
        assert!(unified.message.contains("'file'"));
    }

    #[test]
    fn images_outside_user_messages_are_rejected() {
        let messages = vec![Message {
            role: Role::System,
            content: vec![Part::Image {
                url: "https://example.com/a.png".to_owned(),
                media_type: None,
            }],
        }];
        assert!(convert_messages(&messages, ConvertOptions::default()).is_err());
    }

    #[test]
    fn escaping_breaks_delimiters_and_round_trips() {
        let text = "Use {{name}}, {% if %} and {# note #} but keep { alone and {{{x";
        let escaped = escape_template_delimiters(text);

        assert!(!escaped.contains("{{"));
        assert!(!escaped.contains("{%"));
        assert!(!escaped.contains("{#"));
        assert!(escaped.contains("{ alone"));
        assert_eq!(unescape_template_delimiters(&escaped), text);
    }

    #[test]
    fn text_with_existing_zero_width_spaces_round_trips() {
        for text in ["a{\u{200B}{b", "{\u{200B}\u{200B}%x", "{\u{200B} plain", "{{\u{200B}{"] {
            let escaped = escape_template_delimiters(text);
            assert!(!escaped.contains("{{"));
            assert_eq!(unescape_template_delimiters(&escaped), text, "input {text:?}");
        }

        assert_eq!(escape_template_delimiters("a{\u{200B}{b"), "a{\u{200B}\u{200B}{b");
    }

    #[test]
    fn escaping_applies_to_converted_text() {
        let options = ConvertOptions {
            escape_template_delimiters: true,
            ..ConvertOptions::default()
        };
        let out = convert_messages(&[Message::system("{{x}}")], options).unwrap();
        assert_eq!(out[0].content, Some(ChatContent::Text("{\u{200B}{x}}".to_owned())));
    }
}
