use crate::protocol::chat::ChatUsage;
use crate::types::{InputTokens, OutputTokens, Usage};

/// Convert backend usage; counters the backend omitted stay `None`
pub fn convert_usage(usage: &ChatUsage) -> Usage {
    let cache_read = usage.prompt_tokens_details.as_ref().and_then(|d| d.cached_tokens);
    let cache_write = usage
        .prompt_tokens_details
        .as_ref()
        .and_then(|d| d.cache_creation_tokens);
    let reasoning = usage
        .completion_tokens_details
        .as_ref()
        .and_then(|d| d.reasoning_tokens);

    Usage {
        input_tokens: InputTokens {
            total: usage.prompt_tokens,
            no_cache: usage
                .prompt_tokens
                .map(|total| total.saturating_sub(cache_read.unwrap_or(0))),
            cache_read,
            cache_write,
        },
        output_tokens: OutputTokens {
            total: usage.completion_tokens,
            text: usage
                .completion_tokens
                .map(|total| total.saturating_sub(reasoning.unwrap_or(0))),
            reasoning,
        },
        raw: serde_json::to_value(usage).ok(),
    }
}

/// Overlay `next` on `current`, field by field; reported values win
pub fn merge_usage(current: &mut Usage, next: Usage) {
    fn take(slot: &mut Option<u64>, value: Option<u64>) {
        if value.is_some() {
            *slot = value;
        }
    }

    take(&mut current.input_tokens.total, next.input_tokens.total);
    take(&mut current.input_tokens.no_cache, next.input_tokens.no_cache);
    take(&mut current.input_tokens.cache_read, next.input_tokens.cache_read);
    take(&mut current.input_tokens.cache_write, next.input_tokens.cache_write);
    take(&mut current.output_tokens.total, next.output_tokens.total);
    take(&mut current.output_tokens.text, next.output_tokens.text);
    take(&mut current.output_tokens.reasoning, next.output_tokens.reasoning);
    if next.raw.is_some() {
        current.raw = next.raw;
    }
}
