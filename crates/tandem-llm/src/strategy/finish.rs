use crate::types::{FinishReason, UnifiedFinishReason};

/// Raw finish reason to unified category
pub type FinishTable = &'static [(&'static str, UnifiedFinishReason)];

/// Orchestration finish reasons; the service forwards several model families
pub static ORCHESTRATION_FINISH: FinishTable = &[
    ("stop", UnifiedFinishReason::Stop),
    ("end_turn", UnifiedFinishReason::Stop),
    ("stop_sequence", UnifiedFinishReason::Stop),
    ("eos", UnifiedFinishReason::Stop),
    ("length", UnifiedFinishReason::Length),
    ("max_tokens", UnifiedFinishReason::Length),
    ("max_tokens_reached", UnifiedFinishReason::Length),
    ("content_filter", UnifiedFinishReason::ContentFilter),
    ("tool_calls", UnifiedFinishReason::ToolCalls),
    ("tool_call", UnifiedFinishReason::ToolCalls),
    ("tool_use", UnifiedFinishReason::ToolCalls),
    ("function_call", UnifiedFinishReason::ToolCalls),
    ("error", UnifiedFinishReason::Error),
];

/// Foundation-models finish reasons
pub static FOUNDATION_FINISH: FinishTable = &[
    ("stop", UnifiedFinishReason::Stop),
    ("length", UnifiedFinishReason::Length),
    ("content_filter", UnifiedFinishReason::ContentFilter),
    ("tool_calls", UnifiedFinishReason::ToolCalls),
    ("function_call", UnifiedFinishReason::ToolCalls),
];

/// Unify a raw finish reason; unknown values map to `other` with the raw kept
pub fn map_finish_reason(raw: Option<&str>, table: FinishTable) -> FinishReason {
    let Some(raw) = raw else {
        return FinishReason::default();
    };

    let unified = table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(raw))
        .map_or(UnifiedFinishReason::Other, |(_, unified)| *unified);

    FinishReason {
        unified,
        raw: Some(raw.to_owned()),
    }
}
