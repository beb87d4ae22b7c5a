use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Native error body returned by both backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details
    pub error: ErrorBody,
}

/// Error details within an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub message: String,
    /// HTTP-style code, numeric or stringified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// Module or component that failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Service request identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error code as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    /// Numeric code
    Number(i64),
    /// String code
    Text(String),
}

impl ErrorEnvelope {
    /// Status derived from the code; missing or out-of-range codes map to 500
    pub fn status(&self) -> StatusCode {
        let code = match &self.error.code {
            Some(ErrorCode::Number(n)) => Some(*n),
            Some(ErrorCode::Text(s)) => s.trim().parse().ok(),
            None => None,
        };
        code.and_then(|c| u16::try_from(c).ok())
            .filter(|c| (100..=599).contains(c))
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Parse an envelope embedded somewhere inside `text`
    pub fn parse_embedded(text: &str) -> Option<Self> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str(&text[start..=end]).ok()
    }
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error.location {
            Some(location) => write!(f, "{} (at {location})", self.error.message),
            None => f.write_str(&self.error.message),
        }
    }
}

impl std::error::Error for ErrorEnvelope {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope(code: serde_json::Value) -> ErrorEnvelope {
        serde_json::from_value(json!({"error": {"message": "x", "code": code}})).unwrap()
    }

    #[test]
    fn code_maps_to_status() {
        assert_eq!(envelope(json!(401)).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(envelope(json!("429")).status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn out_of_range_code_falls_back_to_500() {
        assert_eq!(envelope(json!(42)).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope(json!(1000)).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope(json!(-1)).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope(json!("bad")).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn embedded_envelope_is_found() {
        let text = r#"request failed: {"error": {"message": "quota", "code": 429}} (attempt 1)"#;
        let parsed = ErrorEnvelope::parse_embedded(text).unwrap();
        assert_eq!(parsed.error.message, "quota");
        assert!(ErrorEnvelope::parse_embedded("no json here").is_none());
        assert!(ErrorEnvelope::parse_embedded(r#"{"unrelated": true}"#).is_none());
    }
}
