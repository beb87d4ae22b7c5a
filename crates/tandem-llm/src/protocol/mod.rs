//! Wire format types for the two backends

pub mod chat;
pub mod embedding;
pub mod error;
pub mod foundation;
pub mod orchestration;

pub use error::{ErrorBody, ErrorCode, ErrorEnvelope};
