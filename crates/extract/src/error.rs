use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a response line could not be decomposed.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 4 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("actor field has no role tag: {0}")]
    MissingRoleTag(String),

    #[error("unknown role tag: ({0})")]
    UnknownRoleTag(String),

    #[error("actor list mixes role tags: {0}")]
    MixedRoleTags(String),

    #[error("substrate field has no (substrate) tag: {0}")]
    MissingSubstrateTag(String),

    #[error("site field is neither N/A nor tagged (location): {0}")]
    MissingLocationTag(String),

    #[error("substrate name is empty")]
    EmptySubstrate,
}

/// Per-annotation extraction failures. None of these abort a run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("annotation text is empty")]
    EmptyInput,

    #[error("text generation timed out after {0}s")]
    Timeout(u64),

    #[error("text generation transport error: {0}")]
    Transport(String),

    #[error("text generation API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unexpected text generation response: {0}")]
    Decode(String),
}

impl ExtractError {
    /// Failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Timeout(_) | ExtractError::Transport(_) => true,
            ExtractError::Api { status, .. } => *status == 429 || *status >= 500,
            ExtractError::EmptyInput | ExtractError::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for ExtractError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ExtractError::Decode(e.to_string())
        } else {
            ExtractError::Transport(e.to_string())
        }
    }
}
