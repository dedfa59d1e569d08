use thiserror::Error;

/// Failures of the upstream UniProt collaborator.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("entry not found: {0}")]
    NotFound(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("UniProt API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode UniProt response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound(_))
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceError::Decode(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}
