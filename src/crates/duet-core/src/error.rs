use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A token that the vocabulary has never seen. Raised at generation
    /// time, there is no fallback token.
    #[error("token '{token}' at position {position} is not in the vocabulary")]
    UnknownToken { token: String, position: usize },

    #[error("integer code {code} is outside the vocabulary (size {size})")]
    UnknownCode { code: u32, size: usize },

    #[error("'{0}' is not a valid token")]
    InvalidToken(String),

    #[error("'{0}' is not a valid pitch name")]
    InvalidPitch(String),

    #[error("window length must be at least 1")]
    InvalidWindowLength,

    #[error("{role} vocabulary does not match: stored {stored} tokens, derived {derived} tokens")]
    VocabularyMismatch {
        role: String,
        stored: usize,
        derived: usize,
    },

    #[error("unknown role '{0}' (expected 'keyboard' or 'string')")]
    UnknownRole(String),
}

impl Error {
    pub fn unknown_token(token: impl Into<String>, position: usize) -> Self {
        Error::UnknownToken {
            token: token.into(),
            position,
        }
    }

    pub fn invalid_token(token: impl Into<String>) -> Self {
        Error::InvalidToken(token.into())
    }

    pub fn invalid_pitch(name: impl Into<String>) -> Self {
        Error::InvalidPitch(name.into())
    }
}
