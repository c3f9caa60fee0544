use thiserror::Error;

/// Errors that can occur while loading or converting a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A sentence block is missing required fields, or its parallel
    /// arrays would end up misaligned.
    #[error("malformed corpus at line {line}: {reason}")]
    MalformedCorpus {
        /// 1-based line number of the offending line (0 when not tied to a line).
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// The external format conversion step failed.
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// The interchange document does not match the expected nested shape.
    #[error("malformed interchange document: {0}")]
    MalformedInterchange(String),

    /// Filesystem error from the underlying reader or writer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),
}

impl CorpusError {
    /// Create a malformed corpus error for the given line.
    pub fn malformed<S: Into<String>>(line: usize, reason: S) -> Self {
        CorpusError::MalformedCorpus {
            line,
            reason: reason.into(),
        }
    }

    /// Create a conversion error with a custom message.
    pub fn conversion<S: Into<String>>(msg: S) -> Self {
        CorpusError::Conversion(msg.into())
    }
}

impl From<serde_json::Error> for CorpusError {
    fn from(err: serde_json::Error) -> Self {
        match err.classify() {
            serde_json::error::Category::Io => CorpusError::Io(err.into()),
            _ => CorpusError::MalformedInterchange(err.to_string()),
        }
    }
}

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;
