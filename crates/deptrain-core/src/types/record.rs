use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

/// The sentence side of a training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Raw sentence text, as declared by the corpus metadata.
    Text(String),

    /// Surface forms, one per token.
    Tokens(Vec<String>),
}

impl Content {
    /// Number of tokens, or `None` for raw text.
    pub fn token_count(&self) -> Option<usize> {
        match self {
            Self::Text(_) => None,
            Self::Tokens(tokens) => Some(tokens.len()),
        }
    }

    /// The token list, if this is tokenized content.
    pub fn tokens(&self) -> Option<&[String]> {
        match self {
            Self::Text(_) => None,
            Self::Tokens(tokens) => Some(tokens),
        }
    }
}

/// One training example: sentence content plus its gold dependency tree.
///
/// `heads` and `deps` always have the same length, and tokenized content
/// has exactly one token per head. The only way to build a record is
/// [`SentenceRecord::new`], which checks this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecord")]
pub struct SentenceRecord {
    content: Content,
    heads: Vec<i64>,
    deps: Vec<String>,
}

#[derive(Deserialize)]
struct RawRecord {
    content: Content,
    heads: Vec<i64>,
    deps: Vec<String>,
}

impl TryFrom<RawRecord> for SentenceRecord {
    type Error = CorpusError;

    fn try_from(raw: RawRecord) -> Result<Self> {
        Self::new(raw.content, raw.heads, raw.deps)
    }
}

impl SentenceRecord {
    /// Builds a record, rejecting misaligned arrays.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::MalformedCorpus` when `heads` and `deps`
    /// differ in length, or when tokenized content has a different length.
    pub fn new(content: Content, heads: Vec<i64>, deps: Vec<String>) -> Result<Self> {
        if heads.len() != deps.len() {
            return Err(CorpusError::malformed(
                0,
                format!("{} heads but {} dependency labels", heads.len(), deps.len()),
            ));
        }
        if let Some(count) = content.token_count() {
            if count != heads.len() {
                return Err(CorpusError::malformed(
                    0,
                    format!("{count} tokens but {} heads", heads.len()),
                ));
            }
        }
        Ok(Self {
            content,
            heads,
            deps,
        })
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn heads(&self) -> &[i64] {
        &self.heads
    }

    pub fn deps(&self) -> &[String] {
        &self.deps
    }

    /// Number of annotated tokens.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Splits the record into its parts.
    pub fn into_parts(self) -> (Content, Vec<i64>, Vec<String>) {
        (self.content, self.heads, self.deps)
    }
}

/// An ordered sequence of records, in corpus order.
pub type Dataset = Vec<SentenceRecord>;

/// Collects the sorted set of dependency labels used in a dataset.
pub fn dependency_labels(records: &[SentenceRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|record| record.deps().iter().cloned())
        .collect()
}
