//! # Sentence blocks
//!
//! The in-memory form of one CoNLL-U sentence: its comment metadata and
//! the basic-tree token lines, before they are projected onto a
//! [`SentenceRecord`].

use crate::error::{CorpusError, Result};
use crate::types::{Content, SentenceRecord};

/// Minimum number of tab-separated columns a token line must carry
/// (ID, FORM, LEMMA, UPOS, XPOS, FEATS, HEAD, DEPREL).
pub const MIN_FIELDS: usize = 8;

/// One syntactic word of a sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLine {
    /// 1-based word index within the sentence.
    pub id: usize,
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub xpos: String,
    /// Index of the governing word, 0 for the root.
    pub head: i64,
    pub deprel: String,
    /// Line number in the source file.
    pub line: usize,
}

impl TokenLine {
    /// The most specific part-of-speech tag available.
    pub fn tag(&self) -> &str {
        if self.xpos.is_empty() || self.xpos == "_" {
            &self.upos
        } else {
            &self.xpos
        }
    }
}

/// Which representation a record's content takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Text,
    Tokens,
}

/// A parsed sentence block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Line number of the first line of the block.
    pub start_line: usize,
    /// `# key = value` comments in file order; bare comments have an empty value.
    pub metadata: Vec<(String, String)>,
    pub tokens: Vec<TokenLine>,
}

impl Block {
    pub(crate) fn new(start_line: usize) -> Self {
        Self {
            start_line,
            metadata: Vec::new(),
            tokens: Vec::new(),
        }
    }

    /// Looks up a metadata value. Later comments override earlier ones.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The sentence's declared raw text.
    pub fn text(&self) -> Option<&str> {
        self.meta("text")
    }

    pub(crate) fn push_token(&mut self, token: TokenLine) -> Result<()> {
        let expected = self.tokens.len() + 1;
        if token.id != expected {
            return Err(CorpusError::malformed(
                token.line,
                format!("expected token id {expected}, found {}", token.id),
            ));
        }
        self.tokens.push(token);
        Ok(())
    }

    /// Projects the block onto a training record.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::MalformedCorpus` when `shape` is
    /// [`RecordShape::Text`] and the block declares no `text` metadata.
    pub fn into_record(self, shape: RecordShape) -> Result<SentenceRecord> {
        let content = match shape {
            RecordShape::Text => match self.text() {
                Some(text) => Content::Text(text.to_string()),
                None => {
                    return Err(CorpusError::malformed(
                        self.start_line,
                        "sentence block has no `# text =` metadata",
                    ));
                }
            },
            RecordShape::Tokens => {
                Content::Tokens(self.tokens.iter().map(|t| t.form.clone()).collect())
            }
        };

        let (heads, deps) = self
            .tokens
            .into_iter()
            .map(|t| (t.head, t.deprel))
            .unzip();

        SentenceRecord::new(content, heads, deps)
    }
}

/// `3-4` (multi-word token range) or `5.1` (empty node).
fn is_range_or_empty_node(id: &str) -> bool {
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    id.split_once('-')
        .or_else(|| id.split_once('.'))
        .is_some_and(|(lo, hi)| digits(lo) && digits(hi))
}

/// Parses a single token line.
///
/// Returns `Ok(None)` for multi-word token ranges (`3-4`) and empty nodes
/// (`5.1`), which sit outside the basic dependency tree.
pub fn parse_token_line(line: &str, line_no: usize) -> Result<Option<TokenLine>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_FIELDS {
        return Err(CorpusError::malformed(
            line_no,
            format!(
                "expected at least {MIN_FIELDS} tab-separated fields, found {}",
                fields.len()
            ),
        ));
    }

    let id = fields[0].trim();
    if is_range_or_empty_node(id) {
        return Ok(None);
    }
    let id: usize = id
        .parse()
        .map_err(|_| CorpusError::malformed(line_no, format!("invalid token id {id:?}")))?;

    let form = fields[1];
    if form.is_empty() {
        return Err(CorpusError::malformed(line_no, "missing FORM field"));
    }

    let head = fields[6].trim();
    if head.is_empty() || head == "_" {
        return Err(CorpusError::malformed(line_no, "missing HEAD field"));
    }
    let head: i64 = match head.parse() {
        Ok(h) if h >= 0 => h,
        _ => {
            return Err(CorpusError::malformed(
                line_no,
                format!("invalid HEAD field {head:?}"),
            ));
        }
    };

    let deprel = fields[7].trim();
    if deprel.is_empty() || deprel == "_" {
        return Err(CorpusError::malformed(line_no, "missing DEPREL field"));
    }

    Ok(Some(TokenLine {
        id,
        form: form.to_string(),
        lemma: fields[2].to_string(),
        upos: fields[3].to_string(),
        xpos: fields[4].to_string(),
        head,
        deprel: deprel.to_string(),
        line: line_no,
    }))
}
