//! # Interchange documents
//!
//! The spaCy v2 JSON training format: an array of documents, each holding
//! paragraphs of sentences of tokens. Only `orth`, `head` and `dep` are
//! required on a token; every other field is optional on input.
//!
//! Heads in this format are relative offsets (`head_position - own_position`,
//! 0 for the root). Records read from it carry those values unchanged.
//! The root relation is spelled `ROOT`, as `spacy convert` writes it.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::conllu::Block;
use crate::error::{CorpusError, Result};
use crate::types::{Content, Dataset, SentenceRecord, Traversal};

/// A top-level document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeDocument {
    #[serde(default)]
    pub id: usize,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub sentences: Vec<InterchangeSentence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeSentence {
    pub tokens: Vec<InterchangeToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeToken {
    #[serde(default)]
    pub id: usize,
    pub orth: String,
    #[serde(default)]
    pub tag: String,
    pub head: i64,
    pub dep: String,
    #[serde(default)]
    pub ner: String,
}

/// Converts a 1-based absolute head (0 = root) at 0-based position
/// `index` into a relative offset.
pub fn relative_head(head: i64, index: usize) -> i64 {
    if head == 0 {
        0
    } else {
        head - 1 - index as i64
    }
}

/// Spells a CoNLL-U relation the way spaCy labels it: `root` becomes
/// `ROOT`, everything else is kept.
pub fn spacy_label(dep: &str) -> &str {
    if dep == "root" { "ROOT" } else { dep }
}

impl InterchangeSentence {
    /// Builds a sentence from a parsed CoNLL-U block, keeping POS tags.
    pub fn from_block(block: &Block) -> Self {
        let tokens = block
            .tokens
            .iter()
            .enumerate()
            .map(|(i, tok)| InterchangeToken {
                id: i,
                orth: tok.form.clone(),
                tag: tok.tag().to_string(),
                head: relative_head(tok.head, i),
                dep: spacy_label(&tok.deprel).to_string(),
                ner: "O".to_string(),
            })
            .collect();
        Self { tokens }
    }

    /// Builds a sentence from a tokenized record whose heads are 1-based.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::MalformedCorpus` for records holding raw text,
    /// which carry no token boundaries.
    pub fn from_record(record: &SentenceRecord) -> Result<Self> {
        let forms = record.content().tokens().ok_or_else(|| {
            CorpusError::malformed(0, "interchange output needs tokenized records, not raw text")
        })?;
        let tokens = forms
            .iter()
            .zip(record.heads())
            .zip(record.deps())
            .enumerate()
            .map(|(i, ((orth, &head), dep))| InterchangeToken {
                id: i,
                orth: orth.clone(),
                tag: String::new(),
                head: relative_head(head, i),
                dep: spacy_label(dep).to_string(),
                ner: "O".to_string(),
            })
            .collect();
        Ok(Self { tokens })
    }

    fn into_record(self) -> Result<SentenceRecord> {
        let mut forms = Vec::with_capacity(self.tokens.len());
        let mut heads = Vec::with_capacity(self.tokens.len());
        let mut deps = Vec::with_capacity(self.tokens.len());
        for tok in self.tokens {
            forms.push(tok.orth);
            heads.push(tok.head);
            deps.push(tok.dep);
        }
        SentenceRecord::new(Content::Tokens(forms), heads, deps)
    }
}

/// Groups sentences into documents of `n_sents` sentences each, one
/// paragraph per document.
pub fn group_documents<I>(sentences: I, n_sents: usize) -> Vec<InterchangeDocument>
where
    I: IntoIterator<Item = InterchangeSentence>,
{
    let n_sents = n_sents.max(1);
    let mut docs: Vec<InterchangeDocument> = Vec::new();
    let mut pending = Vec::with_capacity(n_sents);

    for sentence in sentences {
        pending.push(sentence);
        if pending.len() == n_sents {
            docs.push(InterchangeDocument {
                id: docs.len(),
                paragraphs: vec![Paragraph {
                    sentences: std::mem::take(&mut pending),
                }],
            });
        }
    }
    if !pending.is_empty() {
        docs.push(InterchangeDocument {
            id: docs.len(),
            paragraphs: vec![Paragraph { sentences: pending }],
        });
    }
    docs
}

/// Flattens documents into token records.
///
/// With [`Traversal::FirstDocumentOnly`] everything after the first
/// document is dropped, matching older tooling.
pub fn documents_to_dataset(
    docs: Vec<InterchangeDocument>,
    traversal: Traversal,
) -> Result<Dataset> {
    let limit = match traversal {
        Traversal::AllDocuments => docs.len(),
        Traversal::FirstDocumentOnly => {
            if docs.len() > 1 {
                warn!(
                    skipped = docs.len() - 1,
                    "reading only the first interchange document"
                );
            }
            1
        }
    };

    docs.into_iter()
        .take(limit)
        .flat_map(|doc| doc.paragraphs)
        .flat_map(|para| para.sentences)
        .map(InterchangeSentence::into_record)
        .collect()
}

/// Reads an interchange file into token records.
pub fn read_interchange<P: AsRef<Path>>(path: P, traversal: Traversal) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let docs: Vec<InterchangeDocument> = serde_json::from_reader(BufReader::new(file))?;
    let documents = docs.len();
    let dataset = documents_to_dataset(docs, traversal)?;
    info!(
        path = %path.display(),
        documents,
        sentences = dataset.len(),
        ?traversal,
        "loaded interchange document"
    );
    Ok(dataset)
}

/// Writes documents as pretty-printed JSON.
pub fn write_interchange<W: Write>(writer: W, docs: &[InterchangeDocument]) -> Result<()> {
    serde_json::to_writer_pretty(writer, docs)?;
    Ok(())
}

/// Writes tokenized records to `path` as an interchange file.
pub fn write_records<P: AsRef<Path>>(
    path: P,
    records: &[SentenceRecord],
    n_sents: usize,
) -> Result<()> {
    let sentences = records
        .iter()
        .map(InterchangeSentence::from_record)
        .collect::<Result<Vec<_>>>()?;
    let docs = group_documents(sentences, n_sents);
    let mut file = File::create(path.as_ref())?;
    write_interchange(&mut file, &docs)?;
    file.flush()?;
    Ok(())
}
