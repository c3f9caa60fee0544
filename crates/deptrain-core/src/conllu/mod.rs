pub mod block;
pub mod reader;

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::types::Dataset;

pub use block::{Block, RecordShape, TokenLine};
pub use reader::{RecordStream, SentenceBlocks, records};

/// Loads a corpus with each record's content set to the sentence text.
///
/// Fails on the first malformed block; no partial dataset is returned.
pub fn parse_as_text<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    collect(path.as_ref(), RecordShape::Text)
}

/// Loads a corpus with each record's content set to its token forms.
///
/// Fails on the first malformed block; no partial dataset is returned.
pub fn parse_as_tokens<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    collect(path.as_ref(), RecordShape::Tokens)
}

fn collect(path: &Path, shape: RecordShape) -> Result<Dataset> {
    let dataset = records(path, shape)?.collect::<Result<Dataset>>()?;
    info!(
        path = %path.display(),
        sentences = dataset.len(),
        ?shape,
        "loaded CoNLL-U corpus"
    );
    Ok(dataset)
}
