//! # Streaming CoNLL-U reader
//!
//! Groups lines into sentence blocks one block at a time, so memory use is
//! bounded by the longest sentence rather than the corpus size.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use regex::Regex;
use tracing::debug;

use super::block::{Block, RecordShape, parse_token_line};
use crate::error::{CorpusError, Result};
use crate::types::SentenceRecord;

/// Lazy iterator over the sentence blocks of a CoNLL-U stream.
///
/// The iterator is finite and cannot be restarted. After the first error
/// it yields `None`.
pub struct SentenceBlocks<R> {
    lines: Lines<R>,
    line_no: usize,
    re_comment: Regex,
    done: bool,
}

impl SentenceBlocks<BufReader<File>> {
    /// Opens a corpus file for block-at-a-time reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(path = %path.display(), "opened CoNLL-U corpus");
        Self::new(BufReader::new(file))
    }
}

impl<R: BufRead> SentenceBlocks<R> {
    /// Wraps any buffered reader.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::Regex` if the comment pattern fails to compile
    /// (should never happen with the static pattern defined here).
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            lines: reader.lines(),
            line_no: 0,
            re_comment: Regex::new(r"^#\s*(?P<key>[^=]*?)\s*(?:=\s*(?P<value>.*?))?\s*$")?,
            done: false,
        })
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    fn fail(&mut self, err: CorpusError) -> Option<Result<Block>> {
        self.done = true;
        Some(Err(err))
    }

    fn finish(&mut self, block: Block) -> Option<Result<Block>> {
        if block.tokens.is_empty() {
            return self.fail(CorpusError::malformed(
                block.start_line,
                "sentence block has no token lines",
            ));
        }
        Some(Ok(block))
    }

    fn push_comment(&self, block: &mut Block, line: &str) {
        if let Some(caps) = self.re_comment.captures(line) {
            let key = caps.name("key").map_or("", |m| m.as_str());
            let value = caps.name("value").map_or("", |m| m.as_str());
            block.metadata.push((key.to_string(), value.to_string()));
        }
    }
}

impl<R: BufRead> Iterator for SentenceBlocks<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut current: Option<Block> = None;

        loop {
            let line = match self.lines.next() {
                Some(Ok(line)) => line,
                Some(Err(e)) => return self.fail(e.into()),
                None => {
                    self.done = true;
                    return match current {
                        Some(block) => self.finish(block),
                        None => None,
                    };
                }
            };
            self.line_no += 1;
            let line_no = self.line_no;

            if line.trim().is_empty() {
                match current.take() {
                    Some(block) => return self.finish(block),
                    None => continue,
                }
            }

            let block = current.get_or_insert_with(|| Block::new(line_no));

            if line.starts_with('#') {
                self.push_comment(block, &line);
                continue;
            }

            match parse_token_line(&line, line_no) {
                Ok(Some(token)) => {
                    if let Err(e) = block.push_token(token) {
                        return self.fail(e);
                    }
                }
                Ok(None) => {}
                Err(e) => return self.fail(e),
            }
        }
    }
}

/// Lazy iterator of training records read from a CoNLL-U stream.
///
/// Owns the underlying reader; the file is closed when the stream is
/// dropped, whether or not it was read to the end.
pub struct RecordStream<R> {
    blocks: SentenceBlocks<R>,
    shape: RecordShape,
    failed: bool,
}

impl<R: BufRead> RecordStream<R> {
    pub fn new(blocks: SentenceBlocks<R>, shape: RecordShape) -> Self {
        Self {
            blocks,
            shape,
            failed: false,
        }
    }

    pub fn shape(&self) -> RecordShape {
        self.shape
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = Result<SentenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self
            .blocks
            .next()?
            .and_then(|block| block.into_record(self.shape));
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}

/// Opens `path` and returns a lazy stream of records in the given shape.
pub fn records<P: AsRef<Path>>(
    path: P,
    shape: RecordShape,
) -> Result<RecordStream<BufReader<File>>> {
    Ok(RecordStream::new(SentenceBlocks::open(path)?, shape))
}
