//! # Corpus Loader
//!
//! Single entry point for turning a CoNLL-U corpus into training records,
//! in any of the three [`InputFormat`] shapes.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::conllu::{self, RecordShape};
use crate::convert::{FormatConverter, JSON_FORMAT, NativeConverter};
use crate::error::Result;
use crate::interchange::read_interchange;
use crate::types::{Dataset, InputFormat, Traversal};

/// Loads corpora into [`Dataset`]s.
///
/// Holds only immutable configuration, so one loader can serve any number
/// of files, from any number of threads.
pub struct CorpusLoader {
    converter: Box<dyn FormatConverter>,
    traversal: Traversal,
    output_dir: Option<PathBuf>,
}

impl CorpusLoader {
    /// Create a loader that converts with the given converter.
    pub fn new(converter: Box<dyn FormatConverter>) -> Self {
        Self {
            converter,
            traversal: Traversal::default(),
            output_dir: None,
        }
    }

    /// Create a loader using the in-process converter with one sentence
    /// per interchange document.
    pub fn native() -> Result<Self> {
        Ok(Self::new(Box::new(NativeConverter::new()?)))
    }

    /// Set how multi-document interchange files are read.
    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    /// Write interchange files here instead of next to the corpus.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn traversal(&self) -> Traversal {
        self.traversal
    }

    /// Directory the interchange file for `path` is written to.
    pub fn output_dir_for(&self, path: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        }
    }

    /// Records whose content is the sentence's `# text =` metadata.
    pub fn parse_as_text<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        conllu::parse_as_text(path)
    }

    /// Records whose content is the sentence's token forms.
    pub fn parse_as_tokens<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        conllu::parse_as_tokens(path)
    }

    /// Lazy record stream over a corpus.
    pub fn stream<P: AsRef<Path>>(
        &self,
        path: P,
        shape: RecordShape,
    ) -> Result<conllu::RecordStream<std::io::BufReader<std::fs::File>>> {
        conllu::records(path, shape)
    }

    /// Converts the corpus to the interchange format, then reads it back as
    /// token records.
    ///
    /// # Errors
    ///
    /// `CorpusError::Conversion` when the converter fails, and
    /// `CorpusError::MalformedInterchange` when its output is not shaped as
    /// expected.
    pub fn convert_via_interchange<P: AsRef<Path>>(&self, path: P, lang: &str) -> Result<Dataset> {
        let path = path.as_ref();
        let output_dir = self.output_dir_for(path);
        let json = self
            .converter
            .convert(path, &output_dir, JSON_FORMAT, lang)?;
        read_interchange(json, self.traversal)
    }

    /// Loads `path` in the requested format.
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
        format: InputFormat,
        lang: &str,
    ) -> Result<Dataset> {
        let path = path.as_ref();
        info!(path = %path.display(), %format, "loading corpus");
        match format {
            InputFormat::ConlluToSpacy => self.convert_via_interchange(path, lang),
            InputFormat::ConlluToText => self.parse_as_text(path),
            InputFormat::ConlluToTokens => self.parse_as_tokens(path),
        }
    }
}
