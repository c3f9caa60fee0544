//! # Format converters
//!
//! Rewrite a CoNLL-U corpus into the JSON interchange format on disk.
//! [`SpacyCliConverter`] delegates to `spacy convert`; [`NativeConverter`]
//! produces the same layout in-process.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;
use tracing::{debug, info};

use crate::conllu::SentenceBlocks;
use crate::error::{CorpusError, Result};
use crate::interchange::{
    InterchangeDocument, InterchangeSentence, group_documents, write_interchange,
};

/// The only output format tag the interchange reader understands.
pub const JSON_FORMAT: &str = "json";

/// Path of the interchange file a converter writes for `input`:
/// `<output_dir>/<input stem>.json`.
pub fn interchange_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".");
    name.push(JSON_FORMAT);
    output_dir.join(name)
}

/// Something that rewrites a corpus file into an interchange document.
pub trait FormatConverter: Send + Sync {
    /// Converts `input` into `file_type` inside `output_dir` and returns the
    /// path of the written file.
    ///
    /// # Errors
    ///
    /// Returns `CorpusError::Conversion` when the conversion cannot be
    /// performed: unsupported language or format, a failing tool, or an
    /// output file that cannot be written.
    fn convert(&self, input: &Path, output_dir: &Path, file_type: &str, lang: &str)
    -> Result<PathBuf>;
}

/// Runs `python -m spacy convert`.
#[derive(Debug, Clone)]
pub struct SpacyCliConverter {
    /// Python interpreter with spaCy installed.
    pub python: PathBuf,
    /// Sentences per output document.
    pub n_sents: usize,
}

impl Default for SpacyCliConverter {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            n_sents: 1,
        }
    }
}

impl SpacyCliConverter {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            ..Self::default()
        }
    }

    /// Set the number of sentences per document.
    pub fn with_n_sents(mut self, n_sents: usize) -> Self {
        self.n_sents = n_sents.max(1);
        self
    }

    fn command(&self, input: &Path, output_dir: &Path, file_type: &str, lang: &str) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "spacy", "convert"])
            .arg(input)
            .arg(output_dir)
            .args(["--file-type", file_type])
            .args(["--n-sents", &self.n_sents.to_string()])
            .args(["--converter", "auto"])
            .args(["--lang", lang]);
        cmd
    }
}

impl FormatConverter for SpacyCliConverter {
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        file_type: &str,
        lang: &str,
    ) -> Result<PathBuf> {
        let mut cmd = self.command(input, output_dir, file_type, lang);
        debug!(?cmd, "running spacy convert");

        let output = cmd.output().map_err(|e| {
            CorpusError::conversion(format!(
                "failed to run {}: {e}",
                self.python.display()
            ))
        })?;

        if !output.status.success() {
            return Err(CorpusError::conversion(format!(
                "spacy convert exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let path = interchange_path(input, output_dir);
        info!(input = %input.display(), output = %path.display(), "converted corpus with spacy");
        Ok(path)
    }
}

/// Writes the interchange file directly from the streaming CoNLL-U reader.
///
/// Output matches `spacy convert` for the fields this crate reads: relative
/// heads, `ROOT` for the root relation, XPOS (or UPOS) as `tag`. Reading the
/// corpus fails with `CorpusError::Io`; writing the result fails with
/// `CorpusError::Conversion`.
#[derive(Debug, Clone)]
pub struct NativeConverter {
    /// Sentences per output document.
    pub n_sents: usize,
    re_lang: Regex,
}

impl NativeConverter {
    /// # Errors
    ///
    /// Returns `CorpusError::Regex` if the language pattern fails to
    /// compile (should never happen with the static pattern defined here).
    pub fn new() -> Result<Self> {
        Ok(Self {
            n_sents: 1,
            re_lang: Regex::new(r"^(?:[a-z]{2,3}|xx)$")?,
        })
    }

    /// Set the number of sentences per document.
    pub fn with_n_sents(mut self, n_sents: usize) -> Self {
        self.n_sents = n_sents.max(1);
        self
    }

    fn check(&self, file_type: &str, lang: &str) -> Result<()> {
        if file_type != JSON_FORMAT {
            return Err(CorpusError::conversion(format!(
                "unsupported output format {file_type:?}"
            )));
        }
        if !self.re_lang.is_match(lang) {
            return Err(CorpusError::conversion(format!(
                "unsupported language code {lang:?}"
            )));
        }
        Ok(())
    }
}

fn write_documents(path: &Path, docs: &[InterchangeDocument]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_interchange(&mut writer, docs)?;
    writer.flush()?;
    Ok(())
}

impl FormatConverter for NativeConverter {
    fn convert(
        &self,
        input: &Path,
        output_dir: &Path,
        file_type: &str,
        lang: &str,
    ) -> Result<PathBuf> {
        self.check(file_type, lang)?;

        let sentences = SentenceBlocks::open(input)?
            .map(|block| block.map(|b| InterchangeSentence::from_block(&b)))
            .collect::<Result<Vec<_>>>()?;
        let count = sentences.len();
        let docs = group_documents(sentences, self.n_sents);

        let path = interchange_path(input, output_dir);
        write_documents(&path, &docs).map_err(|e| {
            CorpusError::conversion(format!("failed to write {}: {e}", path.display()))
        })?;

        info!(
            input = %input.display(),
            output = %path.display(),
            sentences = count,
            documents = docs.len(),
            "converted corpus"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interchange::read_interchange;
    use crate::types::Traversal;

    const CORPUS: &str = "\
# text = Dogs chase cats
1\tDogs\tdog\tNOUN\tNNS\t_\t2\tnsubj\t_\t_
2\tchase\tchase\tVERB\tVBP\t_\t0\troot\t_\t_
3\tcats\tcat\tNOUN\t_\t_\t2\tobj\t_\t_

# text = Hi
1\tHi\thi\tINTJ\tUH\t_\t0\troot\t_\t_
";

    fn write_corpus(dir: &Path) -> PathBuf {
        let path = dir.join("train.conllu");
        std::fs::write(&path, CORPUS).unwrap();
        path
    }

    #[test]
    fn interchange_path_replaces_extension() {
        let path = interchange_path(Path::new("/data/ud/train.conllu"), Path::new("/out"));
        assert_eq!(path, PathBuf::from("/out/train.json"));

        let path = interchange_path(Path::new("en_ewt-ud.v2.conllu"), Path::new("out"));
        assert_eq!(path, PathBuf::from("out/en_ewt-ud.v2.json"));
    }

    #[test]
    fn native_converter_writes_one_document_per_sentence() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());

        let out = NativeConverter::new()
            .unwrap()
            .convert(&input, dir.path(), JSON_FORMAT, "en")
            .unwrap();
        assert_eq!(out, dir.path().join("train.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(raw.as_array().unwrap().len(), 2);
        let first = &raw[0]["paragraphs"][0]["sentences"][0]["tokens"];
        assert_eq!(first[0]["tag"], "NNS");
        assert_eq!(first[2]["tag"], "NOUN");
        assert_eq!(first[2]["head"], -1);
        assert_eq!(first[1]["dep"], "ROOT");
        assert_eq!(first[0]["dep"], "nsubj");

        let first_only = read_interchange(&out, Traversal::FirstDocumentOnly).unwrap();
        assert_eq!(first_only.len(), 1);
    }

    #[test]
    fn native_converter_groups_sentences() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());

        let out = NativeConverter::new()
            .unwrap()
            .with_n_sents(10)
            .convert(&input, dir.path(), JSON_FORMAT, "de")
            .unwrap();
        let data = read_interchange(&out, Traversal::FirstDocumentOnly).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn native_converter_rejects_unknown_language() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());
        let err = NativeConverter::new()
            .unwrap()
            .convert(&input, dir.path(), JSON_FORMAT, "English")
            .unwrap_err();
        assert!(matches!(err, CorpusError::Conversion(_)));
    }

    #[test]
    fn native_converter_reports_unwritable_output_as_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());
        let missing = dir.path().join("missing").join("sub");
        let err = NativeConverter::new()
            .unwrap()
            .convert(&input, &missing, JSON_FORMAT, "en")
            .unwrap_err();
        match err {
            CorpusError::Conversion(msg) => assert!(msg.contains("missing")),
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn native_converter_rejects_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());
        let err = NativeConverter::new()
            .unwrap()
            .convert(&input, dir.path(), "msg", "en")
            .unwrap_err();
        assert!(err.to_string().contains("msg"));
    }

    #[test]
    fn spacy_converter_reports_missing_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_corpus(dir.path());
        let err = SpacyCliConverter::new("/nonexistent/python-for-tests")
            .convert(&input, dir.path(), JSON_FORMAT, "en")
            .unwrap_err();
        assert!(matches!(err, CorpusError::Conversion(_)));
    }

    #[test]
    fn spacy_command_line() {
        let converter = SpacyCliConverter::default().with_n_sents(3);
        let cmd = converter.command(Path::new("a.conllu"), Path::new("out"), "json", "fr");
        let args: Vec<_> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-m", "spacy", "convert", "a.conllu", "out", "--file-type", "json", "--n-sents",
                "3", "--converter", "auto", "--lang", "fr"
            ]
        );
    }
}
