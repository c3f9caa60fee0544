//! # Parser engines
//!
//! The boundary to the external ML framework. The trainer prepares data
//! and hands it over; fitting, batching and persistence happen on the
//! other side.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use deptrain_core::Content;
use tracing::{debug, info};

use crate::config::TrainConfig;

/// One training run, fully described.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainRequest {
    pub lang: String,
    pub output_dir: PathBuf,
    /// Interchange file with training sentences.
    pub train_json: PathBuf,
    /// Interchange file with development sentences.
    pub dev_json: PathBuf,
    /// Existing model to continue from.
    pub base_model: Option<String>,
    pub n_iter: usize,
    pub gpu: i32,
    pub init_tok2vec: Option<PathBuf>,
}

impl TrainRequest {
    /// Builds a request from the run configuration and prepared files.
    pub fn from_config(config: &TrainConfig, train_json: PathBuf, dev_json: PathBuf) -> Self {
        Self {
            lang: config.lang.clone(),
            output_dir: config.output_dir.clone(),
            train_json,
            dev_json,
            base_model: config.model.clone(),
            n_iter: config.n_iter,
            gpu: config.gpu,
            init_tok2vec: config.init_tok2vec.clone(),
        }
    }
}

/// A dependency parser implementation that can be trained and queried.
pub trait ParserEngine: Send + Sync {
    /// Fits a parser pipeline and saves it to `request.output_dir`.
    fn train(&self, request: &TrainRequest) -> Result<()>;

    /// Parses each sentence with the model in `model_dir` and returns the
    /// predicted dependency label of every token.
    fn parse(&self, model_dir: &Path, sentences: &[Content]) -> Result<Vec<Vec<String>>>;
}

impl<E: ParserEngine + ?Sized> ParserEngine for Arc<E> {
    fn train(&self, request: &TrainRequest) -> Result<()> {
        (**self).train(request)
    }

    fn parse(&self, model_dir: &Path, sentences: &[Content]) -> Result<Vec<Vec<String>>> {
        (**self).parse(model_dir, sentences)
    }
}

/// Reads JSON sentences from stdin, one per line, and prints the predicted
/// labels of each as a JSON array.
const PARSE_SCRIPT: &str = r#"
import json, sys
import spacy
from spacy.tokens import Doc

nlp = spacy.load(sys.argv[1])
for line in sys.stdin:
    item = json.loads(line)
    if isinstance(item, list):
        doc = Doc(nlp.vocab, words=item)
        for _, proc in nlp.pipeline:
            doc = proc(doc)
    else:
        doc = nlp(item)
    print(json.dumps([t.dep_ for t in doc]))
"#;

/// A child that died early breaks the stdin pipe; its exit status and
/// stderr are reported before the write error.
fn check_parse_output(output: &Output, written: io::Result<()>) -> Result<()> {
    if !output.status.success() {
        anyhow::bail!(
            "spacy parse failed with exit code {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    written.context("Failed to send sentences to the parser")
}

/// Drives the spaCy v2 command line.
#[derive(Debug, Clone)]
pub struct SpacyCliEngine {
    python: PathBuf,
}

impl SpacyCliEngine {
    pub fn new(python: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
        }
    }

    fn train_command(&self, request: &TrainRequest) -> Command {
        let mut cmd = Command::new(&self.python);
        cmd.args(["-m", "spacy", "train"])
            .arg(&request.lang)
            .arg(&request.output_dir)
            .arg(&request.train_json)
            .arg(&request.dev_json)
            .args(["--pipeline", "parser"])
            .args(["--n-iter", &request.n_iter.to_string()])
            .args(["--use-gpu", &request.gpu.to_string()]);
        if let Some(model) = &request.base_model {
            cmd.arg("--base-model").arg(model);
        }
        if let Some(weights) = &request.init_tok2vec {
            cmd.arg("--init-tok2vec").arg(weights);
        }
        cmd
    }
}

impl ParserEngine for SpacyCliEngine {
    fn train(&self, request: &TrainRequest) -> Result<()> {
        let mut cmd = self.train_command(request);
        info!(
            lang = %request.lang,
            output = %request.output_dir.display(),
            n_iter = request.n_iter,
            "starting spacy train"
        );
        debug!(?cmd, "spacy train command");

        let status = cmd
            .status()
            .with_context(|| format!("Failed to execute {}", self.python.display()))?;
        if !status.success() {
            anyhow::bail!("spacy train failed with exit code: {:?}", status.code());
        }
        Ok(())
    }

    fn parse(&self, model_dir: &Path, sentences: &[Content]) -> Result<Vec<Vec<String>>> {
        let mut input = String::new();
        for sentence in sentences {
            input.push_str(&serde_json::to_string(sentence)?);
            input.push('\n');
        }

        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(PARSE_SCRIPT)
            .arg(model_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to execute {}", self.python.display()))?;

        let mut stdin = child
            .stdin
            .take()
            .context("child process has no stdin")?;
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| anyhow::anyhow!("stdin writer thread panicked"))?;
        check_parse_output(&output, written)?;

        let predictions = String::from_utf8(output.stdout)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<Vec<String>>(line).map_err(Into::into))
            .collect::<Result<Vec<_>>>()?;

        if predictions.len() != sentences.len() {
            anyhow::bail!(
                "parser returned {} predictions for {} sentences",
                predictions.len(),
                sentences.len()
            );
        }
        Ok(predictions)
    }
}
