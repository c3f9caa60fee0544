//! Training configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use deptrain_core::{InputFormat, Traversal};

/// Model directory `spacy train` leaves after its last iteration.
pub const DEFAULT_EVAL_MODEL: &str = "model-final";

/// Which converter produces interchange files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConverterKind {
    /// In-process conversion.
    #[default]
    Native,
    /// `python -m spacy convert`.
    Spacy,
}

impl fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Spacy => f.write_str("spacy"),
        }
    }
}

impl FromStr for ConverterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(Self::Native),
            "spacy" => Ok(Self::Spacy),
            other => Err(format!(
                "unknown converter {other:?}, expected native or spacy"
            )),
        }
    }
}

/// Everything the trainer and the external engine need for one run.
///
/// Passed explicitly to every engine call; nothing is kept in globals.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Language code of the model, e.g. `en`.
    pub lang: String,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    /// Where the trained model (and scratch interchange files) go.
    pub output_dir: PathBuf,
    /// Base model to start from instead of a blank one.
    pub model: Option<String>,
    /// GPU id, or -1 for CPU.
    pub gpu: i32,
    pub n_iter: usize,
    pub input: InputFormat,
    pub traversal: Traversal,
    pub converter: ConverterKind,
    /// Seed for the pre-update shuffle.
    pub seed: u64,
    /// Pretrained token-to-vector weights.
    pub init_tok2vec: Option<PathBuf>,
    /// Python interpreter with spaCy installed.
    pub python: PathBuf,
    /// Subdirectory of `output_dir` holding the model to evaluate;
    /// `spacy train` writes `model-final` and `model-best` there.
    pub eval_model: PathBuf,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            train_path: PathBuf::new(),
            test_path: PathBuf::new(),
            output_dir: PathBuf::from("models"),
            model: None,
            gpu: -1,
            n_iter: 5,
            input: InputFormat::default(),
            traversal: Traversal::default(),
            converter: ConverterKind::default(),
            seed: 777,
            init_tok2vec: None,
            python: PathBuf::from("python3"),
            eval_model: PathBuf::from(DEFAULT_EVAL_MODEL),
        }
    }
}

impl TrainConfig {
    /// Create a configuration for the given corpora with default settings.
    pub fn new(
        lang: impl Into<String>,
        train_path: impl Into<PathBuf>,
        test_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            lang: lang.into(),
            train_path: train_path.into(),
            test_path: test_path.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_input(mut self, input: InputFormat) -> Self {
        self.input = input;
        self
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_converter(mut self, converter: ConverterKind) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn with_gpu(mut self, gpu: i32) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_init_tok2vec(mut self, path: Option<PathBuf>) -> Self {
        self.init_tok2vec = path;
        self
    }

    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_eval_model(mut self, eval_model: impl Into<PathBuf>) -> Self {
        self.eval_model = eval_model.into();
        self
    }

    pub fn use_gpu(&self) -> bool {
        self.gpu >= 0
    }

    /// Checks the settings before any file is touched.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lang.trim().is_empty() {
            anyhow::bail!("language code must not be empty");
        }
        if self.n_iter == 0 {
            anyhow::bail!("n_iter must be at least 1");
        }
        if self.gpu < -1 {
            anyhow::bail!("gpu must be -1 (CPU) or a device id, got {}", self.gpu);
        }
        for (name, path) in [("train", &self.train_path), ("test", &self.test_path)] {
            if path.as_os_str().is_empty() {
                anyhow::bail!("{name} path must not be empty");
            }
        }
        if let Some(weights) = &self.init_tok2vec {
            if !weights.exists() {
                anyhow::bail!("pretrained weights not found: {}", weights.display());
            }
        }
        Ok(())
    }

    /// Directory the evaluation loads the trained model from.
    pub fn trained_model_dir(&self) -> PathBuf {
        self.output_dir.join(&self.eval_model)
    }

    /// Scratch file written next to the model for update runs.
    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TrainConfig {
        TrainConfig::new("en", "train.conllu", "dev.conllu", "out")
    }

    #[test]
    fn defaults_match_cli_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.gpu, -1);
        assert_eq!(cfg.n_iter, 5);
        assert_eq!(cfg.seed, 777);
        assert_eq!(cfg.input, InputFormat::ConlluToSpacy);
        assert!(!cfg.use_gpu());
    }

    #[test]
    fn valid_config_passes() {
        assert!(config().validate().is_ok());
        assert!(config().with_gpu(0).validate().is_ok());
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(config().with_n_iter(0).validate().is_err());
        assert!(config().with_gpu(-2).validate().is_err());

        let mut cfg = config();
        cfg.lang = " ".into();
        assert!(cfg.validate().is_err());

        let cfg = TrainConfig::new("en", "", "dev.conllu", "out");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("train path"));
    }

    #[test]
    fn rejects_missing_weights() {
        let cfg = config().with_init_tok2vec(Some("/nonexistent/weights.bin".into()));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn converter_kind_from_str() {
        assert_eq!("native".parse::<ConverterKind>(), Ok(ConverterKind::Native));
        assert_eq!("spacy".parse::<ConverterKind>(), Ok(ConverterKind::Spacy));
        assert!("udpipe".parse::<ConverterKind>().is_err());
        assert_eq!(ConverterKind::Spacy.to_string(), "spacy");
    }

    #[test]
    fn evaluation_loads_final_model_by_default() {
        assert_eq!(config().trained_model_dir(), PathBuf::from("out/model-final"));
        assert_eq!(
            config().with_eval_model("model-best").trained_model_dir(),
            PathBuf::from("out/model-best")
        );
    }

    #[test]
    fn scratch_files_live_in_output_dir() {
        assert_eq!(
            config().scratch_file("update-train.json"),
            PathBuf::from("out/update-train.json")
        );
    }
}
