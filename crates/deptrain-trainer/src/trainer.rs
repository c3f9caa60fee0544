//! Train, update and evaluate a dependency parser from CoNLL-U corpora.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deptrain_core::convert::interchange_path;
use deptrain_core::interchange::{spacy_label, write_records};
use deptrain_core::{
    Content, CorpusLoader, Dataset, FormatConverter, InputFormat, NativeConverter,
    SpacyCliConverter, dependency_labels,
};
use tracing::{info, warn};

use crate::config::{ConverterKind, TrainConfig};
use crate::engine::{ParserEngine, SpacyCliEngine, TrainRequest};
use crate::evaluation::LabelReport;

/// Scratch interchange files written by [`Trainer::update`].
pub const UPDATE_TRAIN_FILE: &str = "update-train.json";
pub const UPDATE_DEV_FILE: &str = "update-dev.json";
/// Where [`Trainer::evaluate`] stores its report.
pub const EVALUATION_FILE: &str = "evaluation.json";

pub struct Trainer {
    config: TrainConfig,
    loader: CorpusLoader,
    engine: Box<dyn ParserEngine>,
}

impl Trainer {
    /// Builds a trainer whose loader follows the configuration.
    pub fn new(config: TrainConfig, engine: Box<dyn ParserEngine>) -> Result<Self> {
        config.validate()?;

        let converter: Box<dyn FormatConverter> = match config.converter {
            ConverterKind::Native => Box::new(NativeConverter::new()?),
            ConverterKind::Spacy => Box::new(SpacyCliConverter::new(&config.python)),
        };
        let loader = CorpusLoader::new(converter).with_traversal(config.traversal);

        Ok(Self {
            config,
            loader,
            engine,
        })
    }

    /// Builds a trainer that drives the spaCy command line.
    pub fn spacy(config: TrainConfig) -> Result<Self> {
        let engine = Box::new(SpacyCliEngine::new(&config.python));
        Self::new(config, engine)
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Loads a corpus in the configured input format.
    pub fn get_data(&self, path: &Path) -> Result<Dataset> {
        let data = self
            .loader
            .load(path, self.config.input, &self.config.lang)
            .with_context(|| format!("Failed to load corpus {}", path.display()))?;
        info!(
            path = %path.display(),
            sentences = data.len(),
            labels = dependency_labels(&data).len(),
            "loaded training data"
        );
        Ok(data)
    }

    fn interchange_file(&self, corpus: &Path) -> PathBuf {
        interchange_path(corpus, &self.loader.output_dir_for(corpus))
    }

    /// Trains a parser from the interchange files of the train and test
    /// corpora.
    pub fn train(&self) -> Result<()> {
        if self.config.input != InputFormat::ConlluToSpacy {
            anyhow::bail!(
                "train reads interchange files; use input format {} (got {})",
                InputFormat::ConlluToSpacy,
                self.config.input
            );
        }

        let train = self.get_data(&self.config.train_path)?;
        let test = self.get_data(&self.config.test_path)?;
        if train.is_empty() {
            anyhow::bail!(
                "no training sentences in {}",
                self.config.train_path.display()
            );
        }
        info!(
            train = train.len(),
            test = test.len(),
            "prepared interchange files"
        );

        fs::create_dir_all(&self.config.output_dir)?;
        let request = TrainRequest::from_config(
            &self.config,
            self.interchange_file(&self.config.train_path),
            self.interchange_file(&self.config.test_path),
        );
        self.engine.train(&request)?;

        info!(output = %self.config.output_dir.display(), "training complete");
        Ok(())
    }

    /// Continues training from `config.model` (or a blank model) on the
    /// shuffled training corpus.
    ///
    /// Always reads token records with corpus heads, whatever the input
    /// format, so the scratch interchange files encode heads consistently.
    pub fn update(&self) -> Result<()> {
        if self.config.input == InputFormat::ConlluToText {
            anyhow::bail!(
                "update needs tokenized input; raw text records carry no token boundaries"
            );
        }

        let mut train = self.load_tokens(&self.config.train_path)?;
        let dev = self.load_tokens(&self.config.test_path)?;
        if train.is_empty() {
            anyhow::bail!(
                "no training sentences in {}",
                self.config.train_path.display()
            );
        }

        shuffle(&mut train, self.config.seed);
        let labels = dependency_labels(&train);
        info!(
            sentences = train.len(),
            labels = labels.len(),
            seed = self.config.seed,
            "shuffled training data"
        );

        match &self.config.model {
            Some(model) => info!(%model, "updating existing model"),
            None => info!(lang = %self.config.lang, "updating blank model"),
        }

        fs::create_dir_all(&self.config.output_dir)?;
        let train_json = self.config.scratch_file(UPDATE_TRAIN_FILE);
        let dev_json = self.config.scratch_file(UPDATE_DEV_FILE);
        write_records(&train_json, &train, 1)
            .with_context(|| format!("Failed to write {}", train_json.display()))?;
        write_records(&dev_json, &dev, 1)
            .with_context(|| format!("Failed to write {}", dev_json.display()))?;

        let request = TrainRequest::from_config(&self.config, train_json, dev_json);
        self.engine.train(&request)?;

        info!(output = %self.config.output_dir.display(), "update complete");
        Ok(())
    }

    fn load_tokens(&self, path: &Path) -> Result<Dataset> {
        self.loader
            .parse_as_tokens(path)
            .with_context(|| format!("Failed to load corpus {}", path.display()))
    }

    /// Scores the trained model on the test corpus and writes the report to
    /// `output_dir`.
    ///
    /// Gold labels are compared in spaCy's spelling (`ROOT`), which is what
    /// the parser predicts.
    pub fn evaluate(&self) -> Result<LabelReport> {
        let model_dir = self.config.trained_model_dir();
        info!(model = %model_dir.display(), "loading model for evaluation");
        let data = self.get_data(&self.config.test_path)?;

        let sentences: Vec<Content> = data.iter().map(|r| r.content().clone()).collect();
        let gold: Vec<Vec<String>> = data
            .iter()
            .map(|r| r.deps().iter().map(|d| spacy_label(d).to_string()).collect())
            .collect();

        let pred = self.engine.parse(&model_dir, &sentences)?;
        if pred.len() != gold.len() {
            anyhow::bail!(
                "engine returned {} predictions for {} sentences",
                pred.len(),
                gold.len()
            );
        }
        let mismatched = gold
            .iter()
            .zip(&pred)
            .filter(|(g, p)| g.len() != p.len())
            .count();
        if mismatched > 0 {
            warn!(
                mismatched,
                "predicted token counts differ from gold; extra or missing tokens score as errors"
            );
        }

        let report = LabelReport::from_sequences(&gold, &pred);
        info!(
            micro_f1 = report.micro_f1,
            accuracy = report.accuracy,
            tokens = report.tokens,
            "evaluation complete"
        );

        fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.scratch_file(EVALUATION_FILE);
        fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(report)
    }
}

/// Fisher-Yates shuffle driven by a seeded PCG generator.
pub fn shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = oorandom::Rand64::new(u128::from(seed));
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u64 + 1)) as usize;
        items.swap(i, j);
    }
}

/// What the binary should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Update,
}

/// Runs one training or update pass, optionally followed by evaluation.
pub fn run_training(trainer: &Trainer, mode: Mode, evaluate: bool) -> Result<Option<LabelReport>> {
    match mode {
        Mode::Train => trainer.train()?,
        Mode::Update => trainer.update()?,
    }

    if evaluate {
        return Ok(Some(trainer.evaluate()?));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use deptrain_core::Traversal;
    use deptrain_core::interchange::read_interchange;

    const CORPUS: &str = "\
# text = Dogs chase cats
1\tDogs\tdog\tNOUN\tNNS\t_\t2\tnsubj\t_\t_
2\tchase\tchase\tVERB\tVBP\t_\t0\troot\t_\t_
3\tcats\tcat\tNOUN\tNNS\t_\t2\tobj\t_\t_

# text = Birds sing
1\tBirds\tbird\tNOUN\tNNS\t_\t2\tnsubj\t_\t_
2\tsing\tsing\tVERB\tVBP\t_\t0\troot\t_\t_

# text = Stop
1\tStop\tstop\tVERB\tVB\t_\t0\troot\t_\t_
";

    /// Records train requests and model directories, and predicts `ROOT`
    /// for every token.
    #[derive(Default)]
    struct FakeEngine {
        requests: Mutex<Vec<TrainRequest>>,
        parsed_models: Mutex<Vec<PathBuf>>,
    }

    impl ParserEngine for FakeEngine {
        fn train(&self, request: &TrainRequest) -> Result<()> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(())
        }

        fn parse(&self, model_dir: &Path, sentences: &[Content]) -> Result<Vec<Vec<String>>> {
            self.parsed_models.lock().unwrap().push(model_dir.to_path_buf());
            Ok(sentences
                .iter()
                .map(|s| {
                    let n = match s {
                        Content::Tokens(t) => t.len(),
                        Content::Text(t) => t.split_whitespace().count(),
                    };
                    vec!["ROOT".to_string(); n]
                })
                .collect())
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        config: TrainConfig,
    }

    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("train.conllu");
        let test = dir.path().join("test.conllu");
        fs::write(&train, CORPUS).unwrap();
        fs::write(&test, CORPUS).unwrap();
        let config = TrainConfig::new("en", train, test, dir.path().join("model"));
        Setup { _dir: dir, config }
    }

    fn trainer(config: TrainConfig) -> (Trainer, Arc<FakeEngine>) {
        let engine = Arc::new(FakeEngine::default());
        let trainer = Trainer::new(config, Box::new(Arc::clone(&engine))).unwrap();
        (trainer, engine)
    }

    #[test]
    fn train_hands_interchange_files_to_engine() {
        let setup = setup();
        let (trainer, engine) = trainer(setup.config.clone());
        trainer.train().unwrap();

        let requests = engine.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.train_json.ends_with("train.json"));
        assert!(request.dev_json.ends_with("test.json"));
        assert!(request.train_json.exists());
        assert_eq!(request.n_iter, 5);
        assert!(setup.config.output_dir.exists());
    }

    #[test]
    fn train_requires_interchange_input() {
        let setup = setup();
        let config = setup.config.clone().with_input(InputFormat::ConlluToTokens);
        let (trainer, engine) = trainer(config);
        assert!(trainer.train().is_err());
        assert!(engine.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn update_writes_shuffled_scratch_files() {
        let setup = setup();
        let config = setup
            .config
            .clone()
            .with_model(Some("en_core_web_sm".into()));
        let (trainer, engine) = trainer(config);
        trainer.update().unwrap();

        let requests = engine.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(request.base_model.as_deref(), Some("en_core_web_sm"));
        assert!(request.train_json.ends_with(UPDATE_TRAIN_FILE));

        let written = read_interchange(&request.train_json, Traversal::AllDocuments).unwrap();
        assert_eq!(written.len(), 3);
        let mut lengths: Vec<_> = written.iter().map(|r| r.len()).collect();
        lengths.sort_unstable();
        assert_eq!(lengths, vec![1, 2, 3]);

        let dev = read_interchange(&request.dev_json, Traversal::AllDocuments).unwrap();
        assert_eq!(dev[0].heads(), &[1, 0, -1]);
    }

    #[test]
    fn update_rejects_text_input() {
        let setup = setup();
        let config = setup.config.clone().with_input(InputFormat::ConlluToText);
        let (trainer, _) = trainer(config);
        let err = trainer.update().unwrap_err();
        assert!(err.to_string().contains("tokenized"));
    }

    #[test]
    fn evaluate_scores_predictions() {
        let setup = setup();
        let config = setup.config.clone().with_input(InputFormat::ConlluToTokens);
        let (trainer, engine) = trainer(config);
        let report = trainer.evaluate().unwrap();

        assert_eq!(report.tokens, 6);
        assert!((report.accuracy - 0.5).abs() < 1e-9);
        assert!((report.label("ROOT").unwrap().recall - 1.0).abs() < 1e-9);
        assert!(report.label("root").is_none());
        assert!(setup.config.scratch_file(EVALUATION_FILE).exists());

        let parsed = engine.parsed_models.lock().unwrap();
        assert_eq!(
            parsed.as_slice(),
            &[setup.config.output_dir.join("model-final")]
        );
    }

    #[test]
    fn evaluate_uses_configured_model_dir() {
        let setup = setup();
        let config = setup
            .config
            .clone()
            .with_input(InputFormat::ConlluToTokens)
            .with_eval_model("model-best");
        let (trainer, engine) = trainer(config);
        trainer.evaluate().unwrap();

        let parsed = engine.parsed_models.lock().unwrap();
        assert!(parsed[0].ends_with("model-best"));
    }

    #[test]
    fn run_training_evaluates_on_request() {
        let setup = setup();
        let config = setup.config.clone().with_input(InputFormat::ConlluToTokens);
        let (trainer, engine) = trainer(config);

        let report = run_training(&trainer, Mode::Update, true).unwrap();
        assert!(report.is_some());
        assert_eq!(engine.requests.lock().unwrap().len(), 1);

        let report = run_training(&trainer, Mode::Update, false).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn load_errors_name_the_file() {
        let setup = setup();
        let mut config = setup.config.clone().with_input(InputFormat::ConlluToTokens);
        config.train_path = PathBuf::from("/nonexistent/train.conllu");
        let (trainer, _) = trainer(config);
        let err = trainer.update().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/train.conllu"));
    }

    #[test]
    fn shuffle_is_seeded() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle(&mut a, 777);
        shuffle(&mut b, 777);
        assert_eq!(a, b);
        assert_ne!(a, (0..50).collect::<Vec<_>>());

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let setup = setup();
        let config = setup.config.clone().with_n_iter(0);
        assert!(Trainer::new(config, Box::<FakeEngine>::default()).is_err());
    }
}
