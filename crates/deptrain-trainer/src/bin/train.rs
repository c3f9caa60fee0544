//! Train or update a spaCy dependency parser from CoNLL-U corpora.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use deptrain_core::{InputFormat, Traversal};
use deptrain_trainer::{ConverterKind, Mode, TrainConfig, Trainer, run_training};
use tracing::info;

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "train")]
#[command(about = "Train a spaCy dependency parser on CoNLL-U data")]
#[command(version)]
struct Cli {
    /// Training corpus in CoNLL-U format
    #[arg(long)]
    train_path: PathBuf,

    /// Test corpus in CoNLL-U format
    #[arg(long)]
    test_path: PathBuf,

    /// Directory to save the model
    #[arg(long)]
    output_dir: PathBuf,

    /// Language of the model
    #[arg(long)]
    lang: String,

    /// GPU id to use, -1 for CPU
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    gpu: i32,

    /// Number of training iterations
    #[arg(long, default_value_t = 5)]
    n_iter: usize,

    /// Base model to train on, e.g. en_core_web_lg (blank model if omitted)
    #[arg(long)]
    model: Option<String>,

    /// Update an existing or blank model instead of training from scratch
    #[arg(long)]
    do_update: bool,

    /// Score the model on the test corpus afterwards
    #[arg(long)]
    evaluate: bool,

    /// conllu_2_spacy: convert to spaCy JSON first;
    /// conllu_2_text: sentence text records;
    /// conllu_2_tokens: token list records
    #[arg(long, default_value_t = InputFormat::ConlluToSpacy)]
    type_of_data_input: InputFormat,

    /// Converter producing spaCy JSON files (native or spacy)
    #[arg(long, default_value_t = ConverterKind::Native)]
    converter: ConverterKind,

    /// Read only the first document of converted JSON files
    #[arg(long)]
    legacy_first_document: bool,

    /// Seed for shuffling training data before an update
    #[arg(long, default_value_t = 777)]
    seed: u64,

    /// Pretrained token-to-vector weights
    #[arg(long)]
    init_tok2vec: Option<PathBuf>,

    /// Model directory under --output-dir to evaluate (model-final or model-best)
    #[arg(long, default_value = deptrain_trainer::DEFAULT_EVAL_MODEL)]
    eval_model: PathBuf,

    /// Python interpreter with spaCy installed
    #[arg(long, env = "DEPTRAIN_PYTHON", default_value = "python3")]
    python: PathBuf,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.do_update { Mode::Update } else { Mode::Train }
    }

    fn into_config(self) -> TrainConfig {
        let traversal = if self.legacy_first_document {
            Traversal::FirstDocumentOnly
        } else {
            Traversal::AllDocuments
        };

        TrainConfig::new(self.lang, self.train_path, self.test_path, self.output_dir)
            .with_gpu(self.gpu)
            .with_n_iter(self.n_iter)
            .with_model(self.model)
            .with_input(self.type_of_data_input)
            .with_converter(self.converter)
            .with_traversal(traversal)
            .with_seed(self.seed)
            .with_init_tok2vec(self.init_tok2vec)
            .with_python(self.python)
            .with_eval_model(self.eval_model)
    }
}

fn run(cli: Cli) -> Result<()> {
    let mode = cli.mode();
    let evaluate = cli.evaluate;
    let trainer = Trainer::spacy(cli.into_config())?;

    info!(?mode, input = %trainer.config().input, "starting");
    if let Some(report) = run_training(&trainer, mode, evaluate)? {
        println!("Validation F1-Score: {:.4}", report.micro_f1);
        println!("Classification Report");
        println!("{report}");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("Training failed: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "train",
        "--train-path",
        "train.conllu",
        "--test-path",
        "test.conllu",
        "--output-dir",
        "out",
        "--lang",
        "en",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(REQUIRED.iter().chain(extra)).unwrap()
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.mode(), Mode::Train);
        let config = cli.into_config();
        assert_eq!(config.gpu, -1);
        assert_eq!(config.n_iter, 5);
        assert_eq!(config.input, InputFormat::ConlluToSpacy);
        assert_eq!(config.converter, ConverterKind::Native);
        assert_eq!(config.traversal, Traversal::AllDocuments);
        assert_eq!(config.seed, 777);
        assert_eq!(config.trained_model_dir(), PathBuf::from("out/model-final"));
    }

    #[test]
    fn all_flags() {
        let cli = parse(&[
            "--gpu",
            "0",
            "--n-iter",
            "20",
            "--model",
            "en_core_web_lg",
            "--do-update",
            "--type-of-data-input",
            "conllu_2_tokens",
            "--converter",
            "spacy",
            "--legacy-first-document",
            "--eval-model",
            "model-best",
        ]);
        assert_eq!(cli.mode(), Mode::Update);
        let config = cli.into_config();
        assert_eq!(config.gpu, 0);
        assert_eq!(config.n_iter, 20);
        assert_eq!(config.model.as_deref(), Some("en_core_web_lg"));
        assert_eq!(config.input, InputFormat::ConlluToTokens);
        assert_eq!(config.converter, ConverterKind::Spacy);
        assert_eq!(config.traversal, Traversal::FirstDocumentOnly);
        assert_eq!(config.trained_model_dir(), PathBuf::from("out/model-best"));
    }

    #[test]
    fn negative_gpu_is_accepted() {
        assert_eq!(parse(&["--gpu", "-1"]).gpu, -1);
    }

    #[test]
    fn rejects_unknown_input_format() {
        let args = REQUIRED.iter().chain(&["--type-of-data-input", "conllu_2_xml"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn requires_paths() {
        assert!(Cli::try_parse_from(["train", "--lang", "en"]).is_err());
    }
}
