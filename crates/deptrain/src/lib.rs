//! # Deptrain
//!
//! Treebank corpus loading and spaCy dependency parser training.
//!
//! - [`corpus`]: streaming CoNLL-U loading, interchange conversion
//! - [`trainer`]: training, update and evaluation driver
//!
//! ```no_run
//! use deptrain::corpus::CorpusLoader;
//!
//! let loader = CorpusLoader::native().unwrap();
//! let data = loader.parse_as_text("data/train.conllu").unwrap();
//! println!("{} sentences", data.len());
//! ```

pub use deptrain_core as corpus;
pub use deptrain_trainer as trainer;

pub use deptrain_core::{
    Content, CorpusError, CorpusLoader, Dataset, InputFormat, SentenceRecord, Traversal,
};
pub use deptrain_trainer::{LabelReport, TrainConfig, Trainer};
