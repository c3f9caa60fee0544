//! # Deptrain Trainer
//!
//! Drives spaCy's dependency parser training from CoNLL-U corpora: loads
//! and validates data through [`deptrain_core`], hands it to a
//! [`ParserEngine`], and scores the result per dependency label.

pub mod config;
pub mod engine;
pub mod evaluation;
pub mod trainer;

pub use config::{ConverterKind, DEFAULT_EVAL_MODEL, TrainConfig};
pub use engine::{ParserEngine, SpacyCliEngine, TrainRequest};
pub use evaluation::{LabelReport, LabelScore};
pub use trainer::{Mode, Trainer, run_training, shuffle};
