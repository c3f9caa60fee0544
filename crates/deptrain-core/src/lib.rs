//! # Deptrain Core
//!
//! Corpus loading for dependency parser training. Reads CoNLL-U treebanks
//! block by block into aligned (content, heads, deps) records, and converts
//! them to and from the spaCy JSON interchange format.
//!
//! ## Quick Start
//!
//! ```no_run
//! use deptrain_core::CorpusLoader;
//!
//! let loader = CorpusLoader::native().unwrap();
//! let data = loader.parse_as_tokens("data/en_ewt-ud-train.conllu").unwrap();
//!
//! for record in &data {
//!     assert_eq!(record.heads().len(), record.deps().len());
//! }
//! ```
pub mod conllu;
pub mod convert;
pub mod error;
pub mod interchange;
pub mod loader;
pub mod types;

// Re-export primary API
pub use conllu::{Block, RecordShape, RecordStream, SentenceBlocks, TokenLine};
pub use convert::{FormatConverter, NativeConverter, SpacyCliConverter};
pub use error::{CorpusError, Result};
pub use loader::CorpusLoader;
pub use types::{Content, Dataset, InputFormat, SentenceRecord, Traversal, dependency_labels};
