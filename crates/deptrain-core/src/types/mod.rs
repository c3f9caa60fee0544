pub mod format;
pub mod record;

pub use format::{InputFormat, Traversal};
pub use record::{Content, Dataset, SentenceRecord, dependency_labels};
