use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a CoNLL-U corpus is turned into training records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputFormat {
    /// Convert to the spaCy JSON interchange file, then read that back.
    #[default]
    #[serde(rename = "conllu_2_spacy")]
    ConlluToSpacy,

    /// Raw sentence text from the `# text =` metadata.
    #[serde(rename = "conllu_2_text")]
    ConlluToText,

    /// Token surface forms from the FORM column.
    #[serde(rename = "conllu_2_tokens")]
    ConlluToTokens,
}

impl InputFormat {
    pub const ALL: [InputFormat; 3] = [
        InputFormat::ConlluToSpacy,
        InputFormat::ConlluToText,
        InputFormat::ConlluToTokens,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConlluToSpacy => "conllu_2_spacy",
            Self::ConlluToText => "conllu_2_text",
            Self::ConlluToTokens => "conllu_2_tokens",
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown input format {s:?}, expected one of conllu_2_spacy, conllu_2_text, conllu_2_tokens"
                )
            })
    }
}

/// Which documents of a multi-document interchange file are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Traversal {
    /// Every document, in file order.
    #[default]
    AllDocuments,

    /// Only the first document. Older tooling stopped there; kept for
    /// byte-for-byte comparisons against its output.
    FirstDocumentOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_format_round_trips_through_str() {
        for format in InputFormat::ALL {
            assert_eq!(format.to_string().parse::<InputFormat>(), Ok(format));
        }
    }

    #[test]
    fn input_format_rejects_unknown() {
        let err = "conllu_2_xml".parse::<InputFormat>().unwrap_err();
        assert!(err.contains("conllu_2_xml"));
    }

    #[test]
    fn defaults() {
        assert_eq!(InputFormat::default(), InputFormat::ConlluToSpacy);
        assert_eq!(Traversal::default(), Traversal::AllDocuments);
    }

    #[test]
    fn input_format_serializes_as_cli_tag() {
        let json = serde_json::to_string(&InputFormat::ConlluToTokens).unwrap();
        assert_eq!(json, "\"conllu_2_tokens\"");
    }
}
