//! Label-level scoring of predicted dependency relations.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Precision, recall and F1 for one dependency label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of gold tokens carrying this label.
    pub support: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    tp: usize,
    fp: usize,
    fn_: usize,
}

impl Counts {
    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Classification report over token labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelReport {
    /// Per-label scores, sorted by label.
    pub labels: Vec<LabelScore>,
    pub micro_precision: f64,
    pub micro_recall: f64,
    pub micro_f1: f64,
    /// Fraction of gold tokens whose label was predicted exactly.
    pub accuracy: f64,
    /// Number of gold tokens.
    pub tokens: usize,
}

impl LabelReport {
    /// Scores predicted label sequences against gold ones, sentence by
    /// sentence and position by position.
    ///
    /// Gold tokens without a prediction count as misses; predictions beyond
    /// the gold sequence count as false positives.
    pub fn from_sequences<G, P>(gold: &[G], pred: &[P]) -> Self
    where
        G: AsRef<[String]>,
        P: AsRef<[String]>,
    {
        let mut per_label: BTreeMap<&str, Counts> = BTreeMap::new();
        let mut total = Counts::default();
        let mut tokens = 0usize;

        for i in 0..gold.len().max(pred.len()) {
            let g = gold.get(i).map_or(&[][..], |s| s.as_ref());
            let p = pred.get(i).map_or(&[][..], |s| s.as_ref());
            tokens += g.len();

            for j in 0..g.len().max(p.len()) {
                match (g.get(j), p.get(j)) {
                    (Some(a), Some(b)) if a == b => {
                        per_label.entry(a.as_str()).or_default().tp += 1;
                        total.tp += 1;
                    }
                    (Some(a), b) => {
                        per_label.entry(a.as_str()).or_default().fn_ += 1;
                        total.fn_ += 1;
                        if let Some(b) = b {
                            per_label.entry(b.as_str()).or_default().fp += 1;
                            total.fp += 1;
                        }
                    }
                    (None, Some(b)) => {
                        per_label.entry(b.as_str()).or_default().fp += 1;
                        total.fp += 1;
                    }
                    (None, None) => {}
                }
            }
        }

        let labels = per_label
            .into_iter()
            .map(|(label, c)| LabelScore {
                label: label.to_string(),
                precision: c.precision(),
                recall: c.recall(),
                f1: c.f1(),
                support: c.tp + c.fn_,
            })
            .collect();

        Self {
            labels,
            micro_precision: total.precision(),
            micro_recall: total.recall(),
            micro_f1: total.f1(),
            accuracy: ratio(total.tp, tokens),
            tokens,
        }
    }

    pub fn label(&self, label: &str) -> Option<&LabelScore> {
        self.labels.iter().find(|s| s.label == label)
    }
}

impl fmt::Display for LabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .labels
            .iter()
            .map(|s| s.label.len())
            .chain(["micro avg".len()])
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>width$}  {:>9}  {:>9}  {:>9}  {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for s in &self.labels {
            writeln!(
                f,
                "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
                s.label, s.precision, s.recall, s.f1, s.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9.2}  {:>9.2}  {:>9.2}  {:>9}",
            "micro avg", self.micro_precision, self.micro_recall, self.micro_f1, self.tokens
        )?;
        write!(f, "{:>width$}  {:>31.2}  {:>9}", "accuracy", self.accuracy, self.tokens)
    }
}
