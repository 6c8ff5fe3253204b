//! Hold-out evaluation for the trainer.

use serde::Serialize;
use std::fmt;

const CLASS_NAMES: [&str; 2] = ["No Fire", "Fire"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: [ClassMetrics; 2],
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    /// Compare hard predictions against truth, both as 0/1 labels.
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let mut confusion = [[0usize; 2]; 2];
        for (&t, &p) in truth.iter().zip(predicted) {
            confusion[usize::from(t == 1)][usize::from(p == 1)] += 1;
        }

        let total = truth.len().min(predicted.len());
        let correct = confusion[0][0] + confusion[1][1];

        let class = |c: usize| {
            let tp = confusion[c][c];
            let predicted_c = confusion[0][c] + confusion[1][c];
            let support = confusion[c][0] + confusion[c][1];
            let precision = ratio(tp, predicted_c);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        };

        Self {
            accuracy: ratio(correct, total),
            classes: [class(0), class(1)],
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (name, m) in CLASS_NAMES.iter().zip(&self.classes) {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        let support: usize = self.classes.iter().map(|m| m.support).sum();
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, support)
    }
}
