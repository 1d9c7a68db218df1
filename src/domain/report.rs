// ============================================================
// Layer 3 — Classification Report
// ============================================================
// Binary confusion matrix plus per-class precision, recall, F1
// and support, laid out as a fixed-width text table:
//
//                 precision    recall  f1-score   support
//
//            0       0.85      0.90      0.87       100
//            1       0.89      0.84      0.87       100
//
//     accuracy                           0.87       200
//    macro avg       0.87      0.87      0.87       200
// weighted avg       0.87      0.87      0.87       200
//
// Any ratio with a zero denominator is reported as 0.0.

use std::fmt;

use crate::domain::sample::Label;

const LABELS: [Label; 2] = [Label::Negative, Label::Positive];
const NAME_WIDTH: usize = 12;

// ─── ConfusionMatrix ──────────────────────────────────────────────────────────
/// Counts indexed by `[truth][predicted]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(truth: &[Label], predicted: &[Label]) -> Self {
        let mut cm = Self::new();
        for (&t, &p) in truth.iter().zip(predicted) {
            cm.add(t, p);
        }
        cm
    }

    pub fn add(&mut self, truth: Label, predicted: Label) {
        self.counts[truth.index()][predicted.index()] += 1;
    }

    pub fn get(&self, truth: Label, predicted: Label) -> u64 {
        self.counts[truth.index()][predicted.index()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> u64 {
        LABELS.iter().map(|&l| self.get(l, l)).sum()
    }

    /// Fraction of predictions that match the truth. 0.0 when empty.
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Precision, recall, F1 and support for one class.
    pub fn class_stats(&self, label: Label) -> ClassStats {
        let other = match label {
            Label::Negative => Label::Positive,
            Label::Positive => Label::Negative,
        };
        let tp = self.get(label, label);
        let fp = self.get(other, label);
        let fn_ = self.get(label, other);

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        ClassStats {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Per-class metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStats {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: u64,
}

// ─── ClassificationReport ─────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    /// Rows for class "0" then class "1"
    pub classes: [(Label, ClassStats); 2],
    pub accuracy: f64,
    pub macro_avg: ClassStats,
    pub weighted_avg: ClassStats,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes = LABELS.map(|l| (l, cm.class_stats(l)));
        let total = cm.total();

        let macro_avg = ClassStats {
            precision: classes.iter().map(|(_, s)| s.precision).sum::<f64>() / 2.0,
            recall: classes.iter().map(|(_, s)| s.recall).sum::<f64>() / 2.0,
            f1: classes.iter().map(|(_, s)| s.f1).sum::<f64>() / 2.0,
            support: total,
        };

        let weighted = |f: fn(&ClassStats) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes
                .iter()
                .map(|(_, s)| f(s) * s.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassStats {
            precision: weighted(|s| s.precision),
            recall: weighted(|s| s.recall),
            f1: weighted(|s| s.f1),
            support: total,
        };

        Self {
            classes,
            accuracy: cm.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    pub fn total_support(&self) -> u64 {
        self.classes.iter().map(|(_, s)| s.support).sum()
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = NAME_WIDTH;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, s) in &self.classes {
            write_row(f, label.name(), s)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total_support()
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, s: &ClassStats) -> fmt::Result {
    let w = NAME_WIDTH;
    writeln!(
        f,
        "{:>w$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, s.precision, s.recall, s.f1, s.support
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::Label::{Negative as N, Positive as P};

    fn sample_matrix() -> ConfusionMatrix {
        // truth 0: 8 right, 2 wrong; truth 1: 6 right, 4 wrong
        let mut truth = Vec::new();
        let mut pred = Vec::new();
        for _ in 0..8 { truth.push(N); pred.push(N); }
        for _ in 0..2 { truth.push(N); pred.push(P); }
        for _ in 0..6 { truth.push(P); pred.push(P); }
        for _ in 0..4 { truth.push(P); pred.push(N); }
        ConfusionMatrix::from_pairs(&truth, &pred)
    }

    #[test]
    fn test_accuracy() {
        let cm = sample_matrix();
        assert_eq!(cm.total(), 20);
        assert!((cm.accuracy() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_class_stats() {
        let cm = sample_matrix();
        let neg = cm.class_stats(N);
        // precision 8 / (8 + 4), recall 8 / 10
        assert!((neg.precision - 8.0 / 12.0).abs() < 1e-12);
        assert!((neg.recall - 0.8).abs() < 1e-12);
        assert_eq!(neg.support, 10);

        let pos = cm.class_stats(P);
        assert!((pos.precision - 0.75).abs() < 1e-12);
        assert!((pos.recall - 0.6).abs() < 1e-12);
        let f1 = 2.0 * 0.75 * 0.6 / 1.35;
        assert!((pos.f1 - f1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        // Classifier never predicts class 1
        let cm = ConfusionMatrix::from_pairs(&[N, P, P], &[N, N, N]);
        let pos = cm.class_stats(P);
        assert_eq!(pos.precision, 0.0);
        assert_eq!(pos.recall, 0.0);
        assert_eq!(pos.f1, 0.0);
        assert_eq!(pos.support, 2);
    }

    #[test]
    fn test_report_layout() {
        let report = ClassificationReport::from_confusion(&sample_matrix());
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].contains("precision"));
        assert!(lines[0].ends_with("support"));
        assert_eq!(lines[2], "           0       0.67      0.80      0.73        10");
        assert_eq!(lines[3], "           1       0.75      0.60      0.67        10");
        assert_eq!(lines[5], "    accuracy                           0.70        20");
        assert!(lines[6].starts_with("   macro avg"));
        assert!(lines[7].starts_with("weighted avg"));
        assert_eq!(report.total_support(), 20);
    }

    #[test]
    fn test_empty_matrix_reports_zeros() {
        let report = ClassificationReport::from_confusion(&ConfusionMatrix::new());
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.weighted_avg.f1, 0.0);
        assert_eq!(report.total_support(), 0);
    }
}
