//! Per-feature accuracy metrics: P/R/F1 for binary, MSE for continuous,
//! log-loss for categorical features.

use std::collections::BTreeSet;
use std::fmt;

use ipdmeta_common::records::{
    COL_AGE, COL_HOSPITAL_STAY, COL_SEX, COL_SYMPTOM_GROUPS, COL_T2_FLAIR, COL_TUMOR,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::join::MatchedPair;
use crate::missing::{missing_value_agreement, MissingAgreement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Binary,
    Continuous,
    Categorical,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureKind::Binary      => "Binary",
            FeatureKind::Continuous  => "Continuous",
            FeatureKind::Categorical => "Categorical",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    pub kind: FeatureKind,
}

impl FeatureSpec {
    pub fn new(name: &str, kind: FeatureKind) -> Self {
        Self { name: name.to_string(), kind }
    }
}

pub fn default_features() -> Vec<FeatureSpec> {
    vec![
        FeatureSpec::new(COL_SEX, FeatureKind::Binary),
        FeatureSpec::new(COL_TUMOR, FeatureKind::Binary),
        FeatureSpec::new(COL_AGE, FeatureKind::Continuous),
        FeatureSpec::new(COL_SYMPTOM_GROUPS, FeatureKind::Continuous),
        FeatureSpec::new(COL_HOSPITAL_STAY, FeatureKind::Continuous),
        FeatureSpec::new(COL_T2_FLAIR, FeatureKind::Categorical),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No pair has a usable value on both sides.
    NoValidPairs,
    /// Fewer than two distinct classes on the annotated or the extracted side.
    SingleClass,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoValidPairs => "lack of valid annotation",
            SkipReason::SingleClass  => "only one class found",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricOutcome<T> {
    Computed(T),
    Skipped(SkipReason),
}

impl<T> MetricOutcome<T> {
    pub fn computed(&self) -> Option<&T> {
        match self {
            MetricOutcome::Computed(v) => Some(v),
            MetricOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalScores {
    pub log_loss: f64,
    /// Sorted label set used for encoding.
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureResult<T> {
    pub feature: String,
    pub outcome: MetricOutcome<T>,
    pub missing: MissingAgreement,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub binary: Vec<FeatureResult<BinaryScores>>,
    pub continuous: Vec<FeatureResult<f64>>,
    pub categorical: Vec<FeatureResult<CategoricalScores>>,
}

// ── Binary ────────────────────────────────────────────────────────────────────

/// Precision, recall and F1 with 1 as the positive label; an undefined ratio is 0.
pub fn binary_scores(pairs: &[MatchedPair], feature: &str) -> MetricOutcome<BinaryScores> {
    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    let mut n = 0usize;
    for pair in pairs {
        let (truth, pred) = pair.values(feature);
        let (Some(t), Some(p)) = (truth.as_binary(), pred.as_binary()) else {
            continue;
        };
        n += 1;
        match (t, p) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    if n == 0 {
        return MetricOutcome::Skipped(SkipReason::NoValidPairs);
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    MetricOutcome::Computed(BinaryScores {
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
        f1: ratio(2 * tp, 2 * tp + fp + fn_),
    })
}

// ── Continuous ────────────────────────────────────────────────────────────────

pub fn mean_squared_error(pairs: &[MatchedPair], feature: &str) -> MetricOutcome<f64> {
    let squared: Vec<f64> = pairs
        .iter()
        .filter_map(|pair| {
            let (truth, pred) = pair.values(feature);
            Some((truth.as_number()? - pred.as_number()?).powi(2))
        })
        .collect();
    if squared.is_empty() {
        return MetricOutcome::Skipped(SkipReason::NoValidPairs);
    }
    MetricOutcome::Computed(squared.iter().sum::<f64>() / squared.len() as f64)
}

// ── Categorical ───────────────────────────────────────────────────────────────

/// Multi-class log-loss of one-hot predictions.
///
/// Labels are lower-cased; pairs with a falsy side are dropped. Predicted
/// probabilities are clipped to `[eps, 1 - eps]` and renormalised per row.
pub fn categorical_log_loss(pairs: &[MatchedPair], feature: &str) -> MetricOutcome<CategoricalScores> {
    let mut y_true = Vec::new();
    let mut y_pred = Vec::new();
    for pair in pairs {
        let (truth, pred) = pair.values(feature);
        if truth.is_truthy() && pred.is_truthy() {
            y_true.push(truth.to_string().to_lowercase());
            y_pred.push(pred.to_string().to_lowercase());
        }
    }
    if y_true.is_empty() {
        return MetricOutcome::Skipped(SkipReason::NoValidPairs);
    }

    let true_classes: BTreeSet<&str> = y_true.iter().map(String::as_str).collect();
    let pred_classes: BTreeSet<&str> = y_pred.iter().map(String::as_str).collect();
    if true_classes.len() < 2 || pred_classes.len() < 2 {
        return MetricOutcome::Skipped(SkipReason::SingleClass);
    }

    let classes: Vec<String> = true_classes
        .union(&pred_classes)
        .map(|c| c.to_string())
        .collect();
    let k = classes.len() as f64;

    let eps = f64::EPSILON;
    let norm = (1.0 - eps) + (k - 1.0) * eps;
    let p_hit = (1.0 - eps) / norm;
    let p_miss = eps / norm;

    let total: f64 = y_true
        .iter()
        .zip(&y_pred)
        .map(|(t, p)| if t == p { -p_hit.ln() } else { -p_miss.ln() })
        .sum();

    MetricOutcome::Computed(CategoricalScores {
        log_loss: total / y_true.len() as f64,
        classes,
    })
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Score every feature; skipped metrics are kept in the report with their reason.
pub fn evaluate(pairs: &[MatchedPair], features: &[FeatureSpec]) -> EvaluationReport {
    let mut report = EvaluationReport::default();

    for spec in features {
        let feature = spec.name.as_str();
        let missing = missing_value_agreement(pairs, feature);
        match spec.kind {
            FeatureKind::Binary => {
                let outcome = binary_scores(pairs, feature);
                log_outcome(feature, spec.kind, &outcome, &missing);
                report.binary.push(FeatureResult { feature: spec.name.clone(), outcome, missing });
            }
            FeatureKind::Continuous => {
                let outcome = mean_squared_error(pairs, feature);
                log_outcome(feature, spec.kind, &outcome, &missing);
                report.continuous.push(FeatureResult { feature: spec.name.clone(), outcome, missing });
            }
            FeatureKind::Categorical => {
                let outcome = categorical_log_loss(pairs, feature);
                log_outcome(feature, spec.kind, &outcome, &missing);
                report.categorical.push(FeatureResult { feature: spec.name.clone(), outcome, missing });
            }
        }
    }
    report
}

fn log_outcome<T: fmt::Debug>(
    feature: &str,
    kind: FeatureKind,
    outcome: &MetricOutcome<T>,
    missing: &MissingAgreement,
) {
    match outcome {
        MetricOutcome::Computed(value) => info!(
            feature,
            kind = %kind,
            value = ?value,
            missing_total = missing.total,
            missing_match = missing.matched,
            "Metric computed"
        ),
        MetricOutcome::Skipped(reason) => warn!(feature, kind = %kind, reason = %reason, "Skipping metric"),
    }
}
