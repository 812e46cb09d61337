//! CSV metric reports, one file per feature type.

use std::path::{Path, PathBuf};

use ipdmeta_common::interchange::write_rows;
use ipdmeta_common::Result;
use tracing::info;

use crate::metrics::{EvaluationReport, FeatureKind, FeatureResult, MetricOutcome};
use crate::missing::MissingAgreement;

pub const BINARY_METRICS: &str = "binary_metrics.csv";
pub const CONTINUOUS_METRICS: &str = "continuous_metrics.csv";
pub const CATEGORICAL_METRICS: &str = "categorical_metrics.csv";

const MISSING_HEADERS: [&str; 3] = ["Missing Total", "Missing Match", "Missing Match %"];

fn header(metric_columns: &[&'static str]) -> Vec<&'static str> {
    let mut h = vec!["Feature", "Type", "Status", "Skip Reason"];
    h.extend_from_slice(metric_columns);
    h.extend_from_slice(&MISSING_HEADERS);
    h
}

fn row<T>(
    result: &FeatureResult<T>,
    kind: FeatureKind,
    metric_cells: impl FnOnce(&T) -> Vec<String>,
    width: usize,
) -> Vec<String> {
    let mut cells = vec![result.feature.clone(), kind.to_string()];
    match &result.outcome {
        MetricOutcome::Computed(v) => {
            cells.push("computed".to_string());
            cells.push(String::new());
            cells.extend(metric_cells(v));
        }
        MetricOutcome::Skipped(reason) => {
            cells.push("skipped".to_string());
            cells.push(reason.to_string());
            cells.extend(std::iter::repeat(String::new()).take(width));
        }
    }
    cells.extend(missing_cells(&result.missing));
    cells
}

fn missing_cells(m: &MissingAgreement) -> [String; 3] {
    [
        m.total.to_string(),
        m.matched.to_string(),
        m.rate.map(|r| r.to_string()).unwrap_or_default(),
    ]
}

/// Write the three metric CSVs into `dir`.
pub fn write_reports(report: &EvaluationReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let binary = dir.join(BINARY_METRICS);
    write_rows(
        &binary,
        &header(&["Precision", "Recall", "F1"]),
        report.binary.iter().map(|r| {
            row(r, FeatureKind::Binary, |s| {
                vec![s.precision.to_string(), s.recall.to_string(), s.f1.to_string()]
            }, 3)
        }),
    )?;

    let continuous = dir.join(CONTINUOUS_METRICS);
    write_rows(
        &continuous,
        &header(&["MSE"]),
        report
            .continuous
            .iter()
            .map(|r| row(r, FeatureKind::Continuous, |mse| vec![mse.to_string()], 1)),
    )?;

    let categorical = dir.join(CATEGORICAL_METRICS);
    write_rows(
        &categorical,
        &header(&["LogLoss", "Classes"]),
        report.categorical.iter().map(|r| {
            row(r, FeatureKind::Categorical, |s| vec![s.log_loss.to_string(), s.classes.join(", ")], 2)
        }),
    )?;

    info!(dir = %dir.display(), "Metric reports written");
    Ok(vec![binary, continuous, categorical])
}
