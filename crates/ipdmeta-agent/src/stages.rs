//! One runner per pipeline stage. Each reads its inputs from disk, calls the
//! stage library, and writes its outputs for the next (human or machine) step.

use std::time::Duration;

use anyhow::{Context, Result};
use ipdmeta_common::interchange::{read_first_column, read_study_map, write_rows, write_study_map};
use ipdmeta_common::records::read_records;
use ipdmeta_common::{CaseCountTable, SplitName};
use ipdmeta_eval::{create_matches, evaluate, write_reports, AnnotationTable};
use ipdmeta_ingestion::{build_study_texts, remove_excluded, resolve_study_files, split_datasets};
use ipdmeta_llm::{build_backend, BackendConfig, ExtractorConfig, FeatureExtractor};
use ipdmeta_matcher::grouping::group_files;
use ipdmeta_matcher::review::{
    read_group_review, read_match_records, write_group_review, write_match_outcome, write_unassigned,
    PathPrefix,
};
use ipdmeta_matcher::match_all;
use tracing::{info, warn};

use crate::config::Config;

pub const GROUP_REVIEW: &str = "study_groups_review.csv";
pub const UNASSIGNED_FILES: &str = "unassigned_files.csv";
pub const GROUP_REVIEW_EDITED: &str = "study_groups_review_edited.csv";
pub const GROUP_REVIEW_FINAL: &str = "study_groups_review_final.csv";
pub const MATCHED_FINAL: &str = "matched_final.csv";
pub const STUDY_TO_TEXT: &str = "study_to_text.json";
pub const UNMATCHED_ANNOTATIONS: &str = "unmatched_annotation_studies.csv";

fn load_case_counts(config: &Config) -> Result<CaseCountTable> {
    let mut counts = CaseCountTable::load(
        &config.paths.cases_csv,
        &config.cases.study_column,
        &config.cases.count_column,
    )
    .with_context(|| format!("loading case counts from {}", config.paths.cases_csv.display()))?;
    counts.normalise(&config.structuring.merges, &config.structuring.unreadable_studies);
    info!(
        single = counts.single_case_studies().len(),
        series = counts.case_series_studies().len(),
        "Case counts ready"
    );
    Ok(counts)
}

/// Stage 1a: group the publication folder by study key for manual review.
pub fn run_group(config: &Config) -> Result<()> {
    let groups = group_files(&config.paths.files_dir)
        .with_context(|| format!("grouping {}", config.paths.files_dir.display()))?;

    let prefix = (!config.matching.review_path_from.is_empty()).then(|| PathPrefix {
        from: config.matching.review_path_from.clone(),
        to: config.matching.review_path_to.clone(),
    });

    let out = &config.paths.matching_outputs;
    write_group_review(&groups, &out.join(GROUP_REVIEW), prefix.as_ref())?;
    write_unassigned(&groups, &out.join(UNASSIGNED_FILES))?;
    info!(
        groups = groups.len(),
        files = groups.total_files(),
        unassigned = groups.unassigned().len(),
        "Review {} and save it as {}/{}",
        GROUP_REVIEW,
        config.paths.manual_edited.display(),
        GROUP_REVIEW_EDITED
    );
    Ok(())
}

/// Stage 1b: match included studies to the reviewed group keys.
pub fn run_match(config: &Config) -> Result<()> {
    let edited = config.paths.manual_edited.join(GROUP_REVIEW_EDITED);
    let groups = read_group_review(&edited)
        .with_context(|| format!("reading reviewed groups from {}", edited.display()))?;
    let studies = read_first_column(&config.paths.cases_csv)?;
    info!(studies = studies.len(), groups = groups.len(), "Matching studies to groups");

    let outcome = match_all(&studies, &groups.keys())?;
    write_match_outcome(&outcome, &config.paths.matching_outputs)?;
    info!(
        matched = outcome.matched.len(),
        "Review the match files and save {} and {} under {}",
        MATCHED_FINAL,
        GROUP_REVIEW_FINAL,
        config.paths.manual_edited.display()
    );
    Ok(())
}

/// Stage 2: extract study texts and split them into pilot / development / validation.
pub fn run_structure(config: &Config) -> Result<()> {
    let base = &config.paths.manual_edited;
    let matched = read_match_records(&base.join(MATCHED_FINAL))
        .with_context(|| format!("reading {}", base.join(MATCHED_FINAL).display()))?;
    let groups = read_group_review(&base.join(GROUP_REVIEW_FINAL))
        .with_context(|| format!("reading {}", base.join(GROUP_REVIEW_FINAL).display()))?;

    let sets = resolve_study_files(&matched, &groups);
    let (mut texts, _report) = build_study_texts(&sets, base);
    remove_excluded(&mut texts, &config.structuring.excluded_studies());

    let out = &config.paths.preprocess_outputs;
    write_study_map(&texts, &out.join(STUDY_TO_TEXT))?;

    let counts = load_case_counts(config)?;
    let split = split_datasets(&texts, &counts, &config.structuring.split)?;
    split.write(out)?;
    info!(dir = %out.display(), "Structured texts and dataset split written");
    Ok(())
}

/// Stage 3: run the model over one split.
pub async fn run_extract(config: &Config, split: SplitName) -> Result<()> {
    let set_path = config.paths.preprocess_outputs.join(split.set_file());
    let dataset = read_study_map(&set_path)
        .with_context(|| format!("reading {}", set_path.display()))?;
    let counts = load_case_counts(config)?;

    let llm = &config.llm;
    let backend = build_backend(BackendConfig {
        kind: llm.kind,
        model: llm.model.clone(),
        api_key: llm.resolved_api_key(),
        base_url: llm.base_url.clone(),
    })?;

    let delay = Duration::try_from_secs_f64(llm.request_delay_secs.max(0.0)).unwrap_or_default();
    let extractor = FeatureExtractor::new(
        backend,
        ExtractorConfig {
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            request_delay: delay,
            on_failure: llm.on_failure,
        },
    );

    info!(split = %split, studies = dataset.len(), "Starting feature extraction");
    let outcome = extractor.batch_feature_extraction(&dataset, &counts).await?;
    outcome.write(&config.paths.extracted_dir, split)?;

    if !outcome.failures.is_empty() {
        warn!(
            failures = outcome.failures.len(),
            "Some studies failed; see {}",
            config.paths.extracted_dir.join(split.failures_file()).display()
        );
    }
    Ok(())
}

/// Stage 4: score one split's extraction against the annotation table.
pub fn run_evaluate(config: &Config, split: SplitName) -> Result<()> {
    let output = config.paths.extracted_dir.join(split.output_file());
    let records = read_records(&output).with_context(|| format!("reading {}", output.display()))?;
    let table = AnnotationTable::load(&config.paths.annotations)
        .with_context(|| format!("loading annotations from {}", config.paths.annotations.display()))?;

    let eval = &config.evaluation;
    let joined = create_matches(&records, &table, &eval.study_column, &eval.mapping())?;
    let report = evaluate(&joined.pairs, &eval.features);

    let dir = config.paths.metrics_dir.join(split.as_str());
    write_reports(&report, &dir)?;
    write_rows(
        &dir.join(UNMATCHED_ANNOTATIONS),
        &["Study"],
        joined.unmatched_studies.iter().map(|s| [s]),
    )?;
    info!(split = %split, dir = %dir.display(), "Evaluation finished");
    Ok(())
}
