//! Seeded, stratified split of study texts into pilot / development / validation.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ipdmeta_common::interchange::write_study_map;
use ipdmeta_common::{CaseCountTable, SplitName};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_pilot_single")]
    pub pilot_single: usize,
    #[serde(default = "default_development_single")]
    pub development_single: usize,
    #[serde(default = "default_development_series")]
    pub development_series: usize,
}

fn default_seed() -> u64 { 42 }
fn default_pilot_single() -> usize { 5 }
fn default_development_single() -> usize { 20 }
fn default_development_series() -> usize { 10 }

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            pilot_single: default_pilot_single(),
            development_single: default_development_single(),
            development_series: default_development_series(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("Not enough {category} studies to sample {needed} (only {available} available)")]
    InsufficientCandidates {
        category: &'static str,
        needed: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetSplit {
    pub pilot: BTreeMap<String, String>,
    pub development: BTreeMap<String, String>,
    pub validation: BTreeMap<String, String>,
}

impl DatasetSplit {
    pub fn get(&self, name: SplitName) -> &BTreeMap<String, String> {
        match name {
            SplitName::Pilot       => &self.pilot,
            SplitName::Development => &self.development,
            SplitName::Validation  => &self.validation,
        }
    }

    /// Write `{pilot,development,validation}_set.json` into `dir`.
    pub fn write(&self, dir: &Path) -> ipdmeta_common::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(SplitName::ALL.len());
        for name in SplitName::ALL {
            let path = dir.join(name.set_file());
            write_study_map(self.get(name), &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Split `texts` by case count.
///
/// Single-case (count == 1) and case-series (count > 1) candidates are taken in
/// case-table order and restricted to studies that have a text. The pilot set
/// is drawn from the singles first, development draws from the remaining
/// singles and from the series, and validation is every other study in
/// `texts`.
pub fn split_datasets(
    texts: &BTreeMap<String, String>,
    counts: &CaseCountTable,
    config: &SplitConfig,
) -> Result<DatasetSplit, SplitError> {
    let singles = candidates(counts.single_case_studies(), texts);
    let series = candidates(counts.case_series_studies(), texts);
    info!(single = singles.len(), series = series.len(), "Split candidates");

    let mut rng = StdRng::seed_from_u64(config.seed);

    let pilot = sample(&mut rng, &singles, config.pilot_single, "single-case")?;
    let pilot_keys: HashSet<&str> = pilot.iter().copied().collect();
    let remaining_singles: Vec<&str> = singles
        .iter()
        .copied()
        .filter(|s| !pilot_keys.contains(s))
        .collect();

    let dev_single = sample(&mut rng, &remaining_singles, config.development_single, "single-case")?;
    let dev_series = sample(&mut rng, &series, config.development_series, "case-series")?;

    let take = |keys: &[&str]| -> BTreeMap<String, String> {
        keys.iter()
            .filter_map(|k| texts.get_key_value(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    };

    let pilot_set = take(&pilot);
    let mut development = take(&dev_single);
    development.extend(take(&dev_series));

    let validation: BTreeMap<String, String> = texts
        .iter()
        .filter(|(k, _)| !pilot_set.contains_key(*k) && !development.contains_key(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    info!(
        pilot = pilot_set.len(),
        development = development.len(),
        validation = validation.len(),
        seed = config.seed,
        "Dataset split"
    );

    Ok(DatasetSplit { pilot: pilot_set, development, validation })
}

fn candidates<'a>(studies: Vec<&'a str>, texts: &BTreeMap<String, String>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    studies
        .into_iter()
        .filter(|s| texts.contains_key(*s) && seen.insert(*s))
        .collect()
}

fn sample<'a>(
    rng: &mut StdRng,
    pool: &[&'a str],
    n: usize,
    category: &'static str,
) -> Result<Vec<&'a str>, SplitError> {
    if pool.len() < n {
        return Err(SplitError::InsufficientCandidates { category, needed: n, available: pool.len() });
    }
    Ok(pool.choose_multiple(rng, n).copied().collect())
}
