//! CSV interchange for the manual review steps around the matcher.
//!
//! group  → `study_groups_review.csv`  → reviewer edits → `read_group_review`
//! match  → `matched_output.csv`, `unmatched_studies.csv`, `unmatched_groups.csv`

use std::path::{Path, PathBuf};

use ipdmeta_common::interchange::{read_columns, write_rows};
use tracing::info;

use crate::grouping::{FileEntry, StudyGroups};
use crate::matching::{MatchOutcome, MatchRecord};
use crate::Result;

pub const COL_GROUP_KEY: &str = "Study Group Key";
pub const COL_FILENAME: &str = "Filename";
pub const COL_FULL_PATH: &str = "Full Path";
pub const COL_STUDY_NAME: &str = "Study Name";
pub const COL_MATCHED_GROUP: &str = "Matched Group Name";

pub const MATCHED_OUTPUT: &str = "matched_output.csv";
pub const UNMATCHED_STUDIES: &str = "unmatched_studies.csv";
pub const UNMATCHED_GROUPS: &str = "unmatched_groups.csv";

/// Rewrites the leading folder of full paths so they point at the reviewer's copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    pub from: String,
    pub to: String,
}

impl PathPrefix {
    fn apply(&self, path: &str) -> String {
        path.replace(&self.from, &self.to)
    }
}

/// Write one row per grouped file for manual review.
pub fn write_group_review(groups: &StudyGroups, path: &Path, prefix: Option<&PathPrefix>) -> Result<()> {
    let rows = groups.groups().iter().flat_map(|g| {
        g.files.iter().map(move |f| {
            let full_path = match prefix {
                Some(p) => p.apply(&f.full_path),
                None => f.full_path.clone(),
            };
            [g.key.clone(), f.filename.clone(), full_path]
        })
    });
    write_rows(path, &[COL_GROUP_KEY, COL_FILENAME, COL_FULL_PATH], rows)?;
    info!("Output file for further manual process: {}", path.display());
    Ok(())
}

/// Write the filenames that carried no study key.
pub fn write_unassigned(groups: &StudyGroups, path: &Path) -> Result<()> {
    write_rows(path, &[COL_FILENAME], groups.unassigned().iter().map(|f| [f]))?;
    Ok(())
}

/// Read a (possibly hand-edited) group review file.
///
/// Keys and paths are trimmed; rows missing either are skipped.
pub fn read_group_review(path: &Path) -> Result<StudyGroups> {
    let rows = read_columns(path, &[COL_GROUP_KEY, COL_FILENAME, COL_FULL_PATH])?;
    let mut groups = StudyGroups::new();
    for row in rows {
        let key = row[0].trim();
        let full_path = row[2].trim();
        if key.is_empty() || full_path.is_empty() {
            continue;
        }
        groups.insert(
            key,
            FileEntry { filename: row[1].trim().to_string(), full_path: full_path.to_string() },
        );
    }
    info!(
        "Total study groups: {}, total files across all groups: {}",
        groups.len(),
        groups.total_files()
    );
    Ok(groups)
}

/// Write the three-way match outcome into `dir`. Returns the written paths.
pub fn write_match_outcome(outcome: &MatchOutcome, dir: &Path) -> Result<Vec<PathBuf>> {
    let matched = dir.join(MATCHED_OUTPUT);
    write_rows(
        &matched,
        &[COL_STUDY_NAME, COL_MATCHED_GROUP],
        outcome.matched.iter().map(|m| [&m.study, &m.group]),
    )?;

    let studies = dir.join(UNMATCHED_STUDIES);
    write_rows(&studies, &["Unmatched Study Name"], outcome.unmatched_studies.iter().map(|s| [s]))?;

    let groups = dir.join(UNMATCHED_GROUPS);
    write_rows(&groups, &["Unmatched Group Name"], outcome.unmatched_groups.iter().map(|g| [g]))?;

    info!("Number of unmatched studies: {}", outcome.unmatched_studies.len());
    info!("Number of unmatched groups: {}", outcome.unmatched_groups.len());
    Ok(vec![matched, studies, groups])
}

/// Read a (reviewed) study → group file such as `matched_final.csv`.
pub fn read_match_records(path: &Path) -> Result<Vec<MatchRecord>> {
    let rows = read_columns(path, &[COL_STUDY_NAME, COL_MATCHED_GROUP])?;
    Ok(rows
        .into_iter()
        .filter(|r| !r[0].trim().is_empty())
        .map(|mut r| {
            let group = r.pop().unwrap_or_default().trim().to_string();
            let study = r.pop().unwrap_or_default();
            MatchRecord { study, group }
        })
        .collect())
}
