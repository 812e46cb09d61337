//! Study → file resolution and per-study text assembly.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use ipdmeta_matcher::{FileEntry, MatchRecord, StudyGroups};
use tracing::{debug, info, warn};

use crate::extract::{extract_text, ExtractError};

/// The files a study's text is assembled from.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyFileSet {
    pub study: String,
    pub files: Vec<FileEntry>,
}

/// Counters for the text-assembly pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureReport {
    pub studies: usize,
    pub files_read: usize,
    pub missing: usize,
    pub unsupported: usize,
    pub failed: usize,
    pub empty_studies: usize,
}

/// Attach every group file to the studies matched to that group.
///
/// A study that appears on several matched rows collects the files of all of
/// its groups. Studies keep the order of their first matched row.
pub fn resolve_study_files(matched: &[MatchRecord], groups: &StudyGroups) -> Vec<StudyFileSet> {
    let mut sets: Vec<StudyFileSet> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in matched {
        let idx = *index.entry(record.study.clone()).or_insert_with(|| {
            sets.push(StudyFileSet { study: record.study.clone(), files: Vec::new() });
            sets.len() - 1
        });
        match groups.get(&record.group) {
            Some(group) => sets[idx].files.extend(group.files.iter().cloned()),
            None => warn!(study = %record.study, group = %record.group, "Matched group not in review file"),
        }
    }

    let total_files: usize = sets.iter().map(|s| s.files.len()).sum();
    info!("Resolved {} studies to {} files", sets.len(), total_files);

    for set in &sets {
        if set.files.len() != 1 {
            info!(study = %set.study, files = set.files.len(), "Study does not map to exactly one file, inspect manually");
        }
    }

    sets
}

/// Assemble study texts using the given extractor. Paths in the file sets are
/// resolved against `base_dir`.
pub fn build_study_texts_with<F>(
    sets: &[StudyFileSet],
    base_dir: &Path,
    mut extractor: F,
) -> (BTreeMap<String, String>, StructureReport)
where
    F: FnMut(&Path) -> Result<String, ExtractError>,
{
    let mut texts = BTreeMap::new();
    let mut report = StructureReport::default();

    for (i, set) in sets.iter().enumerate() {
        debug!(n = i + 1, study = %set.study, "Processing study");
        report.studies += 1;

        if set.files.is_empty() {
            warn!(study = %set.study, "No study group found for study");
            report.empty_studies += 1;
            texts.insert(set.study.clone(), String::new());
            continue;
        }

        let mut all_text = String::new();
        for entry in &set.files {
            let path = base_dir.join(&entry.full_path);
            match extractor(&path) {
                Ok(text) => {
                    debug!(file = %entry.filename, chars = text.len(), "Read file");
                    report.files_read += 1;
                    all_text.push_str(&text);
                    all_text.push('\n');
                }
                Err(ExtractError::Missing(p)) => {
                    warn!(study = %set.study, path = %p.display(), "Invalid file path, skipping");
                    report.missing += 1;
                }
                Err(ExtractError::Unsupported(ext)) => {
                    warn!(study = %set.study, file = %entry.filename, ext = %ext, "Skipped unsupported file type");
                    report.unsupported += 1;
                }
                Err(e) => {
                    warn!(study = %set.study, error = %e, "Text extraction failed");
                    report.failed += 1;
                    all_text.push('\n');
                }
            }
        }

        let text = all_text.trim().to_string();
        if text.is_empty() {
            report.empty_studies += 1;
        }
        texts.insert(set.study.clone(), text);
    }

    info!(
        studies = report.studies,
        files = report.files_read,
        missing = report.missing,
        unsupported = report.unsupported,
        failed = report.failed,
        "Study texts assembled"
    );
    (texts, report)
}

pub fn build_study_texts(sets: &[StudyFileSet], base_dir: &Path) -> (BTreeMap<String, String>, StructureReport) {
    build_study_texts_with(sets, base_dir, extract_text)
}

/// Drop the given studies. Returns how many keys were actually removed.
pub fn remove_excluded(texts: &mut BTreeMap<String, String>, keys: &[String]) -> usize {
    let mut removed = 0;
    for key in keys {
        if texts.remove(key).is_some() {
            info!(study = ?key, "Removed");
            removed += 1;
        } else {
            warn!(study = ?key, "Not found");
        }
    }
    info!("Total number of studies in the final dataset: {}", texts.len());
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn entry(name: &str) -> FileEntry {
        FileEntry { filename: name.to_string(), full_path: format!("articles/{name}") }
    }

    fn groups() -> StudyGroups {
        let mut g = StudyGroups::new();
        g.insert("2010, Kruer", entry("2010, Kruer.pdf"));
        g.insert("2012, Smith", entry("2012, Smith.pdf"));
        g.insert("2012, Smith", entry("2012, Smith - supplement.docx"));
        g.insert("2013, Jones", entry("2013, Jones.doc"));
        g
    }

    fn matched(rows: &[(&str, &str)]) -> Vec<MatchRecord> {
        rows.iter()
            .map(|(s, g)| MatchRecord { study: s.to_string(), group: g.to_string() })
            .collect()
    }

    #[test]
    fn test_resolve_accumulates_across_rows() {
        let sets = resolve_study_files(
            &matched(&[("Smith, 2012", "2012, Smith"), ("Kruer, 2010", "2010, Kruer"), ("Smith, 2012", "2010, Kruer")]),
            &groups(),
        );
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].study, "Smith, 2012");
        assert_eq!(sets[0].files.len(), 3);
        assert_eq!(sets[1].files, vec![entry("2010, Kruer.pdf")]);
    }

    #[test]
    fn test_resolve_unknown_group_gives_empty_set() {
        let sets = resolve_study_files(&matched(&[("Ghost, 1999", "1999, Ghost")]), &groups());
        assert_eq!(sets, vec![StudyFileSet { study: "Ghost, 1999".to_string(), files: vec![] }]);
    }

    fn fake_extractor(path: &Path) -> Result<String, ExtractError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if name.ends_with(".doc") {
            Err(ExtractError::Unsupported("doc".to_string()))
        } else if name.contains("missing") {
            Err(ExtractError::Missing(path.to_path_buf()))
        } else {
            Ok(format!("  text of {name}  "))
        }
    }

    #[test]
    fn test_texts_concatenate_and_trim() {
        let sets = vec![
            StudyFileSet {
                study: "Smith, 2012".to_string(),
                files: vec![entry("a.pdf"), entry("missing.pdf"), entry("b.doc"), entry("c.docx")],
            },
            StudyFileSet { study: "Empty, 2000".to_string(), files: vec![] },
        ];
        let (texts, report) = build_study_texts_with(&sets, Path::new("/base"), fake_extractor);
        assert_eq!(texts["Smith, 2012"], "text of a.pdf  \n  text of c.docx");
        assert_eq!(texts["Empty, 2000"], "");
        assert_eq!(report.files_read, 2);
        assert_eq!(report.missing, 1);
        assert_eq!(report.unsupported, 1);
        assert_eq!(report.empty_studies, 1);
    }

    #[test]
    fn test_paths_resolved_against_base_dir() {
        let sets = vec![StudyFileSet { study: "S".to_string(), files: vec![entry("x.pdf")] }];
        let mut seen: Vec<PathBuf> = Vec::new();
        build_study_texts_with(&sets, Path::new("/base"), |p| {
            seen.push(p.to_path_buf());
            Ok(String::new())
        });
        assert_eq!(seen, vec![PathBuf::from("/base/articles/x.pdf")]);
    }

    #[test]
    fn test_remove_excluded_counts_hits() {
        let mut texts = BTreeMap::new();
        texts.insert("Raynor -Berkowitz, 2016".to_string(), "t".to_string());
        texts.insert("Kruer, 2010".to_string(), "t".to_string());
        let removed = remove_excluded(
            &mut texts,
            &["Raynor -Berkowitz, 2016".to_string(), "Not there, 1990".to_string()],
        );
        assert_eq!(removed, 1);
        assert_eq!(texts.keys().collect::<Vec<_>>(), vec!["Kruer, 2010"]);
    }
}
