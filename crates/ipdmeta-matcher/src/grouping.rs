//! Grouping of raw publication files by study key.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::key::extract_study_key;
use crate::Result;

/// One file belonging to a study group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub full_path: String,
}

/// Files sharing one study key, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGroup {
    pub key: String,
    pub files: Vec<FileEntry>,
}

/// Ordered collection of file groups plus the files that could not be keyed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyGroups {
    groups: Vec<FileGroup>,
    index: HashMap<String, usize>,
    unassigned: Vec<String>,
}

impl StudyGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` to the group for `key`, creating the group on first sight.
    pub fn insert(&mut self, key: impl Into<String>, entry: FileEntry) {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => self.groups[i].files.push(entry),
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(FileGroup { key, files: vec![entry] });
            }
        }
    }

    pub fn push_unassigned(&mut self, filename: impl Into<String>) {
        self.unassigned.push(filename.into());
    }

    pub fn groups(&self) -> &[FileGroup] {
        &self.groups
    }

    pub fn get(&self, key: &str) -> Option<&FileGroup> {
        self.index.get(key).map(|&i| &self.groups[i])
    }

    /// Group keys in first-appearance order.
    pub fn keys(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    /// Filenames without an extractable study key.
    pub fn unassigned(&self) -> &[String] {
        &self.unassigned
    }
}

/// Group `(filename, full path)` pairs by their study key.
pub fn group_entries<I>(entries: I) -> StudyGroups
where
    I: IntoIterator<Item = FileEntry>,
{
    let mut groups = StudyGroups::new();
    for entry in entries {
        match extract_study_key(&entry.filename) {
            Some(key) => groups.insert(key.into_string(), entry),
            None => {
                warn!(filename = %entry.filename, "No study key in filename; file left unassigned");
                groups.push_unassigned(entry.filename);
            }
        }
    }
    groups
}

/// Group every regular file directly inside `dir`.
///
/// Entries are visited in sorted filename order so repeated runs produce identical output.
pub fn group_files(dir: &Path) -> Result<StudyGroups> {
    let mut entries = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let dirent = dirent?;
        if !dirent.path().is_file() {
            continue;
        }
        let filename = dirent.file_name().to_string_lossy().into_owned();
        entries.push(FileEntry {
            full_path: dir.join(&filename).display().to_string(),
            filename,
        });
    }
    entries.sort_by(|a, b| a.filename.cmp(&b.filename));

    let groups = group_entries(entries);
    info!(
        groups = groups.len(),
        files = groups.total_files(),
        unassigned = groups.unassigned().len(),
        "Grouped publication files in {}",
        dir.display()
    );
    Ok(groups)
}
