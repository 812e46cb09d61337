use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use ipdmeta_common::interchange::{read_study_map, write_study_map};
use ipdmeta_common::{CaseCount, CaseCountTable};
use ipdmeta_ingestion::{build_study_texts, remove_excluded, resolve_study_files, split_datasets, SplitConfig};
use ipdmeta_matcher::{FileEntry, MatchRecord, StudyGroups};
use pretty_assertions::assert_eq;

fn write_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default()).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

#[test]
fn test_structure_stage_end_to_end() {
    let base = tempfile::tempdir().unwrap();
    let articles = base.path().join("NMDARE SR articles");
    std::fs::create_dir_all(&articles).unwrap();

    write_docx(&articles.join("2010, Kruer.docx"), &["A 23-year-old woman", "presented with psychosis."]);
    write_docx(&articles.join("2012, Smith - table.docx"), &["Table 1"]);
    std::fs::write(articles.join("2012, Smith.txt"), "ignored").unwrap();

    let entry = |name: &str| FileEntry {
        filename: name.to_string(),
        full_path: format!("NMDARE SR articles/{name}"),
    };
    let mut groups = StudyGroups::new();
    groups.insert("2010, Kruer", entry("2010, Kruer.docx"));
    groups.insert("2012, Smith", entry("2012, Smith - table.docx"));
    groups.insert("2012, Smith", entry("2012, Smith.txt"));
    groups.insert("2016, Raynor", entry("2016, Raynor.pdf"));

    let matched = vec![
        MatchRecord { study: "Kruer, 2010".to_string(), group: "2010, Kruer".to_string() },
        MatchRecord { study: "Smith, 2012".to_string(), group: "2012, Smith".to_string() },
        MatchRecord { study: "Raynor -Berkowitz, 2016".to_string(), group: "2016, Raynor".to_string() },
    ];

    let sets = resolve_study_files(&matched, &groups);
    let (mut texts, report) = build_study_texts(&sets, base.path());

    assert_eq!(texts["Kruer, 2010"], "A 23-year-old woman\npresented with psychosis.");
    assert_eq!(texts["Smith, 2012"], "Table 1");
    assert_eq!(texts["Raynor -Berkowitz, 2016"], "");
    assert_eq!(report.files_read, 2);
    assert_eq!(report.unsupported, 1);
    assert_eq!(report.missing, 1);

    remove_excluded(&mut texts, &["Raynor -Berkowitz, 2016".to_string()]);
    let out = base.path().join("preprocess_outputs").join("study_to_text.json");
    write_study_map(&texts, &out).unwrap();
    assert_eq!(read_study_map(&out).unwrap(), texts);

    let counts = CaseCountTable::new(vec![
        CaseCount { study: "Kruer, 2010".to_string(), count: 1 },
        CaseCount { study: "Smith, 2012".to_string(), count: 4 },
    ]);
    let config = SplitConfig { pilot_single: 1, development_single: 0, development_series: 1, ..Default::default() };
    let split = split_datasets(&texts, &counts, &config).unwrap();
    assert_eq!(split.pilot.keys().collect::<Vec<_>>(), vec!["Kruer, 2010"]);
    assert_eq!(split.development.keys().collect::<Vec<_>>(), vec!["Smith, 2012"]);
    assert_eq!(split.validation, BTreeMap::new());
}
