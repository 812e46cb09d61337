//! Study keys derived from publication filenames.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Normalised `"YYYY[.MM], Author"` identifier shared by every file of one study.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StudyKey(String);

impl StudyKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StudyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn study_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Year with optional .month (1-12, optional leading zero), comma, first author surname
        Regex::new(r"^([0-9]{4}(?:\.(?:0?[1-9]|1[0-2]))?),\s*([A-Za-z]+)").unwrap()
    })
}

/// Extract the study key from a filename such as `"2010, Kruer - case1.pdf"`.
///
/// Anything after the author token is ignored. Returns `None` when the filename
/// does not start with a year/author prefix.
pub fn extract_study_key(filename: &str) -> Option<StudyKey> {
    let caps = study_key_regex().captures(filename)?;
    let year_month = caps.get(1)?.as_str();
    let first_author = caps.get(2)?.as_str();
    Some(StudyKey(format!("{year_month}, {first_author}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> Option<String> {
        extract_study_key(name).map(StudyKey::into_string)
    }

    #[test]
    fn test_plain_year_author() {
        assert_eq!(key("2010, Kruer - case1.pdf").as_deref(), Some("2010, Kruer"));
        assert_eq!(key("2010,Kruer.pdf").as_deref(), Some("2010, Kruer"));
    }

    #[test]
    fn test_year_month() {
        assert_eq!(key("2015.03, Titulaer supplement.docx").as_deref(), Some("2015.03, Titulaer"));
        assert_eq!(key("2015.3, Titulaer.pdf").as_deref(), Some("2015.3, Titulaer"));
        assert_eq!(key("2015.12, Smith.pdf").as_deref(), Some("2015.12, Smith"));
        assert_eq!(key("2015.10, Smith.pdf").as_deref(), Some("2015.10, Smith"));
    }

    #[test]
    fn test_invalid_month_yields_none() {
        assert_eq!(key("2015.13, Smith.pdf"), None);
        assert_eq!(key("2015.00, Smith.pdf"), None);
    }

    #[test]
    fn test_author_stops_at_first_non_letter() {
        // Non-ASCII letters end the author token
        assert_eq!(key("2010, Prüss-Wandinger.pdf").as_deref(), Some("2010, Pr"));
        assert_eq!(key("2012, O'Brien.pdf").as_deref(), Some("2012, O"));
    }

    #[test]
    fn test_unparsable_names() {
        assert_eq!(key("notes.txt"), None);
        assert_eq!(key("Kruer 2010.pdf"), None);
        assert_eq!(key(" 2010, Kruer.pdf"), None);
        assert_eq!(key("2010 Kruer.pdf"), None);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let name = "2019.07, Dalmau - appendix.xls";
        assert_eq!(extract_study_key(name), extract_study_key(name));
    }
}
