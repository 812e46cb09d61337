//! Study-name analysis: tokenising names and group keys into year and author parts.

use std::sync::OnceLock;

use regex::Regex;

fn delimiter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ .,\-×³]+").unwrap())
}

/// A classified token of a study name or group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePart<'a> {
    Year(&'a str),
    Author(&'a str),
}

impl<'a> NamePart<'a> {
    pub fn classify(part: &'a str) -> Self {
        if is_year(part) {
            NamePart::Year(part)
        } else {
            NamePart::Author(part)
        }
    }
}

/// Split a name on spaces, dots, commas, hyphens, `×` and `³`, dropping empty parts.
pub fn split_study_name(name: &str) -> Vec<&str> {
    delimiter_regex().split(name).filter(|p| !p.is_empty()).collect()
}

/// Exactly four ASCII digits.
pub fn is_year(part: &str) -> bool {
    part.len() == 4 && part.bytes().all(|b| b.is_ascii_digit())
}

/// Year and author components of a name, with the patterns used by the matcher.
#[derive(Debug, Clone)]
pub struct StudyParts {
    pub years: Vec<String>,
    pub authors: Vec<String>,
    /// One whole-word pattern, present only when the name has exactly one year.
    pub year_patterns: Vec<String>,
    /// Whole-word, case-sensitive pattern per author token.
    pub author_patterns: Vec<Regex>,
}

impl StudyParts {
    /// Whether the name constrains the year (exactly one year token).
    pub fn has_year_constraint(&self) -> bool {
        !self.year_patterns.is_empty()
    }
}

fn whole_word(token: &str) -> String {
    format!(r"\b{}\b", regex::escape(token))
}

/// Split a name and classify its parts into years and authors.
///
/// Names with zero or several year tokens get no year pattern at all, so they are
/// never year-checked against anything.
pub fn analyze_study_parts(name: &str) -> Result<StudyParts, regex::Error> {
    let mut years = Vec::new();
    let mut authors = Vec::new();
    for part in split_study_name(name) {
        match NamePart::classify(part) {
            NamePart::Year(y) => years.push(y.to_string()),
            NamePart::Author(a) => authors.push(a.to_string()),
        }
    }

    let author_patterns = authors
        .iter()
        .map(|a| Regex::new(&whole_word(a)))
        .collect::<Result<Vec<_>, _>>()?;

    let year_patterns = match years.as_slice() {
        [only] => vec![whole_word(only)],
        _ => Vec::new(),
    };

    Ok(StudyParts { years, authors, year_patterns, author_patterns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_on_all_delimiters() {
        assert_eq!(split_study_name("Kruer, 2010"), vec!["Kruer", "2010"]);
        assert_eq!(
            split_study_name("Tituler, Höftberger - Dalmau, 2014"),
            vec!["Tituler", "Höftberger", "Dalmau", "2014"]
        );
        assert_eq!(split_study_name("2015.03, Smith×Jones³"), vec!["2015", "03", "Smith", "Jones"]);
        assert!(split_study_name(" ,.- ").is_empty());
    }

    #[test]
    fn test_is_year() {
        assert!(is_year("2010"));
        assert!(!is_year("201"));
        assert!(!is_year("20100"));
        assert!(!is_year("20a0"));
    }

    #[test]
    fn test_single_year_name() {
        let parts = analyze_study_parts("Kruer, 2010").unwrap();
        assert_eq!(parts.years, vec!["2010"]);
        assert_eq!(parts.authors, vec!["Kruer"]);
        assert_eq!(parts.year_patterns, vec![r"\b2010\b".to_string()]);
        assert_eq!(parts.author_patterns.len(), 1);
        assert!(parts.has_year_constraint());
    }

    #[test]
    fn test_multi_author_name() {
        let parts = analyze_study_parts("Tituler, Höftberger - Dalmau, 2014").unwrap();
        assert_eq!(parts.authors, vec!["Tituler", "Höftberger", "Dalmau"]);
        assert_eq!(parts.author_patterns.len(), 3);
        assert_eq!(parts.year_patterns, vec![r"\b2014\b".to_string()]);
    }

    #[test]
    fn test_zero_or_many_years_disable_year_constraint() {
        let none = analyze_study_parts("Kruer").unwrap();
        assert!(!none.has_year_constraint());

        let many = analyze_study_parts("Smith and Jones, 2012 and 2013").unwrap();
        assert_eq!(many.years, vec!["2012", "2013"]);
        assert!(!many.has_year_constraint());
        assert_eq!(many.authors, vec!["Smith", "and", "Jones", "and"]);
    }

    #[test]
    fn test_author_pattern_is_whole_word_and_case_sensitive() {
        let parts = analyze_study_parts("2010, Kruer").unwrap();
        let re = &parts.author_patterns[0];
        assert!(re.is_match("Kruer, 2010"));
        assert!(!re.is_match("Kruers, 2010"));
        assert!(!re.is_match("kruer, 2010"));
    }

    #[test]
    fn test_month_token_is_an_author_part() {
        let parts = analyze_study_parts("2010.05, Kruer").unwrap();
        assert_eq!(parts.authors, vec!["05", "Kruer"]);
    }
}
