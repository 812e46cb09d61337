//! The fixed extraction prompt sent ahead of every study text.

pub const EXTRACTION_PROMPT: &str = r#"
You are a medical researcher, processing individual patient data from a publication database on N-Methyl-D-Aspartate Receptor Antibody Encephalitis (NMDAR) for an Individual Patient Data Meta-Analysis (IPDMA).
Please identify NMDAR patients in the input publications and extract their following features:
- age (years)
- sex
- tumor
- number of main group of symptoms
- length of hospital stay (days)
- T2 and FLAIR hyperintensities
Output the result in JSON format. Each patient should be a dictionary with these fields.Binary features should be represented as 1 or 0, continuous features as numbers, and other features as strings. If the feature is unknown or not available, leave it as blank.
Output should be in the following format:
[
  {
    "age (years)": <Numeric>,
    "sex": <Binary: Male encoded as 0, Female encoded as 1>,
    "tumor": <Binary: Yes encoded as 1, No encoded as 0>,
    "number of main group of symptoms": <Numeric>,
    "length of hospital stay (days)": <Numeric>,
    "T2 and FLAIR hyperintensities": <Categorical: 'y', 'Normal', 'MRI n.a./not done', 'n', 'CT Normal', 'Abnormal', 'n.a.', 'Previous head trauma Abnormal'>,
  }
]
"#;

/// JSON keys the model is asked to produce, in prompt order.
pub const KEY_AGE: &str = "age (years)";
pub const KEY_SEX: &str = "sex";
pub const KEY_TUMOR: &str = "tumor";
pub const KEY_SYMPTOM_GROUPS: &str = "number of main group of symptoms";
pub const KEY_HOSPITAL_STAY: &str = "length of hospital stay (days)";
pub const KEY_T2_FLAIR: &str = "T2 and FLAIR hyperintensities";
