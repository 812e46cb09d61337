//! Agreement between extracted and annotated values on *which* values are missing.

use crate::join::MatchedPair;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissingAgreement {
    /// Pairs where at least one side is missing.
    pub total: usize,
    /// Pairs where both sides are missing.
    pub matched: usize,
    /// `matched / total`, or `None` when nothing is missing.
    pub rate: Option<f64>,
}

pub fn missing_value_agreement(pairs: &[MatchedPair], feature: &str) -> MissingAgreement {
    let mut total = 0;
    let mut matched = 0;
    for pair in pairs {
        let (truth, pred) = pair.values(feature);
        let (t_missing, p_missing) = (truth.is_missing(), pred.is_missing());
        if t_missing || p_missing {
            total += 1;
            if t_missing && p_missing {
                matched += 1;
            }
        }
    }
    let rate = (total > 0).then(|| matched as f64 / total as f64);
    MissingAgreement { total, matched, rate }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipdmeta_common::Value;
    use std::collections::BTreeMap;

    fn pair(truth: Value, pred: Value) -> MatchedPair {
        MatchedPair {
            study: "S".to_string(),
            patient_idx: 0,
            y_true: BTreeMap::from([("f".to_string(), truth)]),
            y_pred: BTreeMap::from([("f".to_string(), pred)]),
        }
    }

    #[test]
    fn test_every_pair_with_a_missing_side_counts() {
        let pairs = vec![
            pair(Value::Missing, Value::Missing),
            pair(Value::Number(5.0), Value::Missing),
            pair(Value::Missing, Value::Number(3.0)),
        ];
        let agreement = missing_value_agreement(&pairs, "f");
        assert_eq!(agreement.total, 3);
        assert_eq!(agreement.matched, 1);
        assert_eq!(agreement.rate, Some(1.0 / 3.0));
    }

    #[test]
    fn test_half_of_missing_pairs_agree() {
        let pairs = vec![
            pair(Value::Missing, Value::Missing),
            pair(Value::Number(5.0), Value::Missing),
            pair(Value::Number(4.0), Value::Number(3.0)),
        ];
        assert_eq!(missing_value_agreement(&pairs, "f").rate, Some(0.5));
    }

    #[test]
    fn test_nan_and_blank_count_as_missing() {
        let pairs = vec![pair(Value::Number(f64::NAN), Value::Text("  ".to_string()))];
        let agreement = missing_value_agreement(&pairs, "f");
        assert_eq!(agreement.rate, Some(1.0));
    }

    #[test]
    fn test_no_missing_gives_no_rate() {
        let pairs = vec![pair(Value::Number(1.0), Value::Number(2.0))];
        assert_eq!(missing_value_agreement(&pairs, "f").rate, None);
    }
}
