use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a formula's literals differ from the cards on the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultisetMismatch {
    pub expected: Vec<i64>,
    pub found: Vec<i64>,
    /// `(value, count)` pairs the formula left out.
    pub missing: Vec<(i64, usize)>,
    /// `(value, count)` pairs the formula used beyond the cards.
    pub extra: Vec<(i64, usize)>,
}

impl fmt::Display for MultisetMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {:?}; found {:?} ({})",
            self.expected,
            self.found,
            self.summary()
        )
    }
}

impl MultisetMismatch {
    /// `missing 3x1; extra 4x2`
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing {}", format_counts(&self.missing)));
        }
        if !self.extra.is_empty() {
            parts.push(format!("extra {}", format_counts(&self.extra)));
        }
        if parts.is_empty() {
            return "numbers mismatch".to_string();
        }
        parts.join("; ")
    }
}

fn format_counts(counts: &[(i64, usize)]) -> String {
    counts
        .iter()
        .map(|(value, count)| format!("{value}x{count}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks that `found` uses every required value exactly once.
pub fn check_card_usage(required: &[i64], found: &[i64]) -> Result<(), MultisetMismatch> {
    let mut expected = required.to_vec();
    expected.sort_unstable();
    let mut used = found.to_vec();
    used.sort_unstable();
    if expected == used {
        return Ok(());
    }

    let mut balance: BTreeMap<i64, i64> = BTreeMap::new();
    for value in &used {
        *balance.entry(*value).or_default() += 1;
    }
    for value in &expected {
        *balance.entry(*value).or_default() -= 1;
    }
    let mut missing = Vec::new();
    let mut extra = Vec::new();
    for (value, diff) in balance {
        if diff > 0 {
            extra.push((value, diff as usize));
        } else if diff < 0 {
            missing.push((value, diff.unsigned_abs() as usize));
        }
    }
    Err(MultisetMismatch {
        expected,
        found: used,
        missing,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_does_not_matter() {
        assert!(check_card_usage(&[3, 3, 8, 8], &[8, 3, 8, 3]).is_ok());
        assert!(check_card_usage(&[6, 6, 6, 6], &[6, 6, 6, 6]).is_ok());
    }

    #[test]
    fn reports_missing_and_extra_counts() {
        let err = check_card_usage(&[1, 5, 5, 5], &[5, 5, 4, 4]).unwrap_err();
        assert_eq!(err.expected, vec![1, 5, 5, 5]);
        assert_eq!(err.found, vec![4, 4, 5, 5]);
        assert_eq!(err.missing, vec![(1, 1), (5, 1)]);
        assert_eq!(err.extra, vec![(4, 2)]);
        assert_eq!(err.summary(), "missing 1x1, 5x1; extra 4x2");
    }

    #[test]
    fn too_few_and_too_many_values() {
        let short = check_card_usage(&[6, 6, 6, 6], &[6, 6, 6]).unwrap_err();
        assert_eq!(short.missing, vec![(6, 1)]);
        assert!(short.extra.is_empty());

        let long = check_card_usage(&[6, 6, 6, 6], &[6, 6, 6, 6, 6]).unwrap_err();
        assert_eq!(long.extra, vec![(6, 1)]);
        assert!(long.missing.is_empty());
        assert_eq!(long.to_string(), "expected [6, 6, 6, 6]; found [6, 6, 6, 6, 6] (extra 6x1)");
    }
}
