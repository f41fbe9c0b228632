//! Confidence scoring
//!
//! Weighted sum of three checks: per-ear marker count (50%), coverage of the
//! standard frequencies across both ears (25%) and value validity (25%).

use std::collections::HashSet;

use crate::shared::{is_standard_frequency, Measurement, STANDARD_FREQUENCY_COUNT};

use super::calibration::{MAX_THRESHOLD_DB, MIN_THRESHOLD_DB};

/// Share of the score given to marker-count completeness
pub const COUNT_WEIGHT: f64 = 0.5;
/// Share of the score given to frequency coverage
pub const COVERAGE_WEIGHT: f64 = 0.25;
/// Share of the score given to value validity
pub const VALIDITY_WEIGHT: f64 = 0.25;

/// Individual sub-scores behind a confidence value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceBreakdown {
    /// Mean per-ear completeness, 0.0 - 1.0
    pub count: f64,
    /// Fraction of standard frequencies seen in either ear, 0.0 - 1.0
    pub coverage: f64,
    /// No threshold needed clamping and no marker was rejected
    pub values_valid: bool,
}

impl ConfidenceBreakdown {
    /// Unrounded weighted score
    pub fn weighted(&self) -> f64 {
        let validity = if self.values_valid { 1.0 } else { 0.0 };
        COUNT_WEIGHT * self.count + COVERAGE_WEIGHT * self.coverage + VALIDITY_WEIGHT * validity
    }

    /// Final score, rounded to two decimals
    pub fn total(&self) -> f64 {
        ((self.weighted() * 100.0).round() / 100.0).clamp(0.0, 1.0)
    }
}

/// Per-ear completeness: `min(count, expected) / expected`
fn completeness(count: usize, expected_count: usize) -> f64 {
    let expected = expected_count.max(1);
    count.min(expected) as f64 / expected as f64
}

/// Compute the sub-scores.
///
/// `rejected` is the number of markers excluded during transformation;
/// any exclusion fails the validity check just like a clamped value.
pub fn breakdown(
    left: &[Measurement],
    right: &[Measurement],
    expected_count: usize,
    rejected: usize,
) -> ConfidenceBreakdown {
    let count = (completeness(left.len(), expected_count) + completeness(right.len(), expected_count)) / 2.0;

    let covered: HashSet<u32> = left
        .iter()
        .chain(right)
        .map(|m| m.frequency_hz)
        .filter(|&f| is_standard_frequency(f))
        .collect();
    let coverage = covered.len() as f64 / STANDARD_FREQUENCY_COUNT as f64;

    let values_valid = rejected == 0
        && left.iter().chain(right).all(|m| {
            !m.clamped && (MIN_THRESHOLD_DB..=MAX_THRESHOLD_DB).contains(&m.threshold_db)
        });

    ConfidenceBreakdown {
        count,
        coverage,
        values_valid,
    }
}

/// Confidence score in 0.0 - 1.0 for a pair of measurement lists
pub fn score(left: &[Measurement], right: &[Measurement], expected_count: usize) -> f64 {
    breakdown(left, right, expected_count, 0).total()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::STANDARD_FREQUENCIES;

    fn full_ear(db: f64) -> Vec<Measurement> {
        STANDARD_FREQUENCIES
            .iter()
            .map(|&f| Measurement::new(f, db))
            .collect()
    }

    #[test]
    fn test_complete_chart_scores_one() {
        let score = score(&full_ear(10.0), &full_ear(20.0), 9);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_result_keeps_validity_share() {
        // No values means nothing invalid was emitted
        let score = score(&[], &[], 9);
        assert!((score - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_ear_lowers_score() {
        let both = score(&full_ear(10.0), &full_ear(20.0), 9);
        let one = score(&full_ear(10.0), &[], 9);
        assert!(one < both);
        // Count drops by half; coverage is unchanged
        assert!((one - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_coverage() {
        let right: Vec<Measurement> = full_ear(30.0).into_iter().take(5).collect();
        let full = score(&full_ear(10.0), &full_ear(30.0), 9);
        let partial = score(&full_ear(10.0), &right, 9);
        assert!(partial < full);
    }

    #[test]
    fn test_duplicates_inflate_count_but_not_coverage() {
        let dupes = vec![Measurement::new(1000, 20.0); 9];
        let b = breakdown(&dupes, &dupes, 9, 0);
        assert!((b.count - 1.0).abs() < f64::EPSILON);
        assert!((b.coverage - 1.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_count_is_capped_at_expected() {
        let mut many = full_ear(10.0);
        many.extend(full_ear(15.0));
        let b = breakdown(&many, &[], 9, 0);
        assert!((b.count - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamped_value_zeroes_validity() {
        let mut left = full_ear(10.0);
        left[3].clamped = true;
        let b = breakdown(&left, &full_ear(20.0), 9, 0);
        assert!(!b.values_valid);
        assert!((b.total() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejected_marker_zeroes_validity() {
        let b = breakdown(&full_ear(10.0), &full_ear(20.0), 9, 1);
        assert!(!b.values_valid);
    }

    #[test]
    fn test_adding_missing_frequency_never_decreases_score() {
        let mut left: Vec<Measurement> = Vec::new();
        let right = vec![Measurement::new(500, 20.0), Measurement::new(500, 25.0)];
        let mut previous = score(&left, &right, 9);

        for &f in &STANDARD_FREQUENCIES {
            left.push(Measurement::new(f, 15.0));
            let next = score(&left, &right, 9);
            assert!(next >= previous, "{} < {} after adding {} Hz", next, previous, f);
            previous = next;
        }
    }

    #[test]
    fn test_score_always_in_unit_interval() {
        for n in 0..20 {
            let left: Vec<Measurement> = (0..n).map(|i| Measurement::new(STANDARD_FREQUENCIES[i % 9], 50.0)).collect();
            let s = score(&left, &left, 9);
            assert!((0.0..=1.0).contains(&s));
        }
    }
}
