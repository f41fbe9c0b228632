//! Measurement deduplication
//!
//! Several markers can snap to the same frequency (anti-aliased fragments,
//! stray specks). Storage layers collapse them to one value per frequency
//! using the median threshold.

use std::collections::BTreeMap;

use crate::shared::Measurement;

use super::calibration::round_one_decimal;

/// Collapse measurements sharing a frequency into their median threshold.
///
/// Even-sized groups use the mean of the two middle values. The result is
/// sorted by frequency; a group is flagged `clamped` if any member was.
pub fn deduplicate_by_frequency(measurements: &[Measurement]) -> Vec<Measurement> {
    let mut groups: BTreeMap<u32, Vec<&Measurement>> = BTreeMap::new();
    for m in measurements {
        groups.entry(m.frequency_hz).or_default().push(m);
    }

    groups
        .into_iter()
        .map(|(frequency_hz, group)| {
            let mut thresholds: Vec<f64> = group.iter().map(|m| m.threshold_db).collect();
            thresholds.sort_by(f64::total_cmp);

            let mid = thresholds.len() / 2;
            let median = if thresholds.len() % 2 == 0 {
                (thresholds[mid - 1] + thresholds[mid]) / 2.0
            } else {
                thresholds[mid]
            };

            Measurement {
                frequency_hz,
                threshold_db: round_one_decimal(median),
                clamped: group.iter().any(|m| m.clamped),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_measurements_pass_through_sorted() {
        let input = vec![Measurement::new(2000, 30.0), Measurement::new(500, 10.0)];
        let result = deduplicate_by_frequency(&input);
        assert_eq!(result, vec![Measurement::new(500, 10.0), Measurement::new(2000, 30.0)]);
    }

    #[test]
    fn test_odd_group_keeps_median() {
        let input = vec![
            Measurement::new(1000, 20.0),
            Measurement::new(1000, 80.0),
            Measurement::new(1000, 25.0),
        ];
        let result = deduplicate_by_frequency(&input);
        assert_eq!(result, vec![Measurement::new(1000, 25.0)]);
    }

    #[test]
    fn test_even_group_averages_middle_values() {
        let input = vec![Measurement::new(4000, 40.0), Measurement::new(4000, 45.0)];
        let result = deduplicate_by_frequency(&input);
        assert_eq!(result[0].threshold_db, 42.5);
    }

    #[test]
    fn test_clamped_flag_survives_grouping() {
        let input = vec![
            Measurement::new(8000, 118.0),
            Measurement {
                clamped: true,
                ..Measurement::new(8000, 120.0)
            },
        ];
        let result = deduplicate_by_frequency(&input);
        assert!(result[0].clamped);
    }

    #[test]
    fn test_empty_input() {
        assert!(deduplicate_by_frequency(&[]).is_empty());
    }
}
