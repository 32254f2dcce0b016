use foundation::math::stable_total_cmp_f64;

pub struct Statistics;

impl Statistics {
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        for &v in values {
            sum += v;
        }
        Some(sum / values.len() as f64)
    }

    pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
        let first = *values.first()?;
        let mut min = first;
        let mut max = first;
        for &v in values.iter().skip(1) {
            min = min.min(v);
            max = max.max(v);
        }
        Some((min, max))
    }

    /// Median; an even-sized input averages the two central values.
    pub fn median(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| stable_total_cmp_f64(*a, *b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        } else {
            Some(sorted[mid])
        }
    }
}

/// Rounds to one decimal place, the precision used for percentages.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::{Statistics, round1};

    #[test]
    fn mean_works() {
        let m = Statistics::mean(&[1.0, 2.0, 3.0]).unwrap();
        assert!((m - 2.0).abs() < 1e-9);
        assert!(Statistics::mean(&[]).is_none());
    }

    #[test]
    fn min_max_works() {
        assert_eq!(Statistics::min_max(&[3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(Statistics::min_max(&[]), None);
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(Statistics::median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(Statistics::median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(Statistics::median(&[7.0]), Some(7.0));
        assert_eq!(Statistics::median(&[]), None);
    }

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round1(33.333), 33.3);
        assert_eq!(round1(66.66), 66.7);
    }
}
