use crate::error::{Error, Result};

/// Fixed-width frequency counter. Bucket `i` covers `[i * width, (i + 1) * width)`; the last
/// bucket also absorbs everything above its upper bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketHistogram {
    width: f64,
    counts: Vec<u64>,
}

impl BucketHistogram {
    pub fn new(width: f64, buckets: usize) -> Result<Self> {
        if !width.is_finite() || width <= 0.0 {
            return Err(Error::InvalidBucketWidth(width));
        }
        if buckets == 0 {
            return Err(Error::InvalidBucketCount);
        }

        Ok(Self {
            width,
            counts: vec![0; buckets],
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn add(&mut self, value: f64) {
        let idx = self.index_of(value);
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn buckets(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().copied().sum()
    }

    fn index_of(&self, value: f64) -> usize {
        // Negative and NaN samples land in the first bucket instead of failing.
        if value.is_nan() || value <= 0.0 {
            return 0;
        }

        let last = self.counts.len() - 1;
        let idx = (value / self.width).floor();
        if idx >= last as f64 {
            last
        } else {
            idx as usize
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_shapes() {
        assert!(matches!(
            BucketHistogram::new(0.0, 4),
            Err(Error::InvalidBucketWidth(_))
        ));
        assert!(matches!(
            BucketHistogram::new(f64::NAN, 4),
            Err(Error::InvalidBucketWidth(_))
        ));
        assert!(matches!(
            BucketHistogram::new(10.0, 0),
            Err(Error::InvalidBucketCount)
        ));
    }

    #[test]
    fn add_uses_floor_and_clamps_to_last_bucket() {
        let mut h = BucketHistogram::new(10.0, 4)
            .unwrap_or_else(|err| panic!("failed to create histogram: {err}"));

        for v in [0.0, 9.99, 10.0, 25.0, 39.9, 40.0, 1_000.0] {
            h.add(v);
        }

        assert_eq!(h.buckets(), &[2, 1, 1, 3]);
        assert_eq!(h.total(), 7);
    }

    #[test]
    fn negative_and_nan_samples_land_in_first_bucket() {
        let mut h = BucketHistogram::new(5.0, 3)
            .unwrap_or_else(|err| panic!("failed to create histogram: {err}"));
        h.add(-3.0);
        h.add(f64::NAN);

        assert_eq!(h.buckets(), &[2, 0, 0]);
    }

    #[test]
    fn bucket_count_sum_matches_number_of_adds() {
        let mut h = BucketHistogram::new(2.5, 8)
            .unwrap_or_else(|err| panic!("failed to create histogram: {err}"));

        let mut expected = [0u64; 8];
        for i in 0..500u32 {
            let v = f64::from(i) * 0.37;
            h.add(v);
            let idx = ((v / 2.5).floor() as usize).min(7);
            expected[idx] += 1;
        }

        assert_eq!(h.total(), 500);
        assert_eq!(h.buckets(), &expected);
    }
}
