//! Cumulative-weight selection

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, SpinError};

/// One entry of a weight table as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Weighted table with precomputed cumulative bounds
///
/// Weights need not sum to 1; entry `i` is selected with probability
/// `weight_i / Σweights`. Entry order is part of the table's identity: the
/// same draw maps to the same entry only if the order is unchanged.
#[derive(Debug, Clone)]
pub struct WeightedTable<T> {
    values: Vec<T>,
    cumulative: Vec<f64>,
    total: f64,
}

impl<T: Copy> WeightedTable<T> {
    /// Build a table, rejecting empty input and non-positive or non-finite weights.
    pub fn new(entries: &[Weighted<T>], what: &str) -> EngineResult<Self> {
        if entries.is_empty() {
            return Err(SpinError::InvalidConfig(format!("{} weight table is empty", what)));
        }

        let mut values = Vec::with_capacity(entries.len());
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total = 0.0;
        for (i, entry) in entries.iter().enumerate() {
            if !entry.weight.is_finite() || entry.weight <= 0.0 {
                return Err(SpinError::InvalidConfig(format!(
                    "{} weight #{} is {}, weights must be positive",
                    what, i, entry.weight
                )));
            }
            total += entry.weight;
            values.push(entry.value);
            cumulative.push(total);
        }

        Ok(Self {
            values,
            cumulative,
            total,
        })
    }

    /// Map a uniform draw in [0, 1) onto an entry.
    pub fn pick(&self, unit: f64) -> T {
        let target = unit * self.total;
        let idx = self
            .cumulative
            .partition_point(|&bound| bound <= target)
            .min(self.values.len() - 1);
        self.values[idx]
    }

    /// Probability of the entry at `idx`
    pub fn probability(&self, idx: usize) -> f64 {
        let Some(&upper) = self.cumulative.get(idx) else {
            return 0.0;
        };
        let lower = if idx == 0 { 0.0 } else { self.cumulative[idx - 1] };
        (upper - lower) / self.total
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> WeightedTable<u32> {
        WeightedTable::new(
            &[Weighted::new(1, 1.0), Weighted::new(2, 3.0), Weighted::new(3, 6.0)],
            "test",
        )
        .unwrap()
    }

    #[test]
    fn test_pick_boundaries() {
        let t = table();
        assert_eq!(t.pick(0.0), 1);
        assert_eq!(t.pick(0.099), 1);
        assert_eq!(t.pick(0.1), 2);
        assert_eq!(t.pick(0.399), 2);
        assert_eq!(t.pick(0.4), 3);
        assert_eq!(t.pick(0.999_999), 3);
    }

    #[test]
    fn test_probability() {
        let t = table();
        assert_relative_eq!(t.probability(0), 0.1);
        assert_relative_eq!(t.probability(1), 0.3);
        assert_relative_eq!(t.probability(2), 0.6);
        assert_eq!(t.probability(3), 0.0);
        assert_eq!(t.probability(5), 0.0);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let empty: [Weighted<u32>; 0] = [];
        assert!(matches!(
            WeightedTable::new(&empty, "symbol"),
            Err(SpinError::InvalidConfig(_))
        ));
        assert!(WeightedTable::new(&[Weighted::new(1u32, 0.0)], "symbol").is_err());
        assert!(WeightedTable::new(&[Weighted::new(1u32, -2.0)], "symbol").is_err());
        assert!(WeightedTable::new(&[Weighted::new(1u32, f64::NAN)], "symbol").is_err());
    }
}
