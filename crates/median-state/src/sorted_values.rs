use std::iter::{Copied, Rev};
use std::slice::Iter;

use crate::error::{check_finite, MedianError};
use crate::view::{Pivot, SequenceView};

/// A sorted array of finite values.
///
/// Lookups are binary searches; insertion and removal shift the tail, so this
/// is meant for small data sets and for checking other views against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedValues {
    values: Vec<f64>,
}

impl SortedValues {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn from_values<I>(values: I) -> Result<Self, MedianError>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut values = values
            .into_iter()
            .map(check_finite)
            .collect::<Result<Vec<_>, _>>()?;
        values.sort_by(f64::total_cmp);
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Inserts after any equal values and returns the position used.
    pub fn insert(&mut self, value: f64) -> Result<usize, MedianError> {
        let value = check_finite(value)?;
        let index = self.values.partition_point(|v| *v <= value);
        self.values.insert(index, value);
        Ok(index)
    }

    /// Removes one occurrence of `value`, returning where it was.
    pub fn remove(&mut self, value: f64) -> Option<usize> {
        let index = self.values.partition_point(|v| *v < value);
        if self.values.get(index) == Some(&value) {
            self.values.remove(index);
            Some(index)
        } else {
            None
        }
    }

    pub fn remove_nth(&mut self, index: usize) -> Option<f64> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }

    fn lower_bound(&self, pivot: Pivot) -> usize {
        match pivot {
            Pivot::Min => 0,
            Pivot::At(value) => self.values.partition_point(|v| *v < value),
            Pivot::Max => self.values.len(),
        }
    }

    fn upper_bound(&self, pivot: Pivot) -> usize {
        match pivot {
            Pivot::Min => 0,
            Pivot::At(value) => self.values.partition_point(|v| *v <= value),
            Pivot::Max => self.values.len(),
        }
    }
}

impl SequenceView for SortedValues {
    type Down<'a> = Copied<Rev<Iter<'a, f64>>>;
    type Up<'a> = Copied<Iter<'a, f64>>;

    fn downward(&self, pivot: Pivot) -> Self::Down<'_> {
        self.values[..self.lower_bound(pivot)].iter().rev().copied()
    }

    fn upward(&self, pivot: Pivot) -> Self::Up<'_> {
        self.values[self.upper_bound(pivot)..].iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SortedValues {
        SortedValues::from_values([3.0, 1.0, 2.0, 2.0, 5.0, 2.0]).unwrap()
    }

    #[test]
    fn test_from_values_sorts() {
        assert_eq!(sample().as_slice(), &[1.0, 2.0, 2.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_from_values_rejects_nan() {
        let result = SortedValues::from_values([1.0, f64::NAN]);
        assert!(matches!(result, Err(MedianError::InvalidArgument(v)) if v.is_nan()));
    }

    #[test]
    fn test_downward_skips_equal_values() {
        let values = sample();
        let below: Vec<f64> = values.downward(Pivot::At(2.0)).collect();
        assert_eq!(below, vec![1.0]);
        let below: Vec<f64> = values.downward(Pivot::At(4.0)).collect();
        assert_eq!(below, vec![3.0, 2.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_upward_skips_equal_values() {
        let values = sample();
        let above: Vec<f64> = values.upward(Pivot::At(2.0)).collect();
        assert_eq!(above, vec![3.0, 5.0]);
        let above: Vec<f64> = values.upward(Pivot::At(0.5)).collect();
        assert_eq!(above, vec![1.0, 2.0, 2.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_sentinel_pivots() {
        let values = sample();
        assert_eq!(values.downward(Pivot::Min).count(), 0);
        assert_eq!(values.upward(Pivot::Max).count(), 0);
        let all_down: Vec<f64> = values.downward(Pivot::Max).collect();
        assert_eq!(all_down, vec![5.0, 3.0, 2.0, 2.0, 2.0, 1.0]);
        let all_up: Vec<f64> = values.upward(Pivot::Min).collect();
        assert_eq!(all_up, vec![1.0, 2.0, 2.0, 2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut values = SortedValues::new();
        assert_eq!(values.insert(2.0), Ok(0));
        assert_eq!(values.insert(1.0), Ok(0));
        assert_eq!(values.insert(2.0), Ok(2));
        assert_eq!(values.insert(f64::INFINITY), Err(MedianError::InvalidArgument(f64::INFINITY)));
        assert_eq!(values.remove(2.0), Some(1));
        assert_eq!(values.remove(7.0), None);
        assert_eq!(values.remove_nth(5), None);
        assert_eq!(values.remove_nth(0), Some(1.0));
        assert_eq!(values.as_slice(), &[2.0]);
    }
}
