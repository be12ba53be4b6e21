use std::cmp::Ordering;
use std::collections::btree_map::{BTreeMap, Entry, Range};
use std::iter::{FlatMap, Repeat, Rev, Take};
use std::num::NonZeroUsize;
use std::ops::Bound;

use crate::error::{check_finite, MedianError};
use crate::view::{Pivot, SequenceView};

/// Totally ordered map key for a finite value. `-0.0` is stored as `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct FiniteKey(f64);

impl FiniteKey {
    fn new(value: f64) -> Self {
        Self(value + 0.0)
    }

    fn from_pivot(pivot: Pivot) -> Self {
        match pivot {
            Pivot::Min => Self(f64::NEG_INFINITY),
            Pivot::At(value) => Self::new(value),
            Pivot::Max => Self(f64::INFINITY),
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for FiniteKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FiniteKey {}

impl PartialOrd for FiniteKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FiniteKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

type Expand<'a> = fn((&'a FiniteKey, &'a NonZeroUsize)) -> Take<Repeat<f64>>;

fn expand((key, count): (&FiniteKey, &NonZeroUsize)) -> Take<Repeat<f64>> {
    std::iter::repeat(key.0).take(count.get())
}

/// Ordered multiset backed by a balanced search tree.
///
/// Each distinct value is stored once together with its multiplicity, so
/// long duplicate runs cost one node. Views walk a `BTreeMap` range from the
/// pivot and expand every entry back into its repeated values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedMultiset {
    counts: BTreeMap<FiniteKey, NonZeroUsize>,
    len: usize,
}

impl SortedMultiset {
    pub fn new() -> Self {
        Self {
            counts: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occurrences of `value`.
    pub fn count_of(&self, value: f64) -> usize {
        if !value.is_finite() {
            return 0;
        }
        self.counts
            .get(&FiniteKey::new(value))
            .map_or(0, |count| count.get())
    }

    pub fn insert(&mut self, value: f64) -> Result<(), MedianError> {
        let key = FiniteKey::new(check_finite(value)?);
        match self.counts.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(NonZeroUsize::MIN);
            }
            Entry::Occupied(mut entry) => {
                let count = entry.get_mut();
                *count = count.saturating_add(1);
            }
        }
        self.len += 1;
        Ok(())
    }

    /// Removes one occurrence of `value`. Returns `false` if there was none.
    pub fn remove(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        let Entry::Occupied(mut entry) = self.counts.entry(FiniteKey::new(value)) else {
            return false;
        };
        match NonZeroUsize::new(entry.get().get() - 1) {
            Some(count) => {
                entry.insert(count);
            }
            None => {
                entry.remove();
            }
        }
        self.len -= 1;
        true
    }

    /// Removes the value at zero-based rank `index`. This walks the tree
    /// from the lowest value, one entry per distinct value.
    pub fn remove_nth(&mut self, index: usize) -> Option<f64> {
        let mut skipped = 0;
        let value = self.counts.iter().find_map(|(key, count)| {
            skipped += count.get();
            (index < skipped).then_some(key.0)
        })?;
        self.remove(value);
        Some(value)
    }
}

impl SequenceView for SortedMultiset {
    type Down<'a> = FlatMap<Rev<Range<'a, FiniteKey, NonZeroUsize>>, Take<Repeat<f64>>, Expand<'a>>;
    type Up<'a> = FlatMap<Range<'a, FiniteKey, NonZeroUsize>, Take<Repeat<f64>>, Expand<'a>>;

    fn downward(&self, pivot: Pivot) -> Self::Down<'_> {
        let end = FiniteKey::from_pivot(pivot);
        self.counts
            .range((Bound::Unbounded, Bound::Excluded(end)))
            .rev()
            .flat_map(expand as Expand<'_>)
    }

    fn upward(&self, pivot: Pivot) -> Self::Up<'_> {
        let start = FiniteKey::from_pivot(pivot);
        self.counts
            .range((Bound::Excluded(start), Bound::Unbounded))
            .flat_map(expand as Expand<'_>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SortedValues;

    fn multiset(values: &[f64]) -> SortedMultiset {
        let mut set = SortedMultiset::new();
        for value in values {
            set.insert(*value).unwrap();
        }
        set
    }

    #[test]
    fn test_duplicates_share_one_entry() {
        let set = multiset(&[2.0, 2.0, 2.0, 1.0]);
        assert_eq!(set.len(), 4);
        assert_eq!(set.count_of(2.0), 3);
        assert_eq!(set.counts.len(), 2);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let set = multiset(&[-0.0, 0.0, 1.0]);
        assert_eq!(set.count_of(0.0), 2);
        assert_eq!(set.downward(Pivot::At(0.0)).count(), 0);
        let above: Vec<f64> = set.upward(Pivot::At(-0.0)).collect();
        assert_eq!(above, vec![1.0]);
    }

    #[test]
    fn test_remove() {
        let mut set = multiset(&[1.0, 2.0, 2.0]);
        assert!(set.remove(2.0));
        assert_eq!(set.count_of(2.0), 1);
        assert!(set.remove(2.0));
        assert_eq!(set.count_of(2.0), 0);
        assert!(!set.remove(2.0));
        assert!(!set.remove(f64::NAN));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_nth() {
        let mut set = multiset(&[5.0, 1.0, 3.0, 3.0]);
        assert_eq!(set.remove_nth(2), Some(3.0));
        assert_eq!(set.remove_nth(2), Some(5.0));
        assert_eq!(set.remove_nth(2), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut set = SortedMultiset::new();
        assert_eq!(
            set.insert(f64::NEG_INFINITY),
            Err(MedianError::InvalidArgument(f64::NEG_INFINITY))
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_views_agree_with_sorted_values() {
        let data = [4.0, 1.0, 2.0, 2.0, 7.0, 4.0, 4.0, -3.0, 2.0];
        let set = multiset(&data);
        let values = SortedValues::from_values(data).unwrap();
        let pivots = [
            Pivot::Min,
            Pivot::Max,
            Pivot::At(-5.0),
            Pivot::At(-3.0),
            Pivot::At(2.0),
            Pivot::At(3.0),
            Pivot::At(4.0),
            Pivot::At(7.0),
            Pivot::At(9.0),
        ];
        for pivot in pivots {
            assert_eq!(
                set.downward(pivot).collect::<Vec<_>>(),
                values.downward(pivot).collect::<Vec<_>>(),
                "downward from {:?}",
                pivot
            );
            assert_eq!(
                set.upward(pivot).collect::<Vec<_>>(),
                values.upward(pivot).collect::<Vec<_>>(),
                "upward from {:?}",
                pivot
            );
        }
    }
}
