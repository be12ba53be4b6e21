use std::fmt::{Display, Formatter};

use crate::error::{check_finite, MedianError};
use crate::view::{Pivot, SequenceView};

/// Keeps track of the median of an externally stored multiset of finite
/// values.
///
/// The state needs two things from its caller:
///
/// - a notification for every value added to or removed from the data set,
///   delivered after the data set itself has changed;
/// - a [`SequenceView`] that can walk the data set downward and upward from
///   an arbitrary value.
///
/// Both must describe one real data set. Removing a value that was never
/// added, skipping or reordering notifications, or a view that returns values
/// that cannot exist leaves the state silently wrong. None of this is checked
/// on the notification path; [`MedianState::verify`] exists to catch it.
///
/// The state owns its view. Callers that keep the data in the view itself
/// mutate it through [`MedianState::view_mut`] and then notify.
#[derive(Debug, Clone)]
pub struct MedianState<V> {
    view: V,
    count: u64,
    lo: f64,      // value at index_lo(), 0.0 when empty
    hi: f64,      // value at index_hi(), 0.0 when empty
    dup_lo: u64,  // values equal to lo with index < index_lo()
    dup_hi: u64,  // values equal to hi with index > index_hi()
}

impl<V> MedianState<V> {
    pub fn new(view: V) -> Self {
        Self {
            view,
            count: 0,
            lo: 0.0,
            hi: 0.0,
            dup_lo: 0,
            dup_hi: 0,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Mutable access to the backing view. Every change made through it must
    /// be followed by the matching [`after_add`](Self::after_add) or
    /// [`after_remove`](Self::after_remove).
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    /// Current median: the middle value for an odd count, the mean of the two
    /// middle values otherwise.
    pub fn median(&self) -> Result<f64, MedianError> {
        if self.count == 0 {
            return Err(MedianError::NoData);
        }
        Ok(if self.is_odd() {
            self.lo
        } else {
            (self.lo + self.hi) / 2.0
        })
    }

    pub fn size(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Last value of the lower half. Meaningless when empty.
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// First value of the upper half. Meaningless when empty.
    pub fn hi(&self) -> f64 {
        self.hi
    }

    pub fn dup_lo(&self) -> u64 {
        self.dup_lo
    }

    pub fn dup_hi(&self) -> u64 {
        self.dup_hi
    }

    /// Index of `lo`, i.e. `ceil(count / 2) - 1`.
    pub fn index_lo(&self) -> Result<u64, MedianError> {
        if self.count == 0 {
            return Err(MedianError::NoData);
        }
        Ok((self.count + 1) / 2 - 1)
    }

    /// Index of `hi`, i.e. `floor(count / 2)`.
    pub fn index_hi(&self) -> Result<u64, MedianError> {
        if self.count == 0 {
            return Err(MedianError::NoData);
        }
        Ok(self.count / 2)
    }

    fn is_odd(&self) -> bool {
        self.count & 1 != 0
    }
}

impl<V: SequenceView> MedianState<V> {
    /// Updates the state after `value` has been added to the data set.
    ///
    /// The view must already contain `value`.
    pub fn after_add(&mut self, value: f64) -> Result<(), MedianError> {
        let value = check_finite(value)?;
        if self.count == 0 {
            self.lo = value;
            self.hi = value;
        } else if self.is_odd() {
            // lo == hi: the window widens to two slots on the side of value
            let mid = self.lo;
            if value < mid {
                if self.dup_lo > 0 {
                    self.dup_lo -= 1;
                } else {
                    self.recalculate_lo(mid)?;
                }
            } else if value > mid {
                if self.dup_hi > 0 {
                    self.dup_hi -= 1;
                } else {
                    self.recalculate_hi(mid)?;
                }
            }
        } else if self.lo == self.hi {
            let mid = self.lo;
            if value <= mid {
                self.dup_hi += 1;
            }
            if value >= mid {
                self.dup_lo += 1;
            }
        } else if value <= self.lo {
            self.hi = self.lo;
            self.dup_hi = 0;
            if value == self.lo {
                self.dup_lo += 1;
            }
        } else if value >= self.hi {
            self.lo = self.hi;
            self.dup_lo = 0;
            if value == self.hi {
                self.dup_hi += 1;
            }
        } else {
            self.lo = value;
            self.hi = value;
            self.dup_lo = 0;
            self.dup_hi = 0;
        }
        self.count += 1;
        Ok(())
    }

    /// Updates the state after `value` has been removed from the data set.
    ///
    /// The view must no longer contain the removed occurrence. Removing a
    /// value that was not present is undefined.
    pub fn after_remove(&mut self, value: f64) -> Result<(), MedianError> {
        if self.count == 0 {
            return Err(MedianError::NoData);
        }
        let value = check_finite(value)?;
        if self.count == 1 {
            self.lo = 0.0;
            self.hi = 0.0;
            self.dup_lo = 0;
            self.dup_hi = 0;
        } else if self.is_odd() {
            // both branches run when value == mid
            let mid = self.lo;
            if value <= mid {
                if self.dup_hi > 0 {
                    self.dup_hi -= 1;
                } else {
                    self.recalculate_hi(mid)?;
                }
            }
            if value >= mid {
                if self.dup_lo > 0 {
                    self.dup_lo -= 1;
                } else {
                    self.recalculate_lo(mid)?;
                }
            }
        } else if self.lo == self.hi {
            let mid = self.lo;
            if value < mid {
                self.dup_lo += 1;
            } else if value > mid {
                self.dup_hi += 1;
            }
        } else if value <= self.lo {
            self.lo = self.hi;
            self.dup_lo = 0;
        } else {
            self.hi = self.lo;
            self.dup_hi = 0;
        }
        self.count -= 1;
        Ok(())
    }

    /// Confirms that the state agrees with what is actually in the data set.
    ///
    /// This walks the whole data set once, so it is O(n). It checks the
    /// count, the median, both boundary values and both duplicate counters.
    pub fn verify(&self) -> Result<(), MedianError> {
        let window = self.index_lo().ok().zip(self.index_hi().ok());
        let mut scanned: u64 = 0;
        let mut previous = f64::NEG_INFINITY;
        let mut actual_lo = 0.0;
        let mut actual_hi = 0.0;
        let mut lo_copies: u64 = 0;
        let mut hi_copies: u64 = 0;

        for value in self.view.upward(Pivot::Min) {
            if scanned == self.count {
                return Err(inconsistent(format!(
                    "there are more than {} values",
                    self.count
                )));
            }
            if !value.is_finite() {
                return Err(inconsistent(format!(
                    "non-finite value {value} at index {scanned}"
                )));
            }
            if value < previous {
                return Err(inconsistent(format!(
                    "value {value} at index {scanned} is below its predecessor {previous}"
                )));
            }
            if let Some((index_lo, index_hi)) = window {
                if scanned <= index_lo && value == self.lo {
                    lo_copies += 1;
                }
                if scanned >= index_hi && value == self.hi {
                    hi_copies += 1;
                }
                if scanned == index_lo {
                    actual_lo = value;
                }
                if scanned == index_hi {
                    actual_hi = value;
                }
            }
            previous = value;
            scanned += 1;
        }
        if scanned != self.count {
            return Err(inconsistent(format!(
                "there are only {scanned} < {} values",
                self.count
            )));
        }

        let Some((index_lo, index_hi)) = window else {
            if self.lo != 0.0 || self.hi != 0.0 || self.dup_lo != 0 || self.dup_hi != 0 {
                return Err(inconsistent(format!("empty state is not reset: {self}")));
            }
            return Ok(());
        };

        let median = self.median()?;
        let actual_median = if self.is_odd() {
            actual_lo
        } else {
            (actual_lo + actual_hi) / 2.0
        };
        if actual_median != median {
            return Err(inconsistent(format!(
                "incorrect median {median} != {actual_median}"
            )));
        }
        if actual_lo != self.lo {
            return Err(inconsistent(format!(
                "lo is {} but index {index_lo} holds {actual_lo}",
                self.lo
            )));
        }
        if actual_hi != self.hi {
            return Err(inconsistent(format!(
                "hi is {} but index {index_hi} holds {actual_hi}",
                self.hi
            )));
        }
        if lo_copies != self.dup_lo + 1 {
            return Err(inconsistent(format!(
                "dup_lo is {} but {lo_copies} copies of {} end at index {index_lo}",
                self.dup_lo, self.lo
            )));
        }
        if hi_copies != self.dup_hi + 1 {
            return Err(inconsistent(format!(
                "dup_hi is {} but {hi_copies} copies of {} start at index {index_hi}",
                self.dup_hi, self.hi
            )));
        }
        Ok(())
    }

    /// Replaces `lo` with the nearest value strictly below `pivot` and counts
    /// its copies further down.
    fn recalculate_lo(&mut self, pivot: f64) -> Result<(), MedianError> {
        let mut below = self.view.downward(Pivot::At(pivot));
        let lo = below
            .next()
            .ok_or_else(|| inconsistent(format!("no value below {pivot}")))?;
        let dup_lo = below.take_while(|value| *value == lo).count() as u64;
        self.lo = lo;
        self.dup_lo = dup_lo;
        tracing::trace!(pivot, lo, dup_lo, "Recalculated lo");
        Ok(())
    }

    /// Replaces `hi` with the nearest value strictly above `pivot` and counts
    /// its copies further up.
    fn recalculate_hi(&mut self, pivot: f64) -> Result<(), MedianError> {
        let mut above = self.view.upward(Pivot::At(pivot));
        let hi = above
            .next()
            .ok_or_else(|| inconsistent(format!("no value above {pivot}")))?;
        let dup_hi = above.take_while(|value| *value == hi).count() as u64;
        self.hi = hi;
        self.dup_hi = dup_hi;
        tracing::trace!(pivot, hi, dup_hi, "Recalculated hi");
        Ok(())
    }
}

fn inconsistent(message: String) -> MedianError {
    MedianError::Inconsistent(message)
}

impl<V> Display for MedianState<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.index_lo().ok().zip(self.index_hi().ok()) {
            None => write!(f, "MedianState[empty]"),
            Some((index_lo, index_hi)) => write!(
                f,
                "MedianState[count={},lo={}@{}+{},hi={}@{}+{}]",
                self.count, self.lo, index_lo, self.dup_lo, self.hi, index_hi, self.dup_hi
            ),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::SortedValues;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(f64),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..12i32).prop_map(|v| Op::Add(v as f64)),
            (-1e6_f64..1e6).prop_map(Op::Add),
            any::<usize>().prop_map(Op::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn tracks_median_of_every_prefix(ops in proptest::collection::vec(op(), 1..200)) {
            let mut state = MedianState::new(SortedValues::new());
            for op in ops {
                match op {
                    Op::Add(value) => {
                        state.view_mut().insert(value).unwrap();
                        state.after_add(value).unwrap();
                    }
                    Op::Remove(_) if state.is_empty() => {
                        prop_assert_eq!(state.after_remove(0.0), Err(MedianError::NoData));
                    }
                    Op::Remove(pick) => {
                        let index = pick % state.view().len();
                        let value = state.view_mut().remove_nth(index).unwrap();
                        state.after_remove(value).unwrap();
                    }
                }

                let values = state.view().as_slice();
                prop_assert_eq!(state.size(), values.len() as u64);
                if let (Ok(index_lo), Ok(index_hi)) = (state.index_lo(), state.index_hi()) {
                    let (index_lo, index_hi) = (index_lo as usize, index_hi as usize);
                    prop_assert_eq!(state.lo(), values[index_lo]);
                    prop_assert_eq!(state.hi(), values[index_hi]);
                    let lo_copies = values[..=index_lo].iter().filter(|v| **v == state.lo()).count();
                    let hi_copies = values[index_hi..].iter().filter(|v| **v == state.hi()).count();
                    prop_assert_eq!(state.dup_lo() + 1, lo_copies as u64);
                    prop_assert_eq!(state.dup_hi() + 1, hi_copies as u64);
                    let n = values.len();
                    prop_assert_eq!(state.median(), Ok((values[(n - 1) / 2] + values[n / 2]) / 2.0));
                } else {
                    prop_assert_eq!((state.lo(), state.hi(), state.dup_lo(), state.dup_hi()), (0.0, 0.0, 0, 0));
                }
                prop_assert_eq!(state.verify(), Ok(()));
            }
        }

        #[test]
        fn add_then_remove_is_identity(
            initial in proptest::collection::vec(0..8i32, 0..60),
            value in 0..8i32,
        ) {
            let mut state = MedianState::new(SortedValues::new());
            for v in initial {
                state.view_mut().insert(v as f64).unwrap();
                state.after_add(v as f64).unwrap();
            }
            let before = (state.size(), state.lo(), state.hi(), state.dup_lo(), state.dup_hi());
            let value = value as f64;
            state.view_mut().insert(value).unwrap();
            state.after_add(value).unwrap();
            state.view_mut().remove(value).unwrap();
            state.after_remove(value).unwrap();
            prop_assert_eq!((state.size(), state.lo(), state.hi(), state.dup_lo(), state.dup_hi()), before);
        }
    }
}
