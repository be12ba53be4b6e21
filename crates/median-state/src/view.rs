//! The only window [`MedianState`](crate::MedianState) has into the data.

/// Starting point of a directional view.
///
/// `Min` and `Max` stand in for the negative and positive infinities, so a
/// view can be asked for "everything" without a finite value to start from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pivot {
    Min,
    At(f64),
    Max,
}

impl From<f64> for Pivot {
    fn from(value: f64) -> Self {
        if value == f64::NEG_INFINITY {
            Pivot::Min
        } else if value == f64::INFINITY {
            Pivot::Max
        } else {
            Pivot::At(value)
        }
    }
}

/// Ordered iteration over the live sorted sequence, starting near a pivot.
///
/// Implementations must satisfy the following for every pivot:
///
/// - `downward` yields the values strictly lower than the pivot, in
///   descending order. `downward(Pivot::Min)` is empty and
///   `downward(Pivot::Max)` is the whole sequence.
/// - `upward` yields the values strictly greater than the pivot, in
///   ascending order. `upward(Pivot::Max)` is empty and `upward(Pivot::Min)`
///   is the whole sequence.
/// - Only finite values are produced.
/// - A view reflects the sequence at the moment it is requested.
///
/// Views are dropped as soon as the caller is done with them, so an
/// implementation backed by a cursor should release it in `Drop`.
pub trait SequenceView {
    type Down<'a>: Iterator<Item = f64>
    where
        Self: 'a;
    type Up<'a>: Iterator<Item = f64>
    where
        Self: 'a;

    fn downward(&self, pivot: Pivot) -> Self::Down<'_>;

    fn upward(&self, pivot: Pivot) -> Self::Up<'_>;
}

#[cfg(test)]
mod tests {
    use super::Pivot;

    #[test]
    fn test_pivot_from_infinities() {
        assert_eq!(Pivot::from(f64::NEG_INFINITY), Pivot::Min);
        assert_eq!(Pivot::from(f64::INFINITY), Pivot::Max);
        assert_eq!(Pivot::from(2.5), Pivot::At(2.5));
    }
}
