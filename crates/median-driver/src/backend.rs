use median_state::{MedianError, SequenceView, SortedMultiset, SortedValues};

/// A mutable store the driver can both change and hand to `MedianState` as
/// its view.
pub trait Backend: SequenceView + Send + 'static {
    fn insert(&mut self, value: f64) -> Result<(), MedianError>;

    /// Removes the value at zero-based rank `index`.
    fn remove_nth(&mut self, index: usize) -> Option<f64>;

    fn len(&self) -> usize;
}

impl Backend for SortedValues {
    fn insert(&mut self, value: f64) -> Result<(), MedianError> {
        SortedValues::insert(self, value).map(|_| ())
    }

    fn remove_nth(&mut self, index: usize) -> Option<f64> {
        SortedValues::remove_nth(self, index)
    }

    fn len(&self) -> usize {
        SortedValues::len(self)
    }
}

impl Backend for SortedMultiset {
    fn insert(&mut self, value: f64) -> Result<(), MedianError> {
        SortedMultiset::insert(self, value)
    }

    fn remove_nth(&mut self, index: usize) -> Option<f64> {
        SortedMultiset::remove_nth(self, index)
    }

    fn len(&self) -> usize {
        SortedMultiset::len(self)
    }
}
