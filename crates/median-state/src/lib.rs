//! Running median over an externally stored sorted sequence.
//!
//! [`MedianState`] never stores the data itself. It keeps the one or two
//! middle values plus duplicate counters, and only walks the sequence
//! (through a [`SequenceView`]) when those counters run out.

pub mod error;
pub mod macros;
pub mod median_state;
pub mod sorted_multiset;
pub mod sorted_values;
pub mod view;

pub use error::MedianError;
pub use median_state::MedianState;
pub use sorted_multiset::SortedMultiset;
pub use sorted_values::SortedValues;
pub use view::{Pivot, SequenceView};

#[doc(hidden)]
pub use tracing;
