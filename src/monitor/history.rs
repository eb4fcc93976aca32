//! Two-slot sliding window over the most recent objective values.

use std::fmt::{self, Display, Formatter};

/// The last (at most) two objective values reported to a monitor.
///
/// `previous` is always the older observation and `current` the newer one.
/// Pushing a third value evicts `previous`. A `previous` without a `current`
/// never occurs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct History {
    previous: Option<f64>,
    current: Option<f64>,
}

impl History {
    /// Number of slots a history can hold.
    pub const CAPACITY: usize = 2;

    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, evicting the oldest one when both slots are taken.
    pub fn push(&mut self, value: f64) {
        self.previous = self.current;
        self.current = Some(value);
    }

    pub fn clear(&mut self) {
        self.previous = None;
        self.current = None;
    }

    pub fn len(&self) -> usize {
        self.previous.is_some() as usize + self.current.is_some() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.previous.is_some()
    }

    /// Newest value, if any.
    pub fn current(&self) -> Option<f64> {
        self.current
    }

    /// Value reported just before [`current`](Self::current), if any.
    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    /// `(previous, current)` once two values have been observed.
    pub fn pair(&self) -> Option<(f64, f64)> {
        Some((self.previous?, self.current?))
    }

    /// Values in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.previous.into_iter().chain(self.current)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

impl Display for History {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value:?}")?;
        }
        write!(f, "]")
    }
}
