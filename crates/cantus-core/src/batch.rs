//! Partial-success results for operations over several independent inputs.

use crate::error::{CantusError, Result};

/// The result for one input of a batch.
#[derive(Debug)]
pub struct BatchItem<T> {
    /// The input this result belongs to (e.g., the locator string).
    pub key: String,
    /// Outcome for this input alone.
    pub result: Result<T>,
}

/// Results of a batch, one per input, in input order.
///
/// A failing item never affects its siblings.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    items: Vec<BatchItem<T>>,
}

impl<T> BatchOutcome<T> {
    /// Creates an empty outcome.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Appends the result for `key`.
    pub fn push(&mut self, key: impl Into<String>, result: Result<T>) {
        self.items.push(BatchItem {
            key: key.into(),
            result,
        });
    }

    /// Returns all items in input order.
    #[must_use]
    pub fn items(&self) -> &[BatchItem<T>] {
        &self.items
    }

    /// Consumes the outcome, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<BatchItem<T>> {
        self.items
    }

    /// Iterates over successful items.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().ok().map(|v| (item.key.as_str(), v)))
    }

    /// Iterates over failed items.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &CantusError)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err().map(|e| (item.key.as_str(), e)))
    }

    /// Number of successful items.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Returns true if every item succeeded.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.items.iter().all(|item| item.result.is_ok())
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch had no inputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, Result<T>)> for BatchOutcome<T> {
    fn from_iter<I: IntoIterator<Item = (String, Result<T>)>>(iter: I) -> Self {
        let mut outcome = Self::new();
        for (key, result) in iter {
            outcome.push(key, result);
        }
        outcome
    }
}
