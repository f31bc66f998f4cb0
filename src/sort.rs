use std::fmt;
use tracing::trace;

use crate::value::{self, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The active sort directive: which field, which way.
///
/// A view without a directive carries no `SortKey` at all, so "direction but
/// no field" cannot be represented.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey<K> {
    pub field: K,
    pub direction: SortDirection,
}

impl<K: fmt::Display> fmt::Display for SortKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{} ASC", self.field),
            SortDirection::Descending => write!(f, "{} DESC", self.field),
        }
    }
}

/// Field access is explicit: the caller names how a field key reads a value
/// out of a record. Unknown keys are expected to yield `Value::Absent`.
pub type Accessor<R, K> = fn(&R, &K) -> Value;

/// An ordered view over a set of records.
///
/// Records are never moved; the view keeps an index order that is recomputed
/// from scratch whenever the records or the sort directive change. Without a
/// directive the order is the identity mapping of the input.
pub struct SortView<R, K> {
    records: Vec<R>,
    accessor: Accessor<R, K>,
    key: Option<SortKey<K>>,
    order: Vec<usize>,
}

impl<R, K> SortView<R, K>
where
    K: PartialEq + fmt::Debug,
{
    pub fn new(records: Vec<R>, accessor: Accessor<R, K>) -> Self {
        let order = (0..records.len()).collect();
        Self {
            records,
            accessor,
            key: None,
            order,
        }
    }

    /// Like [`SortView::new`], but seeded with a directive that is applied
    /// immediately instead of starting unsorted.
    pub fn with_initial(records: Vec<R>, accessor: Accessor<R, K>, key: SortKey<K>) -> Self {
        let mut view = Self::new(records, accessor);
        view.key = Some(key);
        view.resort();
        view
    }

    /// Advance the directive for `field` one step along the cycle
    /// unsorted -> ascending -> descending -> unsorted. Requesting a field
    /// other than the active one restarts the cycle at ascending.
    pub fn request_sort(&mut self, field: K) {
        use SortDirection::*;
        self.key = match self.key.take() {
            Some(SortKey {
                field: f,
                direction: Ascending,
            }) if f == field => Some(SortKey {
                field: f,
                direction: Descending,
            }),
            Some(SortKey {
                field: f,
                direction: Descending,
            }) if f == field => None,
            _ => Some(SortKey {
                field,
                direction: Ascending,
            }),
        };
        trace!("Sort directive advanced to {:?}", self.key);
        self.resort();
    }

    /// The direction `field` is currently sorted by, if it is the active one.
    pub fn direction(&self, field: &K) -> Option<SortDirection> {
        self.key
            .as_ref()
            .filter(|key| &key.field == field)
            .map(|key| key.direction)
    }

    pub fn sort_key(&self) -> Option<&SortKey<K>> {
        self.key.as_ref()
    }

    /// Records in derived order.
    pub fn sorted(&self) -> impl Iterator<Item = &R> + '_ {
        self.order.iter().map(|&idx| &self.records[idx])
    }

    /// The derived order as a mapping from view position to record index.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// The record at a view position.
    pub fn record(&self, view_idx: usize) -> Option<&R> {
        self.order.get(view_idx).map(|&idx| &self.records[idx])
    }

    /// Records in input order.
    pub fn records(&self) -> &[R] {
        &self.records
    }

    /// Swap out the underlying records; the current directive is re-applied.
    pub fn replace_records(&mut self, records: Vec<R>) {
        self.records = records;
        self.resort();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn resort(&mut self) {
        let mut order: Vec<usize> = (0..self.records.len()).collect();
        if let Some(key) = &self.key {
            // slice::sort_by is stable, so rows comparing equal keep their
            // input order, and the descending reverse flips the comparison
            // sign instead of the slice.
            order.sort_by(|&l, &r| {
                let ord = value::compare(
                    &(self.accessor)(&self.records[l], &key.field),
                    &(self.accessor)(&self.records[r], &key.field),
                );
                match key.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }
        self.order = order;
    }
}
