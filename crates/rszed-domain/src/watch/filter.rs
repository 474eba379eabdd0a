//! Namespace filtering for change batches.

use std::collections::HashSet;

use crate::model::TupleUpdate;

/// Narrows tuple updates to those whose resource namespace was subscribed to.
#[derive(Debug, Clone, Default)]
pub struct NamespaceFilter {
    namespaces: HashSet<String>,
}

impl NamespaceFilter {
    /// Builds a filter from the requested namespaces. Duplicates collapse.
    pub fn new<I, N>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Returns true when the update's tuple lives in a subscribed namespace.
    pub fn matches(&self, update: &TupleUpdate) -> bool {
        self.namespaces.contains(update.tuple.namespace())
    }

    /// Keeps matching updates in their original relative order.
    ///
    /// Updates are moved, never modified. An empty result means there is
    /// nothing to forward for this batch.
    pub fn filter_updates(&self, candidates: Vec<TupleUpdate>) -> Vec<TupleUpdate> {
        candidates
            .into_iter()
            .filter(|update| self.matches(update))
            .collect()
    }
}
