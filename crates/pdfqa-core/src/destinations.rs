//! Destination index
//!
//! Built once per document from the named-destination table, before any
//! page is checked. A document without named destinations gives an empty
//! index, never a missing one.

use crate::document::{DocumentSource, ResolvedTarget};
use crate::error::Result;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DestinationIndex {
    entries: HashMap<String, ResolvedTarget>,
}

impl DestinationIndex {
    pub fn build(source: &dyn DocumentSource) -> Result<Self> {
        Ok(source.named_destinations()?.into_iter().collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn resolve(&self, name: &str) -> Option<&ResolvedTarget> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ResolvedTarget)> for DestinationIndex {
    fn from_iter<I: IntoIterator<Item = (String, ResolvedTarget)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
