//! Session collection - the caller-owned, insertion-ordered set of processed
//! properties. The pipeline itself is state-free between calls; everything a
//! browsing session accumulates lives here, owned and passed explicitly.

use crate::analysis::error::CollectionError;
use crate::analysis::rank;
use crate::analysis::score::{score, ScoringConfig};
use crate::analysis::types::ScoredProperty;
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone)]
pub struct PropertyCollection {
    items: Vec<ScoredProperty>,
    by_id: HashMap<String, usize>,
}

impl PropertyCollection {
    pub fn new() -> Self {
        PropertyCollection::default()
    }

    /// Add a processed property. Re-adding an existing `property_id` is a
    /// caller error and leaves the collection untouched.
    pub fn add(&mut self, property: ScoredProperty) -> Result<(), CollectionError> {
        let id = property.record.property_id.clone();
        if self.by_id.contains_key(&id) {
            warn!("property {} already in collection", id);
            return Err(CollectionError::DuplicateId { property_id: id });
        }

        self.by_id.insert(id, self.items.len());
        self.items.push(property);
        Ok(())
    }

    /// Remove a property by id - the only way a record ever leaves the
    /// collection.
    pub fn remove(&mut self, property_id: &str) -> Result<ScoredProperty, CollectionError> {
        let idx = self
            .by_id
            .remove(property_id)
            .ok_or_else(|| CollectionError::NotFound {
                property_id: property_id.to_string(),
            })?;

        let removed = self.items.remove(idx);
        // Positions after the removed slot shift down by one
        for position in self.by_id.values_mut() {
            if *position > idx {
                *position -= 1;
            }
        }
        Ok(removed)
    }

    pub fn get(&self, property_id: &str) -> Option<&ScoredProperty> {
        self.by_id.get(property_id).map(|idx| &self.items[*idx])
    }

    /// Recompute every breakdown in place, e.g. after a weight change.
    /// Score fields are always overwritten on recompute.
    pub fn rescore(&mut self, config: &ScoringConfig) {
        debug!("rescoring {} properties", self.items.len());
        for item in &mut self.items {
            item.scores = score(&item.record, config);
        }
    }

    /// Top `n` by total score, ties in insertion order
    pub fn top_n(&self, n: usize) -> Vec<ScoredProperty> {
        rank::top_n(self.items.to_vec(), n)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredProperty> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
