//! Precomputed per-record scoring state.

use std::collections::BTreeMap;

use crate::fuzzy::{Pattern, Scorer};
use crate::normalize::search_text;
use crate::schema::Searchable;

/// Floor applied to each field score before combination, so one exact field
/// cannot zero out the product and mask every other field.
pub const SCORE_FLOOR: f64 = 1e-4;

struct FieldScorer {
    name: &'static str,
    /// Original text as stored on the record, used for result output.
    stored: String,
    scorer: Scorer,
    /// Normalized weight `w_i / W`.
    weight: f64,
    hidden: bool,
}

/// One record's scoring entry: a cached scorer per property.
pub struct Entry {
    fields: Vec<FieldScorer>,
    scaling: f64,
}

impl Entry {
    /// Build an entry from a record. `weights` are the schema's normalized
    /// weights, validated once per corpus build.
    pub fn new<T: Searchable>(record: &T, weights: &[f64]) -> Self {
        let fields = T::properties()
            .iter()
            .zip(weights)
            .map(|(property, &weight)| {
                let stored = (property.get)(record);
                let pattern = Pattern::new(&search_text(&stored));
                let scorer = if property.identifier {
                    Scorer::Identifier(pattern)
                } else {
                    Scorer::Text(pattern)
                };
                FieldScorer { name: property.name, stored, scorer, weight, hidden: property.hidden }
            })
            .collect();
        Self { fields, scaling: T::scaling().abs() }
    }

    /// Weighted geometric combination of the per-field scores, then the
    /// type's scaling exponent. The query must already be normalized.
    pub fn score(&self, query: &[char]) -> f64 {
        let combined: f64 = self
            .fields
            .iter()
            .map(|field| field.scorer.score(query).clamp(SCORE_FLOOR, 1.0).powf(field.weight))
            .product();
        combined.powf(self.scaling)
    }

    /// Stored text per non-hidden property.
    pub fn visible_fields(&self) -> BTreeMap<&'static str, String> {
        self.fields
            .iter()
            .filter(|field| !field.hidden)
            .map(|field| (field.name, field.stored.clone()))
            .collect()
    }

    /// Stored text for every property, hidden included.
    pub fn all_fields(&self) -> BTreeMap<&'static str, String> {
        self.fields.iter().map(|field| (field.name, field.stored.clone())).collect()
    }
}
