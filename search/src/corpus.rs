//! Typed corpus index: ranked fuzzy queries over one record type.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Instant;

use rayon::prelude::*;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::entry::Entry;
use crate::normalize::search_text;
use crate::schema::{normalized_weights, Searchable, SchemaError};

/// Default per-entry cutoff: entries scoring at or above this are dropped.
pub const MAX_RESULT_SCORE: f64 = 0.99;

/// Per-query options, copied from the process configuration.
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub cutoff: f64,
    pub send_score: bool,
    pub send_hidden_fields: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { cutoff: MAX_RESULT_SCORE, send_score: false, send_hidden_fields: false }
    }
}

/// One ranked match. Serializes flat: every field as a top-level key, plus
/// `"content"` and, when enabled, `"score"`.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub content: String,
    pub score: f64,
    pub fields: BTreeMap<&'static str, String>,
    send_score: bool,
}

impl SearchHit {
    pub fn new(
        content: impl Into<String>,
        score: f64,
        fields: BTreeMap<&'static str, String>,
        send_score: bool,
    ) -> Self {
        Self { content: content.into(), score, fields, send_score }
    }

    /// Ascending by score; ties broken by content label, then by the field
    /// map, so equal-score output order is deterministic.
    pub fn ranking(a: &Self, b: &Self) -> Ordering {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.content.cmp(&b.content))
            .then_with(|| a.fields.cmp(&b.fields))
    }
}

impl Serialize for SearchHit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = if self.send_score { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(self.fields.len() + extra))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("content", &self.content)?;
        if self.send_score {
            map.serialize_entry("score", &self.score)?;
        }
        map.end()
    }
}

/// Immutable index over one record type. Replaced wholesale on rebuild.
pub struct Corpus<T: Searchable> {
    entries: Vec<Entry>,
    label: String,
    _record: PhantomData<fn(&T)>,
}

impl<T: Searchable> Corpus<T> {
    /// Build entries for every record in parallel.
    pub fn build(records: &[T]) -> Result<Self, SchemaError> {
        let weights = normalized_weights::<T>()?;
        let label = T::content_label();
        tracing::info!(records = records.len(), "Building search cache for {label}");
        let start = Instant::now();
        let entries: Vec<Entry> =
            records.par_iter().map(|record| Entry::new(record, &weights)).collect();
        tracing::info!(
            elapsed_s = start.elapsed().as_secs_f64(),
            "finished search cache for {label}"
        );
        Ok(Self { entries, label, _record: PhantomData })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every entry against the query, drop those at or above the
    /// cutoff, and return the survivors sorted ascending.
    pub fn search(&self, raw_query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        let query: Vec<char> = search_text(raw_query).chars().collect();
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let score = entry.score(&query);
                if score >= options.cutoff {
                    return None;
                }
                let fields = if options.send_hidden_fields {
                    entry.all_fields()
                } else {
                    entry.visible_fields()
                };
                Some(SearchHit {
                    content: self.label.clone(),
                    score,
                    fields,
                    send_score: options.send_score,
                })
            })
            .collect();
        hits.sort_by(SearchHit::ranking);
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Property;

    pub(crate) struct City {
        code: String,
        name: String,
    }

    impl City {
        fn new(code: &str, name: &str) -> Self {
            Self { code: code.into(), name: name.into() }
        }
    }

    impl Searchable for City {
        fn properties() -> &'static [Property<Self>] {
            const PROPERTIES: &[Property<City>] = &[
                Property::identifier("code", |c: &City| c.code.clone(), 0.5),
                Property::text("name", |c: &City| c.name.clone(), 0.5),
            ];
            PROPERTIES
        }
    }

    fn cities() -> Vec<City> {
        vec![
            City::new("CPQ", "Campinas"),
            City::new("GRU", "Guarulhos"),
            City::new("VCP", "Viracopos"),
            City::new("SSZ", "Santos"),
        ]
    }

    #[test]
    fn exact_code_ranks_first() {
        let corpus = Corpus::build(&cities()).unwrap();
        let hits = corpus.search("cpq", &SearchOptions::default());
        assert!(!hits.is_empty());
        assert_eq!(hits[0].fields["code"], "CPQ");
    }

    #[test]
    fn results_are_sorted_and_cut_off() {
        let corpus = Corpus::build(&cities()).unwrap();
        let options = SearchOptions::default();
        let hits = corpus.search("campinas", &options);
        for pair in hits.windows(2) {
            assert!(pair[0].score <= pair[1].score);
        }
        for hit in &hits {
            assert!(hit.score < options.cutoff);
        }
    }

    #[test]
    fn tight_cutoff_filters_everything() {
        let corpus = Corpus::build(&cities()).unwrap();
        let options = SearchOptions { cutoff: 0.0, ..SearchOptions::default() };
        assert!(corpus.search("campinas", &options).is_empty());
    }

    #[test]
    fn hit_serialization_is_flat() {
        let corpus = Corpus::build(&cities()).unwrap();
        let options = SearchOptions { send_score: true, ..SearchOptions::default() };
        let hits = corpus.search("campinas", &options);
        let value = serde_json::to_value(&hits[0]).unwrap();
        assert_eq!(value["content"], "city");
        assert_eq!(value["name"], "Campinas");
        assert!(value["score"].is_f64());

        let hidden = corpus.search("campinas", &SearchOptions::default());
        let value = serde_json::to_value(&hidden[0]).unwrap();
        assert!(value.get("score").is_none());
    }
}
