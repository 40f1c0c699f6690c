//! Registry of typed corpora, one slot per record type.
//!
//! The slot map is only locked long enough to fetch or create a slot; builds
//! and queries contend on per-type locks, so rebuilding one corpus never
//! blocks queries on another.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::corpus::{Corpus, SearchHit, SearchOptions};
use crate::schema::Searchable;

/// Type-erased read view of a slot, used by the request fan-out.
pub trait CorpusSearch: Send + Sync {
    fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit>;
    fn label(&self) -> String;
    fn as_any(&self) -> &dyn Any;
}

struct Slot<T: Searchable> {
    corpus: RwLock<Option<Corpus<T>>>,
}

impl<T: Searchable> CorpusSearch for Slot<T> {
    fn search(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        match &*self.corpus.read() {
            Some(corpus) => corpus.search(query, options),
            None => Vec::new(),
        }
    }

    fn label(&self) -> String {
        T::content_label()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Default)]
pub struct SearchCache {
    slots: Mutex<HashMap<TypeId, Arc<dyn CorpusSearch>>>,
}

impl SearchCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot<T: Searchable>(&self) -> Arc<dyn CorpusSearch> {
        let mut slots = self.slots.lock();
        slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(Slot::<T> { corpus: RwLock::new(None) }))
            .clone()
    }

    /// Build a fresh corpus and swap it into the type's slot. A schema error
    /// is logged and the previous corpus, if any, stays in place.
    pub fn overwrite<T: Searchable>(&self, records: Vec<T>) {
        let slot = self.slot::<T>();
        let slot = slot.as_any().downcast_ref::<Slot<T>>().expect("slot type is keyed by TypeId");
        match Corpus::build(&records) {
            Ok(corpus) => *slot.corpus.write() = Some(corpus),
            Err(error) => {
                tracing::info!(content = %T::content_label(), %error, "search cache rejected corpus");
            }
        }
    }

    /// Search one type. An unbuilt slot yields no hits.
    pub fn search<T: Searchable>(&self, query: &str, options: &SearchOptions) -> Vec<SearchHit> {
        self.slot::<T>().search(query, options)
    }

    /// Snapshot of every registered slot, for the per-request fan-out.
    pub fn searchers(&self) -> Vec<Arc<dyn CorpusSearch>> {
        self.slots.lock().values().cloned().collect()
    }
}
