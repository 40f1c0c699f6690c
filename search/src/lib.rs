pub mod cache;
pub mod corpus;
pub mod entry;
pub mod fuzzy;
pub mod normalize;
pub mod schema;
pub mod sorted_set;

pub use cache::SearchCache;
pub use corpus::{Corpus, SearchHit, SearchOptions, MAX_RESULT_SCORE};
pub use entry::Entry;
pub use schema::{Property, Searchable, SchemaError};
pub use sorted_set::SortedSet;
