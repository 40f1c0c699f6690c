//! Searchable-record contract.
//!
//! A record type declares its searchable properties once, as a static table:
//! each property names a getter, a relative weight and two flags. The index
//! core never looks inside a record other than through this table.

use thiserror::Error;

/// One searchable property of a record type.
pub struct Property<T> {
    pub name: &'static str,
    pub get: fn(&T) -> String,
    /// Relative weight; normalized against the schema's total at build time.
    pub weight: f64,
    /// Identifier values are short codes, scored by plain Levenshtein.
    pub identifier: bool,
    /// Hidden values are searchable but never serialized into results.
    pub hidden: bool,
}

impl<T> Property<T> {
    pub const fn text(name: &'static str, get: fn(&T) -> String, weight: f64) -> Self {
        Self { name, get, weight, identifier: false, hidden: false }
    }

    pub const fn identifier(name: &'static str, get: fn(&T) -> String, weight: f64) -> Self {
        Self { name, get, weight, identifier: true, hidden: false }
    }

    pub const fn hidden(name: &'static str, get: fn(&T) -> String, weight: f64) -> Self {
        Self { name, get, weight, identifier: false, hidden: true }
    }
}

/// A record type that can be indexed for fuzzy search.
pub trait Searchable: Send + Sync + Sized + 'static {
    /// The property table. Must be non-empty with a positive total weight.
    fn properties() -> &'static [Property<Self>];

    /// Exponent applied to the combined score. Values above `1` push this
    /// type's scores toward `0`, letting it dominate merged rankings.
    fn scaling() -> f64 {
        1.0
    }

    /// Label attached to every result of this type. Defaults to the
    /// lowercased type name.
    fn content_label() -> String {
        short_type_name::<Self>().to_lowercase()
    }
}

/// Last path segment of `std::any::type_name`.
pub fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema declares no searchable properties")]
    EmptyPropertySet,
    #[error("schema weights must sum to a positive total, offending properties: {properties:?}")]
    NonPositiveWeight { properties: Vec<&'static str> },
}

/// Check the schema invariants and return each property's normalized weight.
pub fn normalized_weights<T: Searchable>() -> Result<Vec<f64>, SchemaError> {
    let properties = T::properties();
    if properties.is_empty() {
        return Err(SchemaError::EmptyPropertySet);
    }
    let negative: Vec<&'static str> = properties
        .iter()
        .filter(|p| p.weight < 0.0)
        .map(|p| p.name)
        .collect();
    if !negative.is_empty() {
        return Err(SchemaError::NonPositiveWeight { properties: negative });
    }
    let total: f64 = properties.iter().map(|p| p.weight).sum();
    if total <= 0.0 {
        // All-zero weights leave nothing to normalize against.
        return Err(SchemaError::NonPositiveWeight {
            properties: properties.iter().map(|p| p.name).collect(),
        });
    }
    Ok(properties.iter().map(|p| p.weight / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Book {
        isbn: String,
        title: String,
    }

    impl Searchable for Book {
        fn properties() -> &'static [Property<Self>] {
            const PROPERTIES: &[Property<Book>] = &[
                Property::identifier("isbn", |b: &Book| b.isbn.clone(), 1.0),
                Property::text("title", |b: &Book| b.title.clone(), 3.0),
            ];
            PROPERTIES
        }
    }

    struct Broken;

    impl Searchable for Broken {
        fn properties() -> &'static [Property<Self>] {
            const PROPERTIES: &[Property<Broken>] =
                &[Property::text("value", |_: &Broken| String::new(), -1.0)];
            PROPERTIES
        }
    }

    #[test]
    fn weights_are_normalized() {
        let weights = normalized_weights::<Book>().unwrap();
        assert_eq!(weights, vec![0.25, 0.75]);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = normalized_weights::<Broken>().unwrap_err();
        assert_eq!(err, SchemaError::NonPositiveWeight { properties: vec!["value"] });
    }

    #[test]
    fn default_label_is_lowercased_type_name() {
        assert_eq!(Book::content_label(), "book");
        let _ = Book { isbn: String::new(), title: String::new() };
    }
}
