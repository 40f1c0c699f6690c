//! Small reusable primitives over parsed HTML documents.
//!
//! Scraper plugins compose these instead of poking at the DOM directly, so a
//! catalog layout change fails with a descriptive error instead of a silent
//! empty corpus.

use std::collections::HashMap;

use scraper::ElementRef;
use thiserror::Error;

use search::normalize::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParsingError {
    #[error("expected element is missing")]
    MissingElement,

    #[error("expected <{expected}> element, found <{found}>")]
    UnexpectedElementTag { expected: String, found: String },

    #[error("element has child elements where plain text was expected")]
    NodeHasChildren,

    #[error("text {text:?} does not parse as {target}")]
    UnparseableText { text: String, target: &'static str },

    #[error("duplicate section header {0:?}")]
    DuplicateSection(String),
}

/// First element sibling after `node`, skipping text and comment nodes.
pub fn next_element_sibling<'a>(node: ElementRef<'a>) -> Option<ElementRef<'a>> {
    node.next_siblings().find_map(ElementRef::wrap)
}

/// Collect `(header text, body)` pairs for every `header_tag` element inside
/// `container`. `extract_body` maps a header to its body node; headers with
/// no body are skipped. Header texts must be unique within the container.
pub fn parse_sections<'a, F>(
    container: ElementRef<'a>,
    header_tag: &str,
    extract_body: F,
) -> Result<HashMap<String, ElementRef<'a>>, ParsingError>
where
    F: Fn(ElementRef<'a>) -> Option<ElementRef<'a>>,
{
    let mut sections = HashMap::new();
    for header in container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == header_tag)
    {
        if let Some(body) = extract_body(header) {
            let title = collapse_whitespace(&header.text().collect::<String>());
            if sections.insert(title.clone(), body).is_some() {
                return Err(ParsingError::DuplicateSection(title));
            }
        }
    }
    Ok(sections)
}

/// Collapsed inner text of `node`, with optional tag and leaf assertions.
pub fn get_text(
    node: Option<ElementRef<'_>>,
    expected_tag: Option<&str>,
    allow_children: bool,
) -> Result<String, ParsingError> {
    let node = node.ok_or(ParsingError::MissingElement)?;
    if let Some(expected) = expected_tag {
        let found = node.value().name();
        if found != expected {
            return Err(ParsingError::UnexpectedElementTag {
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    if !allow_children && node.children().filter_map(ElementRef::wrap).next().is_some() {
        return Err(ParsingError::NodeHasChildren);
    }
    Ok(collapse_whitespace(&node.text().collect::<String>()))
}

/// `get_text` composed with a fallible string parser.
pub fn parse_text<T, P>(
    node: Option<ElementRef<'_>>,
    expected_tag: Option<&str>,
    allow_children: bool,
    parser: P,
) -> Result<T, ParsingError>
where
    P: FnOnce(&str) -> Option<T>,
{
    let text = get_text(node, expected_tag, allow_children)?;
    parser(&text).ok_or(ParsingError::UnparseableText {
        text,
        target: std::any::type_name::<T>(),
    })
}
