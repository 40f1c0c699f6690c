//! Scraper plugin for the discipline catalog.
//!
//! The catalog is split by discipline initials: an index page lists every
//! initials group, and each group page lists its disciplines as labelled
//! rows. Rows that fail to parse are skipped, matching how sparsely some
//! older catalog entries are filled in.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use search::normalize::{collapse_whitespace, sanitise_path_segment, search_text};
use search::schema::short_type_name;
use search::SortedSet;

use crate::error::Result;
use crate::html::{get_text, next_element_sibling, parse_sections, parse_text, ParsingError};
use crate::models::{Discipline, Requirement};
use crate::store::{ScrapeEnv, Scraper};

const DISCIPLINES_URL: &str =
    "https://www.dac.unicamp.br/sistemas/catalogos/grad/catalogo2021/disciplinas/";
const FETCH_CONCURRENCY: usize = 8;

lazy_static! {
    static ref INITIALS_CONTAINER: Selector =
        Selector::parse("[class*=disc]").expect("static selector");
    static ref INITIALS_ITEM: Selector = Selector::parse("div").expect("static selector");
    static ref ROW: Selector = Selector::parse(".row").expect("static selector");
    static ref CODE_NAME: Selector = Selector::parse("[id*=disc]").expect("static selector");
}

fn index_url() -> String {
    format!("{DISCIPLINES_URL}index.html")
}

fn initials_page_url(initials: &str) -> String {
    format!("{DISCIPLINES_URL}{}.html", initials.to_lowercase().replace(' ', "_"))
}

/// Discipline codes are exactly five chars, internal space included (`F 128`).
fn is_discipline_code(code: &str) -> bool {
    code.chars().count() == 5
}

fn create_requirement(raw: &str) -> Option<Requirement> {
    let raw = raw.trim();
    if is_discipline_code(raw) {
        Some(Requirement::new(raw))
    } else if let Some(code) = raw.strip_prefix('*') {
        is_discipline_code(code).then(|| Requirement::partial(code))
    } else {
        None
    }
}

/// Parse a requirements string like `"MC102 ou F 128+*MA111"` into
/// alternative groups of conjunct requirements. Any unrecognized token voids
/// the whole expression ("no requirements" is written in prose).
fn parse_requirements(raw: &str) -> Option<Vec<Vec<Requirement>>> {
    raw.split(" ou ")
        .map(|group| group.split('+').map(create_requirement).collect())
        .collect()
}

/// Case- and accent-insensitive section lookup by key fragment.
fn section<'a>(
    sections: &HashMap<String, ElementRef<'a>>,
    fragment: &str,
) -> Option<ElementRef<'a>> {
    sections
        .iter()
        .find(|(title, _)| search_text(title).contains(fragment))
        .map(|(_, body)| *body)
}

fn parse_initials_index(document: &Html) -> Result<Vec<String>> {
    let container =
        document.select(&INITIALS_CONTAINER).next().ok_or(ParsingError::MissingElement)?;
    let initials: Vec<String> = container
        .select(&INITIALS_ITEM)
        .map(|item| collapse_whitespace(&item.text().collect::<String>()).to_uppercase())
        .filter(|text| !text.is_empty())
        .collect();
    if initials.is_empty() {
        return Err(ParsingError::MissingElement.into());
    }
    Ok(initials)
}

fn parse_row(row: ElementRef<'_>) -> Result<Discipline> {
    let header = get_text(row.select(&CODE_NAME).next(), None, false)?;
    let (code, name) = header.split_once(" - ").ok_or_else(|| ParsingError::UnparseableText {
        text: header.clone(),
        target: "discipline code and name",
    })?;

    let sections = parse_sections(row, "h4", next_element_sibling)?;
    let credits = parse_text(section(&sections, "creditos"), None, false, |t| t.parse().ok())?;
    let requirements = get_text(section(&sections, "requisitos"), None, true)?;
    let syllabus = get_text(section(&sections, "ementa"), None, true)?;

    Ok(Discipline {
        code: code.to_string(),
        name: name.to_string(),
        credits,
        reqs: parse_requirements(&requirements),
        req_by: None,
        syllabus,
    })
}

fn parse_disciplines_page(document: &Html) -> Vec<Discipline> {
    document
        .select(&ROW)
        .filter_map(|row| match parse_row(row) {
            Ok(discipline) => Some(discipline),
            Err(error) => {
                tracing::debug!(%error, "skipping malformed discipline row");
                None
            }
        })
        .collect()
}

/// Second pass over the whole corpus: requirements that resolve to a known
/// discipline register a reverse `reqBy` edge; the rest are marked special.
fn link_requirements(disciplines: &mut [Discipline]) {
    let codes: HashSet<String> = disciplines.iter().map(|d| d.code.clone()).collect();
    let mut required_by: HashMap<String, Vec<String>> = HashMap::new();

    for discipline in disciplines.iter_mut() {
        let by = discipline.code.clone();
        if let Some(groups) = discipline.reqs.as_mut() {
            for group in groups {
                for requirement in group {
                    if codes.contains(&requirement.code) {
                        required_by.entry(requirement.code.clone()).or_default().push(by.clone());
                    } else {
                        requirement.special = Some(true);
                    }
                }
            }
        }
    }

    for discipline in disciplines.iter_mut() {
        if let Some(edges) = required_by.remove(&discipline.code) {
            let req_by = discipline.req_by.get_or_insert_with(SortedSet::new);
            for edge in edges {
                req_by.insert(edge);
            }
        }
    }
}

pub struct DisciplineScraper;

#[async_trait]
impl Scraper for DisciplineScraper {
    type Output = Vec<Discipline>;

    fn cache_key() -> String {
        sanitise_path_segment(short_type_name::<Discipline>())
    }

    async fn scrape(env: &ScrapeEnv) -> Result<Self::Output> {
        let initials = env.client.fetch_html(&index_url(), parse_initials_index).await?;
        tracing::info!(groups = initials.len(), "scraping discipline catalog");

        let pages: Vec<Vec<Discipline>> = stream::iter(initials.into_iter().map(|initials| {
            let client = env.client.clone();
            let url = initials_page_url(&initials);
            async move { client.fetch_html(&url, |doc| Ok(parse_disciplines_page(doc))).await }
        }))
        .buffered(FETCH_CONCURRENCY)
        .try_collect()
        .await?;

        let mut disciplines: Vec<Discipline> = pages.into_iter().flatten().collect();
        link_requirements(&mut disciplines);
        Ok(disciplines)
    }
}
