//! Scraper plugin for the course catalog and its suggestion trees.
//!
//! The index page lists every course label; each course has a suggestion
//! page with either a single curriculum tree or one tree per variant. Unlike
//! the discipline plugin, any parse failure here aborts the whole corpus: a
//! course with a half-read tree would silently misplan entire semesters.

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use search::normalize::{collapse_whitespace, sanitise_path_segment};
use search::schema::short_type_name;

use crate::error::Result;
use crate::html::{get_text, next_element_sibling, ParsingError};
use crate::models::{Course, Semester, SemesterEntry, Variant};
use crate::store::{ScrapeEnv, Scraper};

const COURSES_URL: &str = "https://www.dac.unicamp.br/sistemas/catalogos/grad/catalogo2021/";
const FETCH_CONCURRENCY: usize = 8;

lazy_static! {
    static ref COURSE_LABEL: Selector =
        Selector::parse("[class*=rotulo-curso]").expect("static selector");
    static ref SINGLE_CURRICULUM_ANCHOR: Selector =
        Selector::parse("a[name*=codigo]").expect("static selector");
    static ref PAGE_HEADER: Selector = Selector::parse("h1").expect("static selector");
    static ref VARIANT_HEADER_TAG: Selector = Selector::parse("h2").expect("static selector");
    static ref DISCIPLINE_LINK: Selector =
        Selector::parse("a[href*=disc]").expect("static selector");
    static ref COURSE_HEADER: Regex = Regex::new(r"^Curso ([0-9]+)G$").expect("static regex");
    static ref VARIANT_HEADER: Regex =
        Regex::new(r"^([0-9A-Z]{2}) - (.+)$").expect("static regex");
    static ref ELECTIVE_CREDITS: Regex =
        Regex::new(r"(?i)eletivos?:?\s*([0-9]+)").expect("static regex");
    static ref SEMESTER_TITLE: Regex = Regex::new(r"(?i)semestre").expect("static regex");
}

fn index_url() -> String {
    format!("{COURSES_URL}index.html")
}

fn course_url(code: &str) -> String {
    format!("{COURSES_URL}cursos/{code}g/sugestao.html")
}

fn parse_course_index(document: &Html) -> Result<Vec<(String, String)>> {
    let mut courses = Vec::new();
    for label in document.select(&COURSE_LABEL) {
        let text = get_text(Some(label), None, true)?;
        let (code, name) = text.split_once(" - ").ok_or_else(|| {
            ParsingError::UnparseableText { text: text.clone(), target: "course code and name" }
        })?;
        courses.push((code.to_string(), name.to_string()));
    }
    if courses.is_empty() {
        return Err(ParsingError::MissingElement.into());
    }
    Ok(courses)
}

/// A discipline cell reads `"<code> <credits>"`; single-letter prefixes keep
/// their internal space (`"F 128 4"` is code `"F 128"` with 4 credits).
fn parse_semester_entry(text: &str) -> Result<SemesterEntry> {
    let mut tokens = text.split_whitespace();
    let mut code = tokens.next().ok_or(ParsingError::MissingElement)?.to_string();
    if code.chars().count() == 1 {
        let rest = tokens.next().ok_or_else(|| ParsingError::UnparseableText {
            text: text.to_string(),
            target: "discipline code",
        })?;
        code.push(' ');
        code.push_str(rest);
    }
    let credits = tokens.next().and_then(|t| t.parse().ok()).unwrap_or(0);
    Ok(SemesterEntry { code, credits })
}

fn parse_semester(body: Option<ElementRef<'_>>) -> Result<Semester> {
    // A header with no body is a blank semester.
    let Some(body) = body else { return Ok(Semester::default()) };

    let mut disciplines = Vec::new();
    for link in body.select(&DISCIPLINE_LINK) {
        let text = collapse_whitespace(&link.text().collect::<String>());
        disciplines.push(parse_semester_entry(&text)?);
    }
    let full_text = collapse_whitespace(&body.text().collect::<String>());
    let electives = ELECTIVE_CREDITS
        .captures(&full_text)
        .and_then(|captures| captures[1].parse().ok())
        .unwrap_or(0);
    Ok(Semester { disciplines, electives })
}

/// Semester headers in document order; each body is the header's sibling.
fn build_tree(container: ElementRef<'_>) -> Result<Vec<Semester>> {
    let mut semesters = Vec::new();
    for header in container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "h3")
    {
        let title = collapse_whitespace(&header.text().collect::<String>());
        if !SEMESTER_TITLE.is_match(&title) {
            continue;
        }
        semesters.push(parse_semester(next_element_sibling(header))?);
    }
    Ok(semesters)
}

fn parse_course_page(
    document: &Html,
    code: &str,
) -> Result<(Vec<Variant>, Option<Vec<Semester>>)> {
    let header = get_text(document.select(&PAGE_HEADER).next(), Some("h1"), false)?;
    let captures = COURSE_HEADER.captures(&header).ok_or_else(|| {
        ParsingError::UnparseableText { text: header.clone(), target: "course page header" }
    })?;
    if &captures[1] != code {
        return Err(ParsingError::UnparseableText {
            text: header.clone(),
            target: "matching course code",
        }
        .into());
    }

    // Single-curriculum pages carry a named anchor instead of variant headers.
    if document.select(&SINGLE_CURRICULUM_ANCHOR).next().is_some() {
        return Ok((Vec::new(), Some(build_tree(document.root_element())?)));
    }

    let mut variants = Vec::new();
    for header in document.select(&VARIANT_HEADER_TAG) {
        let title = collapse_whitespace(&header.text().collect::<String>());
        let Some(captures) = VARIANT_HEADER.captures(&title) else {
            // Notes like "Observação" share the header tag with variants.
            continue;
        };
        let container = header
            .parent()
            .and_then(ElementRef::wrap)
            .ok_or(ParsingError::MissingElement)?;
        variants.push(Variant {
            code: captures[1].to_string(),
            name: captures[2].to_string(),
            tree: build_tree(container)?,
        });
    }
    if variants.is_empty() {
        return Err(ParsingError::MissingElement.into());
    }
    Ok((variants, None))
}

pub struct CourseScraper;

#[async_trait]
impl Scraper for CourseScraper {
    type Output = Vec<Course>;

    fn cache_key() -> String {
        sanitise_path_segment(short_type_name::<Course>())
    }

    async fn scrape(env: &ScrapeEnv) -> Result<Self::Output> {
        let index = env.client.fetch_html(&index_url(), parse_course_index).await?;
        tracing::info!(courses = index.len(), "scraping course catalog");

        stream::iter(index.into_iter().map(|(code, name)| {
            let client = env.client.clone();
            async move {
                let url = course_url(&code);
                let (variants, tree) =
                    client.fetch_html(&url, |doc| parse_course_page(doc, &code)).await?;
                Ok(Course { code, name, variants, tree })
            }
        }))
        .buffered(FETCH_CONCURRENCY)
        .try_collect()
        .await
    }
}
