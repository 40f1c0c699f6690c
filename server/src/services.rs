//! Catalog directories served by the lookup routes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use scraping::courses::CourseScraper;
use scraping::disciplines::DisciplineScraper;
use scraping::models::{Course, Discipline, Semester};
use scraping::{fetch, ScrapeEnv};
use search::SearchCache;

use crate::boot::Service;

/// Code-keyed discipline lookup. Codes are matched exactly, case included:
/// `mc102` is not a catalog code.
pub struct DisciplineDirectory {
    by_code: HashMap<String, Discipline>,
}

impl DisciplineDirectory {
    pub fn new(disciplines: Vec<Discipline>) -> Self {
        let by_code = disciplines.into_iter().map(|d| (d.code.clone(), d)).collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&Discipline> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[async_trait]
impl Service for DisciplineDirectory {
    fn name() -> &'static str {
        "disciplines"
    }

    async fn boot(env: ScrapeEnv, cache: Arc<SearchCache>) -> anyhow::Result<Self> {
        let disciplines = fetch::<DisciplineScraper>(&env).await?;
        cache.overwrite(disciplines.clone());
        Ok(Self::new(disciplines))
    }
}

/// Course lookup plus variant-tree resolution.
pub struct CourseDirectory {
    by_code: HashMap<String, Course>,
}

impl CourseDirectory {
    pub fn new(courses: Vec<Course>) -> Self {
        let by_code = courses.into_iter().map(|c| (c.code.clone(), c)).collect();
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&Course> {
        self.by_code.get(code)
    }

    /// Resolve a variant by its code (`"AA"`) or by zero-based index (`"2"`).
    /// Single-curriculum courses expose their tree at index `0`.
    pub fn variant_tree<'a>(course: &'a Course, selector: &str) -> Option<&'a Vec<Semester>> {
        if let Some(variant) = course.variants.iter().find(|v| v.code == selector) {
            return Some(&variant.tree);
        }
        let index: usize = selector.parse().ok()?;
        if course.variants.is_empty() {
            return (index == 0).then_some(course.tree.as_ref()?);
        }
        course.variants.get(index).map(|variant| &variant.tree)
    }
}

#[async_trait]
impl Service for CourseDirectory {
    fn name() -> &'static str {
        "courses"
    }

    async fn boot(env: ScrapeEnv, cache: Arc<SearchCache>) -> anyhow::Result<Self> {
        let courses = fetch::<CourseScraper>(&env).await?;
        cache.overwrite(courses.clone());
        Ok(Self::new(courses))
    }
}

/// Wire shape of `GET /api/curso/:code`.
#[derive(Debug, Serialize)]
pub struct CoursePreview {
    pub code: String,
    pub name: String,
    pub variants: Vec<String>,
}

impl CoursePreview {
    pub fn of(course: &Course) -> Self {
        Self {
            code: course.code.clone(),
            name: course.name.clone(),
            variants: course.variants.iter().map(|v| v.code.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraping::models::Variant;

    fn course() -> Course {
        Course {
            code: "34".into(),
            name: "Física".into(),
            variants: vec![
                Variant { code: "AA".into(), name: "Física".into(), tree: vec![] },
                Variant { code: "AB".into(), name: "Aplicada".into(), tree: vec![] },
                Variant {
                    code: "AX".into(),
                    name: "Núcleo Comum".into(),
                    tree: vec![Semester::default()],
                },
            ],
            tree: None,
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let directory = DisciplineDirectory::new(vec![Discipline {
            code: "MC102".into(),
            name: "Algoritmos".into(),
            credits: 6,
            reqs: None,
            req_by: None,
            syllabus: String::new(),
        }]);
        assert!(directory.get("MC102").is_some());
        assert!(directory.get("mc102").is_none());
        assert!(directory.get("MC1022").is_none());
    }

    #[test]
    fn variants_resolve_by_code_or_index() {
        let course = course();
        assert!(CourseDirectory::variant_tree(&course, "AX").is_some());
        let by_index = CourseDirectory::variant_tree(&course, "2").unwrap();
        assert_eq!(by_index.len(), 1);
        assert!(CourseDirectory::variant_tree(&course, "3").is_none());
        assert!(CourseDirectory::variant_tree(&course, "ZZ").is_none());
    }

    #[test]
    fn single_curriculum_courses_expose_index_zero() {
        let course = Course {
            code: "42".into(),
            name: "Computação".into(),
            variants: vec![],
            tree: Some(vec![Semester::default()]),
        };
        assert!(CourseDirectory::variant_tree(&course, "0").is_some());
        assert!(CourseDirectory::variant_tree(&course, "1").is_none());
    }

    #[test]
    fn preview_lists_variant_codes() {
        let preview = CoursePreview::of(&course());
        assert_eq!(preview.variants, vec!["AA", "AB", "AX"]);
    }
}
