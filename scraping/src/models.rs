//! Catalog data model: disciplines, courses and their suggestion trees.

use serde::{Deserialize, Serialize};

use search::schema::{Property, Searchable};
use search::SortedSet;

/// One prerequisite inside a conjunction group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub code: String,
    /// The requirement may be satisfied with a partial attendance (`*AA000`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    /// Set when the code does not resolve to a catalog discipline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special: Option<bool>,
}

impl Requirement {
    pub fn new(code: &str) -> Self {
        Self { code: code.to_string(), partial: None, special: None }
    }

    pub fn partial(code: &str) -> Self {
        Self { code: code.to_string(), partial: Some(true), special: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discipline {
    pub code: String,
    pub name: String,
    pub credits: u32,
    /// Alternative groups of conjunct requirements: to enroll, every
    /// requirement of at least one group must be met.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reqs: Option<Vec<Vec<Requirement>>>,
    /// Disciplines that list this one as a requirement.
    #[serde(rename = "reqBy", default, skip_serializing_if = "Option::is_none")]
    pub req_by: Option<SortedSet<String>>,
    pub syllabus: String,
}

impl Searchable for Discipline {
    fn properties() -> &'static [Property<Self>] {
        const PROPERTIES: &[Property<Discipline>] = &[
            Property::identifier("code", |d: &Discipline| d.code.clone(), 0.4),
            Property::text("name", |d: &Discipline| d.name.clone(), 0.4),
            Property::hidden("syllabus", |d: &Discipline| d.syllabus.clone(), 0.2),
        ];
        PROPERTIES
    }
}

/// One suggested discipline inside a semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterEntry {
    pub code: String,
    pub credits: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Semester {
    pub disciplines: Vec<SemesterEntry>,
    /// Elective credits suggested for the semester, 0 when none.
    pub electives: u32,
}

/// A course curriculum variant (e.g. `AA`), with its suggestion tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub code: String,
    pub name: String,
    pub tree: Vec<Semester>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
    /// Curriculum variants; empty for single-curriculum courses.
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// The suggestion tree of a single-curriculum course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<Vec<Semester>>,
}

impl Searchable for Course {
    fn properties() -> &'static [Property<Self>] {
        const PROPERTIES: &[Property<Course>] = &[
            Property::identifier("code", |c: &Course| c.code.clone(), 0.25),
            Property::text("name", |c: &Course| c.name.clone(), 0.75),
        ];
        PROPERTIES
    }

    fn scaling() -> f64 {
        1.25
    }
}
