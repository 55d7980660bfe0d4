use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Professor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub p_id: Option<String>,
}

impl Professor {
    pub fn name(&self) -> InstructorName {
        InstructorName {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            p_id: self.p_id.clone(),
        }
    }
}

/// Instructor as written in a roster cell. The get-or-create key of the `professors` table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructorName {
    pub first_name: String,
    pub last_name: String,
    pub p_id: Option<String>,
}

impl InstructorName {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        p_id: Option<&str>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            p_id: p_id.map(str::to_string),
        }
    }
}

/// Renders the name back in the registrar's `Last, First (id)` form.
impl fmt::Display for InstructorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_name.is_empty() {
            write!(f, "{}", self.last_name)?;
        } else {
            write!(f, "{}, {}", self.last_name, self.first_name)?;
        }
        if let Some(p_id) = &self.p_id {
            write!(f, " ({p_id})")?;
        }
        Ok(())
    }
}

static LAST_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<last>[^,(\[]+),\s*(?P<first>[^(\[]+?)\s*(?:\((?P<pid>\d+)\))?\s*(?:\[[^\]]*\])?\s*$",
    )
    .expect("valid instructor pattern")
});

static FIRST_LAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^(\[]+?)\s*(?:\((?P<pid>\d+)\))?\s*(?:\[[^\]]*\])?\s*$")
        .expect("valid instructor pattern")
});

const HONORIFICS: [&str; 4] = ["dr.", "dr", "prof.", "prof"];
const PLACEHOLDERS: [&str; 5] = ["staff", "tba", "tbd", "none", "n/a"];

/// Parses an `Instructor` cell into zero or more names.
///
/// Instructors are separated by `;`. Each chunk is either `Last, First (id) [role]`
/// or `First Last`, with the id and role parts optional. Placeholder entries such as
/// `Staff` and chunks that match neither form are dropped.
pub fn parse_instructors(cell: &str) -> Vec<InstructorName> {
    let mut names: Vec<InstructorName> = Vec::new();
    for chunk in cell.split(';') {
        if let Some(name) = parse_instructor(chunk) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

pub fn parse_instructor(chunk: &str) -> Option<InstructorName> {
    let chunk = strip_honorific(chunk.trim());
    if chunk.is_empty() || PLACEHOLDERS.contains(&chunk.to_ascii_lowercase().as_str()) {
        return None;
    }

    // Role brackets hold commas of their own; only the name part decides the form.
    let name_part = chunk.split(['(', '[']).next().unwrap_or_default();
    if name_part.contains(',') {
        let caps = LAST_FIRST.captures(chunk)?;
        let last = caps.name("last")?.as_str().trim();
        let first = strip_honorific(caps.name("first")?.as_str().trim());
        return Some(InstructorName::new(
            first,
            last,
            caps.name("pid").map(|m| m.as_str()),
        ));
    }

    let caps = FIRST_LAST.captures(chunk)?;
    let full = caps.name("name")?.as_str().trim();
    let p_id = caps.name("pid").map(|m| m.as_str());
    match full.rsplit_once(char::is_whitespace) {
        Some((first, last)) => Some(InstructorName::new(first.trim(), last.trim(), p_id)),
        None => Some(InstructorName::new("", full, p_id)),
    }
}

fn strip_honorific(value: &str) -> &str {
    if let Some((head, rest)) = value.split_once(char::is_whitespace) {
        if HONORIFICS.contains(&head.to_ascii_lowercase().as_str()) {
            return rest.trim_start();
        }
    }
    value
}
