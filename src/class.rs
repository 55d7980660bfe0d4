use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A scheduled course section as stored in the `classes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: i64,
    pub term: String,
    pub course_number: String,
    pub section: String,
    pub course_title: String,
    pub room: String,
    pub meeting_pattern: String,
    pub enrollment: i64,
    pub max_enrollment: i64,
}

impl Class {
    pub fn spare_seats(&self) -> i64 {
        self.max_enrollment - self.enrollment
    }

    pub fn is_overfull(&self) -> bool {
        self.enrollment > self.max_enrollment
    }

    /// Sections with neither seats nor students are online offerings without a room.
    pub fn is_remote(&self) -> bool {
        self.enrollment == 0 && self.max_enrollment == 0
    }

    pub fn detail(&self) -> ClassDetail {
        ClassDetail {
            id: self.id,
            term: self.term.clone(),
            course_name: self.course_number.clone(),
            section: self.section.clone(),
            name: self.course_title.clone(),
            room: self.room.clone(),
            time: self.meeting_pattern.clone(),
            current_enrollment: self.enrollment,
            max_enrollment: self.max_enrollment,
        }
    }

    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            id: self.id,
            section: self.section.clone(),
            course_name: self.course_number.clone(),
            course_title: self.course_title.clone(),
            current_enrollment: self.enrollment,
            max_enrollment: self.max_enrollment,
        }
    }
}

/// Row shape of the class listing consumed by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub id: i64,
    pub section: String,
    pub course_name: String,
    pub course_title: String,
    pub current_enrollment: i64,
    pub max_enrollment: i64,
}

/// Detail view of a single class consumed by the frontend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDetail {
    pub id: i64,
    pub term: String,
    pub course_name: String,
    pub section: String,
    pub name: String,
    pub room: String,
    pub time: String,
    pub current_enrollment: i64,
    pub max_enrollment: i64,
}

/// Class fields as they come out of an import, before the database assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClass {
    pub term: String,
    pub course_number: String,
    pub section: String,
    pub course_title: String,
    pub room: String,
    pub meeting_pattern: String,
    pub enrollment: i64,
    pub max_enrollment: i64,
}

impl NewClass {
    pub fn natural_key(&self) -> (String, String, String) {
        (
            self.term.clone(),
            self.course_number.clone(),
            self.section.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentAction {
    Add,
    Remove,
}

impl EnrollmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentAction::Add => "add",
            EnrollmentAction::Remove => "remove",
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            EnrollmentAction::Add => 1,
            EnrollmentAction::Remove => -1,
        }
    }
}

impl fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "+1" => Ok(EnrollmentAction::Add),
            "remove" | "-1" => Ok(EnrollmentAction::Remove),
            other => Err(format!("unknown enrollment action '{other}'")),
        }
    }
}
