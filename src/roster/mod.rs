//! Registrar roster CSV documents.
//!
//! A roster export may start with a few preamble lines (term, generation date) before the
//! header row. Everything after the header is one class section per row, with blank and
//! single-cell banner rows interleaved.

use std::fmt;
use std::io;
use thiserror::Error;

pub mod reader;
pub(crate) mod validation;

pub use reader::RosterReader;

pub const COL_TERM: &str = "Term";
pub const COL_COURSE: &str = "Course";
pub const COL_SECTION: &str = "Section #";
pub const COL_COURSE_TITLE: &str = "Course Title";
pub const COL_INSTRUCTOR: &str = "Instructor";
pub const COL_ROOM: &str = "Room";
pub const COL_MEETING_PATTERN: &str = "Meeting Pattern";
pub const COL_ENROLLMENT: &str = "Enrollment";
pub const COL_MAX_ENROLLMENT: &str = "Maximum Enrollment";
pub const COL_CROSS_LISTINGS: &str = "Cross-listings";
pub const COL_CROSS_LIST_MAXIMUM: &str = "Cross-list Maximum";

pub const REQUIRED_COLUMNS: [&str; 4] = [
    COL_COURSE,
    COL_COURSE_TITLE,
    COL_INSTRUCTOR,
    COL_MAX_ENROLLMENT,
];

/// Column order used when writing a roster back out.
pub const EXPORT_COLUMNS: [&str; 11] = [
    COL_TERM,
    COL_COURSE,
    COL_SECTION,
    COL_COURSE_TITLE,
    COL_INSTRUCTOR,
    COL_ROOM,
    COL_MEETING_PATTERN,
    COL_ENROLLMENT,
    COL_MAX_ENROLLMENT,
    COL_CROSS_LISTINGS,
    COL_CROSS_LIST_MAXIMUM,
];

/// Structural failure of a roster document. Aborts the import.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("no header row found; missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A single row that could not be imported. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RowError {
    pub row: u64,
    pub reason: String,
}

impl RowError {
    pub fn new(row: u64, reason: impl Into<String>) -> Self {
        Self {
            row,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

impl std::error::Error for RowError {}

/// One class section parsed from a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    /// 1-based line number in the source document.
    pub row: u64,
    pub term: String,
    pub course_number: String,
    pub section: String,
    pub course_title: String,
    pub instructor: String,
    pub room: String,
    pub meeting_pattern: String,
    pub enrollment: i64,
    pub max_enrollment: i64,
    pub cross_listings: String,
    pub cross_list_maximum: Option<i64>,
}

impl RosterRow {
    pub fn is_cross_listed(&self) -> bool {
        !self.cross_listings.trim().is_empty()
    }
}
