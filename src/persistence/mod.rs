use crate::class::{Class, ClassSummary, EnrollmentAction};
use crate::loader::{ClassRecord, ImportReport};
use crate::professor::{InstructorName, Professor};
use crate::roster::RosterError;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("class {id} is full ({max_enrollment} seats)")]
    ClassFull { id: i64, max_enrollment: i64 },
    #[error("class {id} is empty")]
    ClassEmpty { id: i64 },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl PersistenceError {
    pub fn class_not_found(id: i64) -> Self {
        Self::NotFound { entity: "class", id }
    }

    /// Errors caused by the caller's input rather than by the store itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ClassFull { .. } | Self::ClassEmpty { .. } | Self::InvalidData(_) | Self::Roster(_)
        )
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Read/write access to the class roster.
pub trait ClassStore {
    fn list_classes(&self) -> PersistenceResult<Vec<ClassSummary>>;
    fn all_classes(&self) -> PersistenceResult<Vec<Class>>;
    fn get_class(&self, id: i64) -> PersistenceResult<Class>;
    fn list_professors(&self) -> PersistenceResult<Vec<Professor>>;
    fn professors_for_class(&self, class_id: i64) -> PersistenceResult<Vec<Professor>>;
    /// Instructors of every class, keyed by class id.
    fn class_instructors(&self) -> PersistenceResult<HashMap<i64, Vec<InstructorName>>>;
    /// Applies a +1/-1 change and returns the new enrollment.
    fn update_enrollment(&self, class_id: i64, action: EnrollmentAction)
    -> PersistenceResult<i64>;
    fn swap_rooms(&self, first: i64, second: i64, swap_timeslots: bool) -> PersistenceResult<()>;
    fn possible_reassignments(&self, class_id: i64) -> PersistenceResult<Vec<Class>>;
    /// Writes import records, each one independently; failures land in the report.
    fn import_classes(&self, records: &[ClassRecord]) -> PersistenceResult<ImportReport>;
}

pub mod file;
pub mod sqlite;

pub use file::{export_classes_to_csv, export_classes_to_string, save_classes_to_csv};
pub use sqlite::SqliteClassStore;
