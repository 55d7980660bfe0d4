pub mod class;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod loader;
pub mod persistence;
pub mod professor;
pub mod recommend;
pub mod roster;

pub use class::{Class, ClassDetail, ClassSummary, EnrollmentAction, NewClass};
pub use config::{AppConfig, ConfigError};
pub use loader::{ClassRecord, ImportReport, import_roster, import_roster_file};
pub use persistence::{
    ClassStore, PersistenceError, PersistenceResult, SqliteClassStore, export_classes_to_csv,
    export_classes_to_string, save_classes_to_csv,
};
pub use professor::{InstructorName, Professor, parse_instructors};
pub use recommend::{SwapRecommendations, recommend_swaps};
pub use roster::{RosterError, RosterReader, RosterRow, RowError};
