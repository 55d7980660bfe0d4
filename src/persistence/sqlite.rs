use super::{ClassStore, PersistenceError, PersistenceResult};
use crate::class::{Class, ClassSummary, EnrollmentAction, NewClass};
use crate::loader::{ClassRecord, ImportReport};
use crate::professor::{InstructorName, Professor};
use crate::roster::RowError;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;
use std::path::Path;

const CLASS_COLUMNS: &str = "id, term, course_number, section, course_title, room, meeting_pattern, enrollment, max_enrollment";

pub struct SqliteClassStore {
    connection: Mutex<Connection>,
}

/// What happened to one import record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Inserted { professors_created: usize },
    Updated { professors_created: usize },
}

impl SqliteClassStore {
    pub fn new<P: AsRef<Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn open_in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Creates missing tables. Existing rows are left alone.
    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS classes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                term TEXT NOT NULL DEFAULT '',
                course_number TEXT NOT NULL,
                section TEXT NOT NULL DEFAULT '',
                course_title TEXT NOT NULL DEFAULT '',
                room TEXT NOT NULL DEFAULT '',
                meeting_pattern TEXT NOT NULL DEFAULT '',
                enrollment INTEGER NOT NULL DEFAULT 0 CHECK (enrollment >= 0),
                max_enrollment INTEGER NOT NULL DEFAULT 0 CHECK (max_enrollment >= 0),
                UNIQUE (term, course_number, section)
            );
            CREATE TABLE IF NOT EXISTS professors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                p_id TEXT
            );
            CREATE UNIQUE INDEX IF NOT EXISTS professors_identity
                ON professors (first_name, last_name, IFNULL(p_id, ''));
            CREATE TABLE IF NOT EXISTS class_professors (
                class_id INTEGER NOT NULL REFERENCES classes(id) ON DELETE CASCADE,
                professor_id INTEGER NOT NULL REFERENCES professors(id) ON DELETE CASCADE,
                UNIQUE (class_id, professor_id)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Returns the professor with this name, creating it first if needed.
    /// The flag is `true` when a new row was inserted.
    pub fn get_or_create_professor(
        &self,
        name: &InstructorName,
    ) -> PersistenceResult<(Professor, bool)> {
        let conn = self.connection.lock();
        let (id, created) = get_or_create_professor(&conn, name)?;
        Ok((
            Professor {
                id,
                first_name: name.first_name.clone(),
                last_name: name.last_name.clone(),
                p_id: name.p_id.clone(),
            },
            created,
        ))
    }

    fn class_exists(conn: &Connection, class_id: i64) -> PersistenceResult<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM classes WHERE id = ?1",
                params![class_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn load_class(conn: &Connection, class_id: i64) -> PersistenceResult<Class> {
        conn.query_row(
            &format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = ?1"),
            params![class_id],
            class_from_row,
        )
        .optional()?
        .ok_or_else(|| PersistenceError::class_not_found(class_id))
    }

    fn write_record(conn: &Connection, record: &ClassRecord) -> rusqlite::Result<RecordOutcome> {
        let class = &record.class;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM classes WHERE term = ?1 AND course_number = ?2 AND section = ?3",
                params![class.term, class.course_number, class.section],
                |row| row.get(0),
            )
            .optional()?;

        let class_id = match existing {
            Some(id) => {
                update_class(conn, id, class)?;
                conn.execute(
                    "DELETE FROM class_professors WHERE class_id = ?1",
                    params![id],
                )?;
                id
            }
            None => insert_class(conn, class)?,
        };

        let mut professors_created = 0;
        for name in &record.instructors {
            let (professor_id, created) = get_or_create_professor(conn, name)?;
            if created {
                professors_created += 1;
            }
            conn.execute(
                "INSERT OR IGNORE INTO class_professors (class_id, professor_id) VALUES (?1, ?2)",
                params![class_id, professor_id],
            )?;
        }

        Ok(match existing {
            Some(_) => RecordOutcome::Updated { professors_created },
            None => RecordOutcome::Inserted { professors_created },
        })
    }
}

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<Class> {
    Ok(Class {
        id: row.get("id")?,
        term: row.get("term")?,
        course_number: row.get("course_number")?,
        section: row.get("section")?,
        course_title: row.get("course_title")?,
        room: row.get("room")?,
        meeting_pattern: row.get("meeting_pattern")?,
        enrollment: row.get("enrollment")?,
        max_enrollment: row.get("max_enrollment")?,
    })
}

fn professor_from_row(row: &Row<'_>) -> rusqlite::Result<Professor> {
    Ok(Professor {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        p_id: row.get("p_id")?,
    })
}

fn insert_class(conn: &Connection, class: &NewClass) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO classes (term, course_number, section, course_title, room, meeting_pattern, enrollment, max_enrollment)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            class.term,
            class.course_number,
            class.section,
            class.course_title,
            class.room,
            class.meeting_pattern,
            class.enrollment,
            class.max_enrollment
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_class(conn: &Connection, id: i64, class: &NewClass) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE classes
         SET course_title = ?1, room = ?2, meeting_pattern = ?3, enrollment = ?4, max_enrollment = ?5
         WHERE id = ?6",
        params![
            class.course_title,
            class.room,
            class.meeting_pattern,
            class.enrollment,
            class.max_enrollment,
            id
        ],
    )?;
    Ok(())
}

fn get_or_create_professor(
    conn: &Connection,
    name: &InstructorName,
) -> rusqlite::Result<(i64, bool)> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM professors
             WHERE first_name = ?1 AND last_name = ?2 AND IFNULL(p_id, '') = IFNULL(?3, '')",
            params![name.first_name, name.last_name, name.p_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }
    conn.execute(
        "INSERT INTO professors (first_name, last_name, p_id) VALUES (?1, ?2, ?3)",
        params![name.first_name, name.last_name, name.p_id],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

impl ClassStore for SqliteClassStore {
    fn list_classes(&self) -> PersistenceResult<Vec<ClassSummary>> {
        Ok(self
            .all_classes()?
            .iter()
            .map(Class::summary)
            .collect())
    }

    fn all_classes(&self) -> PersistenceResult<Vec<Class>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], class_from_row)?;
        let mut classes = Vec::new();
        for class in rows {
            classes.push(class?);
        }
        Ok(classes)
    }

    fn get_class(&self, id: i64) -> PersistenceResult<Class> {
        let conn = self.connection.lock();
        Self::load_class(&conn, id)
    }

    fn list_professors(&self) -> PersistenceResult<Vec<Professor>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT id, first_name, last_name, p_id FROM professors ORDER BY last_name, first_name, id",
        )?;
        let rows = stmt.query_map([], professor_from_row)?;
        let mut professors = Vec::new();
        for professor in rows {
            professors.push(professor?);
        }
        Ok(professors)
    }

    fn professors_for_class(&self, class_id: i64) -> PersistenceResult<Vec<Professor>> {
        let conn = self.connection.lock();
        if !Self::class_exists(&conn, class_id)? {
            return Err(PersistenceError::class_not_found(class_id));
        }
        let mut stmt = conn.prepare(
            "SELECT professors.id, professors.first_name, professors.last_name, professors.p_id
             FROM professors
             JOIN class_professors ON professors.id = class_professors.professor_id
             WHERE class_professors.class_id = ?1
             ORDER BY class_professors.rowid",
        )?;
        let rows = stmt.query_map(params![class_id], professor_from_row)?;
        let mut professors = Vec::new();
        for professor in rows {
            professors.push(professor?);
        }
        Ok(professors)
    }

    fn class_instructors(&self) -> PersistenceResult<HashMap<i64, Vec<InstructorName>>> {
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT class_professors.class_id, professors.first_name, professors.last_name, professors.p_id
             FROM class_professors
             JOIN professors ON professors.id = class_professors.professor_id
             ORDER BY class_professors.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                InstructorName {
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    p_id: row.get(3)?,
                },
            ))
        })?;
        let mut by_class: HashMap<i64, Vec<InstructorName>> = HashMap::new();
        for entry in rows {
            let (class_id, name) = entry?;
            by_class.entry(class_id).or_default().push(name);
        }
        Ok(by_class)
    }

    fn update_enrollment(
        &self,
        class_id: i64,
        action: EnrollmentAction,
    ) -> PersistenceResult<i64> {
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let (enrollment, max_enrollment): (i64, i64) = tx
            .query_row(
                "SELECT enrollment, max_enrollment FROM classes WHERE id = ?1",
                params![class_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| PersistenceError::class_not_found(class_id))?;

        let updated = match action {
            EnrollmentAction::Add if enrollment >= max_enrollment => {
                return Err(PersistenceError::ClassFull {
                    id: class_id,
                    max_enrollment,
                });
            }
            EnrollmentAction::Remove if enrollment <= 0 => {
                return Err(PersistenceError::ClassEmpty { id: class_id });
            }
            _ => enrollment + action.delta(),
        };

        tx.execute(
            "UPDATE classes SET enrollment = ?1 WHERE id = ?2",
            params![updated, class_id],
        )?;
        tx.commit()?;
        tracing::debug!(class_id, %action, enrollment = updated, "enrollment updated");
        Ok(updated)
    }

    fn swap_rooms(&self, first: i64, second: i64, swap_timeslots: bool) -> PersistenceResult<()> {
        if first == second {
            return Err(PersistenceError::InvalidData(format!(
                "cannot swap class {first} with itself"
            )));
        }
        let mut conn = self.connection.lock();
        let tx = conn.transaction()?;
        let a = Self::load_class(&tx, first)?;
        let b = Self::load_class(&tx, second)?;

        let (a_pattern, b_pattern) = if swap_timeslots {
            (&b.meeting_pattern, &a.meeting_pattern)
        } else {
            (&a.meeting_pattern, &b.meeting_pattern)
        };
        let mut stmt = tx.prepare(
            "UPDATE classes SET room = ?1, max_enrollment = ?2, meeting_pattern = ?3 WHERE id = ?4",
        )?;
        stmt.execute(params![b.room, b.max_enrollment, a_pattern, a.id])?;
        stmt.execute(params![a.room, a.max_enrollment, b_pattern, b.id])?;
        drop(stmt);
        tx.commit()?;
        tracing::debug!(first, second, swap_timeslots, "rooms swapped");
        Ok(())
    }

    fn possible_reassignments(&self, class_id: i64) -> PersistenceResult<Vec<Class>> {
        let conn = self.connection.lock();
        let target = Self::load_class(&conn, class_id)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes
             WHERE id != ?1
               AND meeting_pattern = ?2
               AND ?3 >= enrollment
               AND max_enrollment >= ?4
               AND NOT (enrollment = 0 AND max_enrollment = 0)
             ORDER BY (max_enrollment - enrollment) ASC, id ASC"
        ))?;
        let rows = stmt.query_map(
            params![
                target.id,
                target.meeting_pattern,
                target.max_enrollment,
                target.enrollment
            ],
            class_from_row,
        )?;
        let mut partners = Vec::new();
        for class in rows {
            partners.push(class?);
        }
        Ok(partners)
    }

    fn import_classes(&self, records: &[ClassRecord]) -> PersistenceResult<ImportReport> {
        let mut conn = self.connection.lock();
        let mut tx = conn.transaction()?;
        let mut report = ImportReport::default();

        for record in records {
            let savepoint = tx.savepoint()?;
            match Self::write_record(&savepoint, record) {
                Ok(outcome) => {
                    savepoint.commit()?;
                    match outcome {
                        RecordOutcome::Inserted { professors_created } => {
                            report.inserted += 1;
                            report.professors_created += professors_created;
                        }
                        RecordOutcome::Updated { professors_created } => {
                            report.updated += 1;
                            report.professors_created += professors_created;
                        }
                    }
                }
                Err(err) => {
                    drop(savepoint);
                    tracing::warn!(row = record.first_row(), error = %err, "class row rejected");
                    report.skipped.push(RowError::new(
                        record.first_row(),
                        format!("{} {}: {err}", record.class.course_number, record.class.section),
                    ));
                }
            }
        }

        tx.commit()?;
        Ok(report)
    }
}
