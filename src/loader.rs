//! Turns parsed roster rows into class records and writes them through a [`ClassStore`].

use crate::class::NewClass;
use crate::persistence::{ClassStore, PersistenceResult};
use crate::professor::{InstructorName, parse_instructors};
use crate::roster::{RosterReader, RosterRow, RowError};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// A class ready to be written, with the source rows it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub rows: Vec<u64>,
    pub class: NewClass,
    pub instructors: Vec<InstructorName>,
}

impl ClassRecord {
    pub fn first_row(&self) -> u64 {
        self.rows.first().copied().unwrap_or(0)
    }

    fn from_row(row: &RosterRow) -> Self {
        Self {
            rows: vec![row.row],
            class: NewClass {
                term: row.term.clone(),
                course_number: row.course_number.clone(),
                section: row.section.clone(),
                course_title: row.course_title.clone(),
                room: row.room.clone(),
                meeting_pattern: row.meeting_pattern.clone(),
                enrollment: row.enrollment,
                max_enrollment: row.max_enrollment,
            },
            instructors: parse_instructors(&row.instructor),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub professors_created: usize,
    pub skipped: Vec<RowError>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.inserted + self.updated
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = vec![
            format!("inserted={}", self.inserted),
            format!("updated={}", self.updated),
            format!("professors_created={}", self.professors_created),
        ];
        if !self.skipped.is_empty() {
            parts.push(format!("skipped={}", self.skipped.len()));
        }
        parts.join(", ")
    }
}

/// Sorted, de-duplicated course numbers of a cross-listed row, including its own.
pub fn cross_list_key(row: &RosterRow) -> String {
    let courses: BTreeSet<&str> = row
        .cross_listings
        .split('/')
        .chain(std::iter::once(row.course_number.as_str()))
        .map(str::trim)
        .filter(|course| !course.is_empty())
        .collect();
    courses.into_iter().collect::<Vec<_>>().join(" / ")
}

/// Merges cross-listed rows and drops repeated natural keys.
///
/// Rows sharing a cross-listing key, term, meeting pattern and room describe one physical
/// section; they become a single record whose enrollment is the sum of the rows and whose
/// capacity is the cross-list maximum (or the summed capacities when that is missing).
pub fn build_class_records(rows: Vec<RosterRow>) -> (Vec<ClassRecord>, Vec<RowError>) {
    let mut records: Vec<ClassRecord> = Vec::with_capacity(rows.len());
    let mut cross_list_maximums: Vec<Option<i64>> = Vec::with_capacity(rows.len());
    let mut groups: HashMap<(String, String, String, String), usize> = HashMap::new();

    for row in &rows {
        if !row.is_cross_listed() {
            records.push(ClassRecord::from_row(row));
            cross_list_maximums.push(None);
            continue;
        }
        let key = cross_list_key(row);
        let group = (
            row.term.clone(),
            row.meeting_pattern.clone(),
            row.room.clone(),
            key.clone(),
        );
        let limit = row.cross_list_maximum.filter(|max| *max > 0);
        match groups.get(&group) {
            Some(&idx) => {
                let record = &mut records[idx];
                record.rows.push(row.row);
                record.class.enrollment += row.enrollment;
                record.class.max_enrollment += row.max_enrollment;
                for name in parse_instructors(&row.instructor) {
                    if !record.instructors.contains(&name) {
                        record.instructors.push(name);
                    }
                }
                if cross_list_maximums[idx].is_none() {
                    cross_list_maximums[idx] = limit;
                }
            }
            None => {
                let mut record = ClassRecord::from_row(row);
                record.class.course_number = key;
                groups.insert(group, records.len());
                records.push(record);
                cross_list_maximums.push(limit);
            }
        }
    }

    for (record, limit) in records.iter_mut().zip(cross_list_maximums) {
        if let Some(limit) = limit {
            record.class.max_enrollment = limit;
        }
    }

    let mut seen: HashMap<(String, String, String), u64> = HashMap::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();
    for record in records {
        let key = record.class.natural_key();
        if let Some(first) = seen.get(&key) {
            duplicates.push(RowError::new(
                record.first_row(),
                format!(
                    "duplicate class {} section '{}' in {} (first seen on row {first})",
                    key.1, key.2, key.0
                ),
            ));
            continue;
        }
        seen.insert(key, record.first_row());
        unique.push(record);
    }

    (unique, duplicates)
}

/// Parses a roster and writes it to the store. Row-level problems are collected in the
/// report; only a malformed document or a store failure aborts.
pub fn import_roster<S, R>(store: &S, reader: R) -> PersistenceResult<ImportReport>
where
    S: ClassStore + ?Sized,
    R: Read,
{
    let roster = RosterReader::from_reader(reader)?;
    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for result in roster {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => {
                tracing::warn!(row = err.row, reason = %err.reason, "roster row skipped");
                skipped.push(err);
            }
        }
    }

    let (records, duplicates) = build_class_records(rows);
    for duplicate in &duplicates {
        tracing::warn!(row = duplicate.row, reason = %duplicate.reason, "roster row skipped");
    }
    skipped.extend(duplicates);

    let mut report = store.import_classes(&records)?;
    report.skipped.extend(skipped);
    report.skipped.sort_by_key(|err| err.row);

    tracing::info!(
        inserted = report.inserted,
        updated = report.updated,
        professors_created = report.professors_created,
        skipped = report.skipped.len(),
        "roster imported"
    );
    Ok(report)
}

pub fn import_roster_file<S, P>(store: &S, path: P) -> PersistenceResult<ImportReport>
where
    S: ClassStore + ?Sized,
    P: AsRef<Path>,
{
    let file = std::fs::File::open(path)?;
    import_roster(store, std::io::BufReader::new(file))
}
