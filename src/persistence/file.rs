use super::{ClassStore, PersistenceResult};
use crate::class::Class;
use crate::roster::EXPORT_COLUMNS;
use chrono::{Local, NaiveDateTime};
use csv::WriterBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes every stored class as a roster document that [`crate::loader::import_roster`]
/// reads back. Returns the number of class rows written.
pub fn export_classes_to_csv<S, W>(store: &S, writer: W) -> PersistenceResult<usize>
where
    S: ClassStore + ?Sized,
    W: Write,
{
    let classes = store.all_classes()?;
    let instructors = store.class_instructors()?;
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);

    writer.write_record([export_term(&classes)])?;
    writer.write_record([generated_line(Local::now().naive_local())])?;
    writer.write_record(EXPORT_COLUMNS)?;

    for class in &classes {
        let names = instructors
            .get(&class.id)
            .map(|names| {
                names
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        let enrollment = class.enrollment.to_string();
        let max_enrollment = class.max_enrollment.to_string();
        writer.write_record([
            class.term.as_str(),
            class.course_number.as_str(),
            class.section.as_str(),
            class.course_title.as_str(),
            names.as_str(),
            class.room.as_str(),
            class.meeting_pattern.as_str(),
            enrollment.as_str(),
            max_enrollment.as_str(),
            "",
            "",
        ])?;
    }
    writer.flush()?;
    tracing::info!(classes = classes.len(), "classes exported");
    Ok(classes.len())
}

pub fn save_classes_to_csv<S, P>(store: &S, path: P) -> PersistenceResult<usize>
where
    S: ClassStore + ?Sized,
    P: AsRef<Path>,
{
    let file = File::create(path)?;
    export_classes_to_csv(store, file)
}

pub fn export_classes_to_string<S: ClassStore + ?Sized>(store: &S) -> PersistenceResult<String> {
    let mut buffer = Vec::new();
    export_classes_to_csv(store, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// The most common term among the classes; ties go to the term seen first.
fn export_term(classes: &[Class]) -> String {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, class) in classes.iter().enumerate() {
        counts.entry(class.term.as_str()).or_insert((0, idx)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (a_count, a_first)), (_, (b_count, b_first))| {
            a_count.cmp(b_count).then(b_first.cmp(a_first))
        })
        .map(|(term, _)| term.to_string())
        .unwrap_or_default()
}

/// `Generated 3/1/2025, 9:05:07 AM`, without zero padding on month, day and hour.
pub fn generated_line(now: NaiveDateTime) -> String {
    format!("Generated {}", now.format("%-m/%-d/%Y, %-I:%M:%S %p"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn class(id: i64, term: &str) -> Class {
        Class {
            id,
            term: term.into(),
            course_number: format!("CSCI {id}"),
            section: "001".into(),
            course_title: "Title".into(),
            room: String::new(),
            meeting_pattern: String::new(),
            enrollment: 0,
            max_enrollment: 0,
        }
    }

    #[test]
    fn generated_line_strips_leading_zeroes() {
        let at = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(generated_line(at), "Generated 3/1/2025, 9:05:07 AM");
        let at = NaiveDate::from_ymd_opt(2025, 11, 20)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap();
        assert_eq!(generated_line(at), "Generated 11/20/2025, 3:30:00 PM");
    }

    #[test]
    fn export_term_prefers_majority_then_first_seen() {
        assert_eq!(export_term(&[]), "");
        let classes = vec![
            class(1, "Spring 2026"),
            class(2, "Fall 2025"),
            class(3, "Fall 2025"),
        ];
        assert_eq!(export_term(&classes), "Fall 2025");
        let tied = vec![class(1, "Spring 2026"), class(2, "Fall 2025")];
        assert_eq!(export_term(&tied), "Spring 2026");
    }
}
