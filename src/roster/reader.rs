use super::validation;
use super::{
    COL_COURSE, COL_COURSE_TITLE, COL_CROSS_LIST_MAXIMUM, COL_CROSS_LISTINGS, COL_ENROLLMENT,
    COL_INSTRUCTOR, COL_MAX_ENROLLMENT, COL_MEETING_PATTERN, COL_ROOM, COL_SECTION, COL_TERM,
    REQUIRED_COLUMNS, RosterError, RosterRow, RowError,
};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone)]
struct ColumnMap {
    course: usize,
    course_title: usize,
    instructor: usize,
    max_enrollment: usize,
    term: Option<usize>,
    section: Option<usize>,
    room: Option<usize>,
    meeting_pattern: Option<usize>,
    enrollment: Option<usize>,
    cross_listings: Option<usize>,
    cross_list_maximum: Option<usize>,
}

impl ColumnMap {
    fn from_header(record: &StringRecord) -> Result<Self, Vec<&'static str>> {
        let find = |name: &str| record.iter().position(|field| field.trim() == name);
        let missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| find(name).is_none())
            .collect();
        let (Some(course), Some(course_title), Some(instructor), Some(max_enrollment)) = (
            find(COL_COURSE),
            find(COL_COURSE_TITLE),
            find(COL_INSTRUCTOR),
            find(COL_MAX_ENROLLMENT),
        ) else {
            return Err(missing);
        };
        Ok(Self {
            course,
            course_title,
            instructor,
            max_enrollment,
            term: find(COL_TERM),
            section: find(COL_SECTION),
            room: find(COL_ROOM),
            meeting_pattern: find(COL_MEETING_PATTERN),
            enrollment: find(COL_ENROLLMENT),
            cross_listings: find(COL_CROSS_LISTINGS),
            cross_list_maximum: find(COL_CROSS_LIST_MAXIMUM),
        })
    }

    fn required_width(&self) -> usize {
        [
            self.course,
            self.course_title,
            self.instructor,
            self.max_enrollment,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }

    fn is_repeated_header(&self, record: &StringRecord) -> bool {
        record.get(self.course) == Some(COL_COURSE)
            && record.get(self.course_title) == Some(COL_COURSE_TITLE)
    }
}

/// Lazily yields [`RosterRow`]s from a roster document.
///
/// Construction consumes the preamble and the header row, so a document without the
/// required columns fails up front. Row-level problems are yielded as [`RowError`]s and
/// iteration continues past them.
pub struct RosterReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    columns: ColumnMap,
    preamble: Vec<StringRecord>,
    done: bool,
}

impl RosterReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, RosterError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read> RosterReader<R> {
    pub fn from_reader(reader: R) -> Result<Self, RosterError> {
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader)
            .into_records();

        let mut preamble = Vec::new();
        let mut fewest_missing: Option<Vec<&'static str>> = None;
        while let Some(record) = records.next() {
            let record = record?;
            match ColumnMap::from_header(&record) {
                Ok(columns) => {
                    tracing::debug!(
                        preamble_lines = preamble.len(),
                        "found roster header row"
                    );
                    return Ok(Self {
                        records,
                        columns,
                        preamble,
                        done: false,
                    });
                }
                Err(missing) => {
                    if fewest_missing
                        .as_ref()
                        .is_none_or(|best| missing.len() < best.len())
                    {
                        fewest_missing = Some(missing);
                    }
                    preamble.push(record);
                }
            }
        }

        let missing = fewest_missing.unwrap_or_else(|| REQUIRED_COLUMNS.to_vec());
        Err(RosterError::MissingColumns {
            missing: missing.into_iter().map(str::to_string).collect(),
        })
    }

    /// The term named on the first preamble line, e.g. `Fall 2025`.
    pub fn preamble_term(&self) -> Option<&str> {
        self.preamble
            .first()
            .and_then(|record| record.iter().find(|field| !field.is_empty()))
    }

    fn field<'a>(record: &'a StringRecord, index: Option<usize>) -> &'a str {
        index.and_then(|idx| record.get(idx)).unwrap_or("")
    }

    fn parse_row(&self, row: u64, record: &StringRecord) -> Result<RosterRow, RowError> {
        let width = self.columns.required_width();
        if record.len() < width {
            return Err(RowError::new(
                row,
                format!(
                    "expected at least {width} fields, found {}",
                    record.len()
                ),
            ));
        }
        let cols = &self.columns;
        let get = |idx: usize| record.get(idx).unwrap_or("");

        // The preamble term only stands in for a missing column, never for an empty cell.
        let term = match cols.term {
            Some(idx) => get(idx).to_string(),
            None => self.preamble_term().unwrap_or_default().to_string(),
        };

        Ok(RosterRow {
            row,
            term,
            course_number: validation::required_text(row, COL_COURSE, get(cols.course))?,
            section: Self::field(record, cols.section).to_string(),
            course_title: get(cols.course_title).to_string(),
            instructor: get(cols.instructor).to_string(),
            room: Self::field(record, cols.room).to_string(),
            meeting_pattern: Self::field(record, cols.meeting_pattern).to_string(),
            enrollment: validation::count_or_zero(
                row,
                COL_ENROLLMENT,
                Self::field(record, cols.enrollment),
            )?,
            max_enrollment: validation::count(
                row,
                COL_MAX_ENROLLMENT,
                get(cols.max_enrollment),
            )?,
            cross_listings: Self::field(record, cols.cross_listings).to_string(),
            cross_list_maximum: validation::optional_count(
                row,
                COL_CROSS_LIST_MAXIMUM,
                Self::field(record, cols.cross_list_maximum),
            )?,
        })
    }
}

impl<R: Read> Iterator for RosterReader<R> {
    type Item = Result<RosterRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => {
                    let row = err.position().map(|pos| pos.line()).unwrap_or(0);
                    if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                        self.done = true;
                    }
                    return Some(Err(RowError::new(row, err.to_string())));
                }
            };
            let row = record.position().map(|pos| pos.line()).unwrap_or(0);

            let non_empty = record.iter().filter(|field| !field.is_empty()).count();
            if non_empty == 0 || record.len() == 1 || self.columns.is_repeated_header(&record) {
                continue;
            }
            return Some(self.parse_row(row, &record));
        }
        None
    }
}
