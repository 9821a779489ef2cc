//! Pivots a class's attendance history into a student-by-date sheet and writes it out as CSV.

use crate::error::Result;
use crate::models::{Attendance, Status, Student, StudentId};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A rendered CSV export along with the filename it should be downloaded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: Vec<u8>,
}

impl CsvExport {
    pub fn filename_for(class_name: &str) -> String {
        format!("{class_name}-attendance.csv")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub student: String,
    /// One cell per column of [`AttendanceSheet::dates`].
    pub statuses: Vec<Option<Status>>,
}

/// Attendance history of a class with one row per student and one column per recorded date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSheet {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<SheetRow>,
}

impl AttendanceSheet {
    /// Builds the sheet for `students`. Rows come out in name order and the columns are every
    /// distinct date any of these students has a record for, earliest first. Records of other
    /// students are ignored.
    pub fn build(students: &[Student], records: &[Attendance]) -> Self {
        let mut students: Vec<&Student> = students.iter().collect();
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let members: HashSet<StudentId> = students.iter().map(|s| s.id).collect();
        let records: Vec<&Attendance> = records
            .iter()
            .filter(|record| members.contains(&record.student_id))
            .collect();

        let dates: Vec<NaiveDate> = records
            .iter()
            .map(|record| record.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let cells: HashMap<(StudentId, NaiveDate), Status> = records
            .iter()
            .map(|record| ((record.student_id, record.date), record.status))
            .collect();

        let rows = students
            .into_iter()
            .map(|student| SheetRow {
                student: student.name.clone(),
                statuses: dates
                    .iter()
                    .map(|date| cells.get(&(student.id, *date)).copied())
                    .collect(),
            })
            .collect();

        Self { dates, rows }
    }

    /// `student` followed by each date in ISO-8601 form.
    pub fn header(&self) -> Vec<String> {
        std::iter::once("student".to_string())
            .chain(self.dates.iter().map(|date| date.format("%Y-%m-%d").to_string()))
            .collect()
    }

    /// Serializes the sheet as standard CSV, quoting only the fields that need it.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .quote_style(csv::QuoteStyle::Necessary)
            .from_writer(Vec::new());

        writer.write_record(self.header())?;
        for row in &self.rows {
            let cells = std::iter::once(row.student.as_str()).chain(
                row.statuses
                    .iter()
                    .map(|status| status.map_or("", |s| s.as_str())),
            );
            writer.write_record(cells)?;
        }

        writer
            .into_inner()
            .map_err(|err| err.into_error().into())
    }
}
