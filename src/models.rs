use crate::schema::{attendance, classes, students};
use chrono::NaiveDate;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

pub type ClassId = i32;
pub type StudentId = i32;

#[derive(Queryable, Selectable, Tabled, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = classes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Class {
    pub id: ClassId,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = classes)]
pub struct NewClass<'a> {
    pub name: &'a str,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = students)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub class_id: ClassId,
}

#[derive(Insertable)]
#[diesel(table_name = students)]
pub struct NewStudent<'a> {
    pub name: &'a str,
    pub class_id: ClassId,
}

/// A single student's status on a single calendar day.
#[derive(Queryable, Selectable, Tabled, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = attendance)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Attendance {
    pub id: i32,
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: Status,
}

#[derive(Insertable, Debug, Clone, Copy)]
#[diesel(table_name = attendance)]
pub struct NewAttendance {
    pub student_id: StudentId,
    pub date: NaiveDate,
    pub status: Status,
}

/// The attendance status of a student for a day.
///
/// Marking a class only ever produces [`Status::Present`] or [`Status::Absent`]; the other two
/// enter the history through single-record writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
pub enum Status {
    Present,
    Absent,
    Late,
    Excused,
}

impl Status {
    /// The lower-case form stored in the database and written to exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Present => "present",
            Status::Absent => "absent",
            Status::Late => "late",
            Status::Excused => "excused",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown attendance status '{0}'")]
pub struct ParseStatusError(String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            "late" => Ok(Status::Late),
            "excused" => Ok(Status::Excused),
            _ => Err(ParseStatusError(s.to_string())),
        }
    }
}

impl ToSql<Text, Sqlite> for Status {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for Status {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(value.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Present".parse::<Status>().unwrap(), Status::Present);
        assert_eq!(" excused ".parse::<Status>().unwrap(), Status::Excused);
        assert!("tardy".parse::<Status>().is_err());
    }

    #[test]
    fn status_displays_lower_case() {
        let all = [Status::Present, Status::Absent, Status::Late, Status::Excused];
        let names: Vec<String> = all.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["present", "absent", "late", "excused"]);
    }
}
