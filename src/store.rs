//! The storage port the attendance operations are written against, and its SQLite
//! implementation.

use crate::error::{AttendanceError, Result};
use crate::models::{
    Attendance, Class, ClassId, NewAttendance, NewClass, NewStudent, Status, Student, StudentId,
};
use crate::schema;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::debug;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Primitive reads and writes over classes, students and attendance records.
///
/// Implementations must enforce the foreign keys between the three tables, reporting a broken
/// reference as [`AttendanceError::IntegrityViolation`], and must cascade deletes from a class
/// to its students and from a student to its attendance.
pub trait AttendanceStore {
    fn insert_class(&mut self, name: &str) -> Result<Class>;

    /// All classes, ordered by name.
    fn list_classes(&mut self) -> Result<Vec<Class>>;

    fn find_class(&mut self, class_id: ClassId) -> Result<Option<Class>>;

    fn insert_student(&mut self, class_id: ClassId, name: &str) -> Result<Student>;

    /// The students of a class, ordered by name.
    fn students_in_class(&mut self, class_id: ClassId) -> Result<Vec<Student>>;

    fn insert_attendance(&mut self, record: NewAttendance) -> Result<Attendance>;

    /// The records dated `date` that belong to students of the class.
    fn attendance_on(&mut self, class_id: ClassId, date: NaiveDate) -> Result<Vec<Attendance>>;

    /// Every record that belongs to a student of the class, oldest first.
    fn attendance_for_class(&mut self, class_id: ClassId) -> Result<Vec<Attendance>>;

    /// Atomically replaces the records dated `date` for the current roster of the class with one
    /// fresh record per student, whose status is chosen by `status_for`.
    fn replace_day(
        &mut self,
        class_id: ClassId,
        date: NaiveDate,
        status_for: &dyn Fn(&Student) -> Status,
    ) -> Result<Vec<Attendance>>;

    /// Returns whether a class was deleted.
    fn delete_class(&mut self, class_id: ClassId) -> Result<bool>;

    /// Returns whether a student was deleted.
    fn delete_student(&mut self, student_id: StudentId) -> Result<bool>;
}

/// An [`AttendanceStore`] backed by a single `sqlite3` connection.
pub struct SqliteStore {
    db: SqliteConnection,
}

impl SqliteStore {
    /// Opens (or creates) the database at `database_url`, turns on foreign key enforcement and
    /// brings the schema up to date. `":memory:"` opens a private in-memory database.
    pub fn connect(database_url: &str) -> Result<Self> {
        let mut db = SqliteConnection::establish(database_url)?;

        // Has no effect inside a transaction, so it must run before the migrations do.
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut db)?;

        let applied = db
            .run_pending_migrations(MIGRATIONS)
            .map_err(AttendanceError::Migration)?;
        debug!(database_url, migrations = applied.len(), "database ready");

        Ok(Self { db })
    }
}

impl AttendanceStore for SqliteStore {
    fn insert_class(&mut self, name: &str) -> Result<Class> {
        let class = diesel::insert_into(schema::classes::table)
            .values(NewClass { name })
            .returning(Class::as_returning())
            .get_result(&mut self.db)?;

        Ok(class)
    }

    fn list_classes(&mut self) -> Result<Vec<Class>> {
        use schema::classes::dsl::*;

        let found = classes
            .order((name.asc(), id.asc()))
            .select(Class::as_select())
            .load(&mut self.db)?;

        Ok(found)
    }

    fn find_class(&mut self, class_id: ClassId) -> Result<Option<Class>> {
        let class = schema::classes::table
            .find(class_id)
            .select(Class::as_select())
            .first(&mut self.db)
            .optional()?;

        Ok(class)
    }

    fn insert_student(&mut self, class_id: ClassId, name: &str) -> Result<Student> {
        let student = diesel::insert_into(schema::students::table)
            .values(NewStudent { name, class_id })
            .returning(Student::as_returning())
            .get_result(&mut self.db)?;

        Ok(student)
    }

    fn students_in_class(&mut self, class_id: ClassId) -> Result<Vec<Student>> {
        Ok(load_roster(&mut self.db, class_id)?)
    }

    fn insert_attendance(&mut self, record: NewAttendance) -> Result<Attendance> {
        let inserted = diesel::insert_into(schema::attendance::table)
            .values(record)
            .returning(Attendance::as_returning())
            .get_result(&mut self.db)?;

        Ok(inserted)
    }

    fn attendance_on(&mut self, class_id: ClassId, day: NaiveDate) -> Result<Vec<Attendance>> {
        use schema::attendance::dsl::*;

        let records = attendance
            .inner_join(schema::students::table)
            .filter(schema::students::class_id.eq(class_id))
            .filter(date.eq(day))
            .select(Attendance::as_select())
            .load(&mut self.db)?;

        Ok(records)
    }

    fn attendance_for_class(&mut self, class_id: ClassId) -> Result<Vec<Attendance>> {
        use schema::attendance::dsl::*;

        let records = attendance
            .inner_join(schema::students::table)
            .filter(schema::students::class_id.eq(class_id))
            .order((date.asc(), id.asc()))
            .select(Attendance::as_select())
            .load(&mut self.db)?;

        Ok(records)
    }

    fn replace_day(
        &mut self,
        class_id: ClassId,
        day: NaiveDate,
        status_for: &dyn Fn(&Student) -> Status,
    ) -> Result<Vec<Attendance>> {
        let records = self.db.immediate_transaction(|conn| {
            use schema::attendance::dsl::*;

            let roster = load_roster(conn, class_id)?;
            if roster.is_empty() {
                return Ok(Vec::new());
            }

            let roster_ids: Vec<StudentId> = roster.iter().map(|s| s.id).collect();

            diesel::delete(attendance)
                .filter(date.eq(day))
                .filter(student_id.eq_any(&roster_ids))
                .execute(conn)?;

            roster
                .iter()
                .map(|student| {
                    diesel::insert_into(attendance)
                        .values(NewAttendance {
                            student_id: student.id,
                            date: day,
                            status: status_for(student),
                        })
                        .returning(Attendance::as_returning())
                        .get_result(conn)
                })
                .collect::<QueryResult<Vec<Attendance>>>()
        })?;

        Ok(records)
    }

    fn delete_class(&mut self, class_id: ClassId) -> Result<bool> {
        let deleted =
            diesel::delete(schema::classes::table.find(class_id)).execute(&mut self.db)?;

        Ok(deleted > 0)
    }

    fn delete_student(&mut self, student_id: StudentId) -> Result<bool> {
        let deleted =
            diesel::delete(schema::students::table.find(student_id)).execute(&mut self.db)?;

        Ok(deleted > 0)
    }
}

fn load_roster(conn: &mut SqliteConnection, roster_class: ClassId) -> QueryResult<Vec<Student>> {
    use schema::students::dsl::*;

    students
        .filter(class_id.eq(roster_class))
        .order((name.asc(), id.asc()))
        .select(Student::as_select())
        .load(conn)
}
