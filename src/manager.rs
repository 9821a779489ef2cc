use crate::clock::{Clock, SystemClock};
use crate::error::{AttendanceError, Result};
use crate::export::{AttendanceSheet, CsvExport};
use crate::models::{Attendance, Class, ClassId, NewAttendance, Status, Student, StudentId};
use crate::store::{AttendanceStore, SqliteStore};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Everything the class detail page shows: the class, its roster and what has been recorded for
/// today so far.
#[derive(Debug, Clone)]
pub struct ClassOverview {
    pub class: Class,
    pub roster: Vec<Student>,
    pub today: NaiveDate,
    /// Students missing from this map have not been marked today.
    pub attendance: HashMap<StudentId, Attendance>,
}

/// The manager for recording, modifying, and retrieving attendance data.
pub struct AttendanceManager<S = SqliteStore> {
    store: S,
    clock: Box<dyn Clock>,
}

impl AttendanceManager<SqliteStore> {
    /// Creates a new `AttendanceManager` over the `sqlite3` database at `database_url`, using the
    /// local system date as "today".
    pub fn connect(database_url: &str) -> Result<Self> {
        let store = SqliteStore::connect(database_url)?;
        Ok(Self::new(store, SystemClock))
    }
}

impl<S: AttendanceStore> AttendanceManager<S> {
    pub fn new(store: S, clock: impl Clock + 'static) -> Self {
        Self {
            store,
            clock: Box::new(clock),
        }
    }

    /// Replaces the clock used to decide what "today" is.
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            store: self.store,
            clock: Box::new(clock),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Creates a class with the trimmed `name`. A blank name is silently skipped and `None` is
    /// returned.
    pub fn create_class(&mut self, name: &str) -> Result<Option<Class>> {
        let Some(name) = non_blank(name) else {
            debug!("skipping class with blank name");
            return Ok(None);
        };

        let class = self.store.insert_class(name)?;
        info!(class_id = class.id, name = %class.name, "created class");

        Ok(Some(class))
    }

    /// Retrieves all classes ordered by name.
    pub fn list_classes(&mut self) -> Result<Vec<Class>> {
        self.store.list_classes()
    }

    pub fn get_class(&mut self, class_id: ClassId) -> Result<Class> {
        self.store
            .find_class(class_id)?
            .ok_or_else(|| AttendanceError::class_not_found(class_id))
    }

    /// Adds a student with the trimmed `name` to a class. A blank name is silently skipped.
    ///
    /// The class is not looked up first; adding to a class that does not exist fails with
    /// [`AttendanceError::IntegrityViolation`] from the store.
    pub fn add_student(&mut self, class_id: ClassId, name: &str) -> Result<Option<Student>> {
        let Some(name) = non_blank(name) else {
            debug!(class_id, "skipping student with blank name");
            return Ok(None);
        };

        let student = self.store.insert_student(class_id, name)?;
        info!(class_id, student_id = student.id, name = %student.name, "added student");

        Ok(Some(student))
    }

    /// The students of a class, ordered by name.
    pub fn roster(&mut self, class_id: ClassId) -> Result<Vec<Student>> {
        self.store.students_in_class(class_id)
    }

    /// Today's records for the students of a class, keyed by student.
    pub fn get_today_attendance(
        &mut self,
        class_id: ClassId,
    ) -> Result<HashMap<StudentId, Attendance>> {
        let today = self.today();
        let records = self.store.attendance_on(class_id, today)?;
        debug!(class_id, %today, records = records.len(), "loaded today's attendance");

        Ok(records
            .into_iter()
            .map(|record| (record.student_id, record))
            .collect())
    }

    pub fn class_overview(&mut self, class_id: ClassId) -> Result<ClassOverview> {
        let class = self.get_class(class_id)?;
        let roster = self.roster(class_id)?;
        let attendance = self.get_today_attendance(class_id)?;

        Ok(ClassOverview {
            class,
            roster,
            today: self.today(),
            attendance,
        })
    }

    /// Marks today's attendance for the whole roster of a class, replacing anything already
    /// recorded today. Students in `present_ids` are marked [`Status::Present`] and everyone else
    /// [`Status::Absent`].
    ///
    /// If `present_ids` contains an ID that is not on the roster, this function will ignore it.
    pub fn mark_attendance(
        &mut self,
        class_id: ClassId,
        present_ids: &[StudentId],
    ) -> Result<Vec<Attendance>> {
        let today = self.today();
        let present: HashSet<StudentId> = present_ids.iter().copied().collect();

        let records = self.store.replace_day(class_id, today, &|student: &Student| {
            if present.contains(&student.id) {
                Status::Present
            } else {
                Status::Absent
            }
        })?;

        let marked: HashSet<StudentId> = records.iter().map(|r| r.student_id).collect();
        for unknown in present.difference(&marked) {
            warn!(class_id, student_id = unknown, "tried to mark a student not on the roster");
        }

        info!(
            class_id,
            %today,
            present = records.iter().filter(|r| r.status == Status::Present).count(),
            total = records.len(),
            "marked attendance"
        );

        Ok(records)
    }

    /// Records a single status for one student on one day. This is how statuses other than
    /// present and absent enter the history.
    pub fn record_attendance(
        &mut self,
        student_id: StudentId,
        date: NaiveDate,
        status: Status,
    ) -> Result<Attendance> {
        let record = self.store.insert_attendance(NewAttendance {
            student_id,
            date,
            status,
        })?;
        info!(student_id, %date, %status, "recorded attendance");

        Ok(record)
    }

    /// Builds the full attendance history of a class as a student-by-date sheet.
    pub fn attendance_sheet(&mut self, class_id: ClassId) -> Result<AttendanceSheet> {
        let roster = self.roster(class_id)?;
        let records = self.store.attendance_for_class(class_id)?;

        Ok(AttendanceSheet::build(&roster, &records))
    }

    /// Exports the full attendance history of a class as CSV.
    pub fn export_attendance_csv(&mut self, class_id: ClassId) -> Result<CsvExport> {
        let class = self.get_class(class_id)?;
        let sheet = self.attendance_sheet(class_id)?;

        Ok(CsvExport {
            filename: CsvExport::filename_for(&class.name),
            content: sheet.to_csv()?,
        })
    }

    /// Deletes a class along with its students and their attendance.
    pub fn delete_class(&mut self, class_id: ClassId) -> Result<()> {
        if !self.store.delete_class(class_id)? {
            return Err(AttendanceError::class_not_found(class_id));
        }
        info!(class_id, "deleted class");

        Ok(())
    }

    /// Deletes a student along with their attendance.
    pub fn delete_student(&mut self, student_id: StudentId) -> Result<()> {
        if !self.store.delete_student(student_id)? {
            return Err(AttendanceError::student_not_found(student_id));
        }
        info!(student_id, "deleted student");

        Ok(())
    }
}

fn non_blank(name: &str) -> Option<&str> {
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    fn manager_on(date: NaiveDate) -> AttendanceManager {
        let store = SqliteStore::connect(":memory:").unwrap();
        AttendanceManager::new(store, FixedClock(date))
    }

    fn status_of(records: &[Attendance], student: &Student) -> Status {
        records
            .iter()
            .find(|r| r.student_id == student.id)
            .map(|r| r.status)
            .unwrap()
    }

    #[test]
    fn blank_class_names_are_skipped() {
        let mut manager = manager_on(day(1));

        assert_eq!(manager.create_class("").unwrap(), None);
        assert_eq!(manager.create_class("   ").unwrap(), None);
        assert!(manager.list_classes().unwrap().is_empty());

        let class = manager.create_class("  Algebra \n").unwrap().unwrap();
        assert_eq!(class.name, "Algebra");
        assert_eq!(manager.list_classes().unwrap(), [class]);
    }

    #[test]
    fn classes_are_listed_by_name() {
        let mut manager = manager_on(day(1));
        for name in ["Physics", "Biology", "Math101"] {
            manager.create_class(name).unwrap();
        }

        let names: Vec<String> = manager
            .list_classes()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Biology", "Math101", "Physics"]);
    }

    #[test]
    fn missing_class_is_not_found() {
        let mut manager = manager_on(day(1));

        assert!(matches!(
            manager.get_class(999),
            Err(AttendanceError::NotFound { id: 999, .. })
        ));
        assert!(matches!(
            manager.export_attendance_csv(999),
            Err(AttendanceError::NotFound { id: 999, .. })
        ));
        assert!(matches!(
            manager.class_overview(999),
            Err(AttendanceError::NotFound { .. })
        ));
    }

    #[test]
    fn blank_student_names_are_skipped() {
        let mut manager = manager_on(day(1));
        let class = manager.create_class("Art").unwrap().unwrap();

        assert_eq!(manager.add_student(class.id, " \t").unwrap(), None);
        let frida = manager.add_student(class.id, " Frida ").unwrap().unwrap();

        assert_eq!(frida.name, "Frida");
        assert_eq!(manager.roster(class.id).unwrap(), [frida]);
    }

    #[test]
    fn adding_student_to_missing_class_is_an_integrity_violation() {
        let mut manager = manager_on(day(1));

        let err = manager.add_student(31, "Ghost").unwrap_err();
        assert!(matches!(err, AttendanceError::IntegrityViolation(_)), "{err}");
    }

    #[test]
    fn marking_replaces_the_whole_day() {
        let mut manager = manager_on(day(3));
        let class = manager.create_class("Math101").unwrap().unwrap();
        let alice = manager.add_student(class.id, "Alice").unwrap().unwrap();
        let bob = manager.add_student(class.id, "Bob").unwrap().unwrap();
        let carol = manager.add_student(class.id, "Carol").unwrap().unwrap();

        manager.mark_attendance(class.id, &[alice.id, bob.id]).unwrap();
        manager.mark_attendance(class.id, &[]).unwrap();
        let latest = manager.mark_attendance(class.id, &[carol.id]).unwrap();
        assert_eq!(latest.len(), 3);

        let today = manager.get_today_attendance(class.id).unwrap();
        assert_eq!(today.len(), 3);
        assert_eq!(today[&alice.id].status, Status::Absent);
        assert_eq!(today[&bob.id].status, Status::Absent);
        assert_eq!(today[&carol.id].status, Status::Present);
        assert!(today.values().all(|a| a.date == day(3)));
    }

    #[test]
    fn unknown_and_foreign_ids_are_ignored() {
        let mut manager = manager_on(day(3));
        let math = manager.create_class("Math").unwrap().unwrap();
        let art = manager.create_class("Art").unwrap().unwrap();
        let ada = manager.add_student(math.id, "Ada").unwrap().unwrap();
        let frida = manager.add_student(art.id, "Frida").unwrap().unwrap();

        let records = manager
            .mark_attendance(math.id, &[frida.id, 12345])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(status_of(&records, &ada), Status::Absent);

        assert!(manager.get_today_attendance(art.id).unwrap().is_empty());
    }

    #[test]
    fn marking_leaves_other_days_alone() {
        let mut manager = manager_on(day(3));
        let class = manager.create_class("Math").unwrap().unwrap();
        let ada = manager.add_student(class.id, "Ada").unwrap().unwrap();

        manager.mark_attendance(class.id, &[ada.id]).unwrap();

        let mut manager = manager.with_clock(FixedClock(day(4)));
        assert!(manager.get_today_attendance(class.id).unwrap().is_empty());
        manager.mark_attendance(class.id, &[]).unwrap();

        let sheet = manager.attendance_sheet(class.id).unwrap();
        assert_eq!(sheet.dates, [day(3), day(4)]);
        assert_eq!(
            sheet.rows[0].statuses,
            [Some(Status::Present), Some(Status::Absent)]
        );
    }

    #[test]
    fn marking_an_empty_or_missing_class_does_nothing() {
        let mut manager = manager_on(day(3));
        let class = manager.create_class("Empty").unwrap().unwrap();

        assert!(manager.mark_attendance(class.id, &[1, 2]).unwrap().is_empty());
        assert!(manager.mark_attendance(404, &[]).unwrap().is_empty());
    }

    #[test]
    fn late_and_excused_only_come_from_single_records() {
        let mut manager = manager_on(day(3));
        let class = manager.create_class("Math").unwrap().unwrap();
        let ada = manager.add_student(class.id, "Ada").unwrap().unwrap();

        manager
            .record_attendance(ada.id, day(1), Status::Late)
            .unwrap();
        manager
            .record_attendance(ada.id, day(2), Status::Excused)
            .unwrap();

        let err = manager
            .record_attendance(ada.id, day(2), Status::Present)
            .unwrap_err();
        assert!(matches!(err, AttendanceError::IntegrityViolation(_)));

        let err = manager
            .record_attendance(999, day(2), Status::Present)
            .unwrap_err();
        assert!(matches!(err, AttendanceError::IntegrityViolation(_)));

        let export = manager.export_attendance_csv(class.id).unwrap();
        assert_eq!(
            String::from_utf8(export.content).unwrap(),
            "student,2025-02-01,2025-02-02\r\nAda,late,excused\r\n"
        );
    }

    #[test]
    fn exports_the_math101_scenario() {
        let mut manager = manager_on(day(14));
        let class = manager.create_class("Math101").unwrap().unwrap();
        let alice = manager.add_student(class.id, "Alice").unwrap().unwrap();
        manager.add_student(class.id, "Bob").unwrap();

        manager.mark_attendance(class.id, &[alice.id]).unwrap();

        let export = manager.export_attendance_csv(class.id).unwrap();
        assert_eq!(export.filename, "Math101-attendance.csv");
        assert_eq!(
            String::from_utf8(export.content).unwrap(),
            "student,2025-02-14\r\nAlice,present\r\nBob,absent\r\n"
        );
    }

    #[test]
    fn exporting_without_students_gives_header_only() {
        let mut manager = manager_on(day(14));
        let class = manager.create_class("Empty").unwrap().unwrap();

        let export = manager.export_attendance_csv(class.id).unwrap();
        assert_eq!(export.content, b"student\r\n");
    }

    #[test]
    fn deletes_cascade_through_the_manager() {
        let mut manager = manager_on(day(14));
        let class = manager.create_class("Math").unwrap().unwrap();
        let ada = manager.add_student(class.id, "Ada").unwrap().unwrap();
        let bob = manager.add_student(class.id, "Bob").unwrap().unwrap();
        manager.mark_attendance(class.id, &[ada.id]).unwrap();

        manager.delete_student(ada.id).unwrap();
        let today = manager.get_today_attendance(class.id).unwrap();
        assert_eq!(today.keys().copied().collect::<Vec<_>>(), [bob.id]);
        assert!(matches!(
            manager.delete_student(ada.id),
            Err(AttendanceError::NotFound { .. })
        ));

        manager.delete_class(class.id).unwrap();
        assert!(manager.roster(class.id).unwrap().is_empty());
        assert!(matches!(
            manager.delete_class(class.id),
            Err(AttendanceError::NotFound { .. })
        ));
    }
}
