use crate::manager::ClassOverview;
use crate::models::{Attendance, Class};
use tabled::{Table, Tabled, settings::Style};

/// Renders the list of classes as a table.
pub fn classes_table(classes: &[Class]) -> String {
    let mut table = Table::new(classes);
    table.with(Style::modern());
    table.to_string()
}

/// Renders a class roster along with each student's status for today.
pub fn class_table(overview: &ClassOverview) -> String {
    #[derive(Tabled)]
    struct RosterRow {
        id: i32,
        name: String,
        today: String,
    }

    let rows: Vec<RosterRow> = overview
        .roster
        .iter()
        .map(|student| RosterRow {
            id: student.id,
            name: student.name.clone(),
            today: overview
                .attendance
                .get(&student.id)
                .map_or_else(|| "-".to_string(), |a| a.status.to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());

    format!(
        "{} (class {}) on {}:\n{table}",
        overview.class.name, overview.class.id, overview.today
    )
}

/// Renders freshly written attendance records.
pub fn records_table(records: &[Attendance]) -> String {
    let mut table = Table::new(records);
    table.with(Style::modern());
    table.to_string()
}
