//! This module contains the command-line interface [`Cli`] parser for running the attendance server
//! and managing classes from a terminal.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{ClassId, Status, StudentId};
use crate::settings::DEFAULT_CONFIG_PATH;

/// The command line configuration struct, where the command-line interface parser is automatically
/// derived by [`clap::Parser`].
#[derive(Parser, Debug)]
#[command(name = "attendance", version, about = "Classroom attendance tracker")]
pub struct Cli {
    /// Config file to read, without or with its extension.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Overrides the configured database location.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// The different commands available for managing attendance.
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the web server.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create a new class.
    CreateClass { name: String },

    /// List all classes.
    ListClasses,

    /// Add a student to a class.
    AddStudent { class_id: ClassId, name: String },

    /// Show a class roster with today's attendance.
    ShowClass { class_id: ClassId },

    /// Mark today's attendance: the listed students are present, everyone else absent.
    Mark {
        class_id: ClassId,
        present: Vec<StudentId>,
    },

    /// Record a single status for a student on a given day.
    Record {
        student_id: StudentId,
        date: NaiveDate,
        #[arg(value_parser = parse_status)]
        status: Status,
    },

    /// Export a class's attendance history as CSV.
    Export {
        class_id: ClassId,
        /// Where to write the file. Defaults to `<class-name>-attendance.csv`.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a class with all of its students and their attendance.
    DeleteClass { class_id: ClassId },

    /// Delete a student and their attendance.
    DeleteStudent { student_id: StudentId },
}

fn parse_status(s: &str) -> Result<Status, String> {
    s.parse().map_err(|err: crate::models::ParseStatusError| err.to_string())
}
