pub mod cli;
pub mod clock;
pub mod display;
pub mod error;
pub mod export;
pub mod manager;
pub mod models;
pub mod schema;
pub mod settings;
pub mod store;
pub mod views;
pub mod web;

pub use crate::error::{AttendanceError, Result};
pub use crate::manager::AttendanceManager;
pub use crate::settings::Settings;

