//! HTTP routes for the attendance pages and the CSV download.

use crate::error::AttendanceError;
use crate::export::CSV_CONTENT_TYPE;
use crate::manager::AttendanceManager;
use crate::models::{ClassId, StudentId};
use crate::views;
use axum::Router;
use axum::extract::{Form, Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<Mutex<AttendanceManager>>,
}

impl AppState {
    pub fn new(manager: AttendanceManager) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
        }
    }

    /// Runs `op` against the manager on the blocking thread pool, since every store call is a
    /// synchronous database round trip.
    async fn run<T, F>(&self, op: F) -> Result<T, WebError>
    where
        F: FnOnce(&mut AttendanceManager) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let manager = Arc::clone(&self.manager);

        tokio::task::spawn_blocking(move || {
            let mut manager = manager.lock().map_err(|_| WebError::Poisoned)?;
            op(&mut *manager).map_err(WebError::from)
        })
        .await?
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("attendance manager lock was poisoned")]
    Poisoned,
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::Attendance(
                err @ (AttendanceError::NotFound { .. } | AttendanceError::IntegrityViolation(_)),
            ) => {
                info!("not found: {err}");
                (StatusCode::NOT_FOUND, Html(views::not_found_page())).into_response()
            }
            other => {
                error!("request failed: {other}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateClassForm {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddStudentForm {
    #[serde(default)]
    student_name: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/classes", get(list_classes))
        .route("/class/create", post(create_class))
        .route("/class/:id", get(view_class))
        .route("/class/:id/add_student", post(add_student))
        .route("/class/:id/mark", post(mark_attendance))
        .route("/export/class/:id/csv", get(export_csv))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> Html<String> {
    Html(views::index_page())
}

async fn list_classes(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let classes = state.run(|manager| manager.list_classes()).await?;
    Ok(Html(views::classes_page(&classes)))
}

async fn create_class(
    State(state): State<AppState>,
    Form(form): Form<CreateClassForm>,
) -> Result<Redirect, WebError> {
    state
        .run(move |manager| manager.create_class(&form.name))
        .await?;
    Ok(Redirect::to("/classes"))
}

async fn view_class(
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
) -> Result<Html<String>, WebError> {
    let overview = state
        .run(move |manager| manager.class_overview(class_id))
        .await?;
    Ok(Html(views::class_page(&overview)))
}

async fn add_student(
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
    Form(form): Form<AddStudentForm>,
) -> Result<Redirect, WebError> {
    state
        .run(move |manager| manager.add_student(class_id, &form.student_name))
        .await?;
    Ok(Redirect::to(&format!("/class/{class_id}")))
}

/// Expects one `present=<student id>` pair per checked student.
async fn mark_attendance(
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect, WebError> {
    let present: Vec<StudentId> = fields
        .iter()
        .filter(|(key, _)| key == "present")
        .filter_map(|(_, value)| value.trim().parse().ok())
        .collect();

    state
        .run(move |manager| manager.mark_attendance(class_id, &present))
        .await?;
    Ok(Redirect::to(&format!("/class/{class_id}")))
}

async fn export_csv(
    State(state): State<AppState>,
    Path(class_id): Path<ClassId>,
) -> Result<Response, WebError> {
    let export = state
        .run(move |manager| manager.export_attendance_csv(class_id))
        .await?;

    let disposition = HeaderValue::from_str(&content_disposition(&export.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    )
        .into_response())
}

/// Characters left unescaped in an RFC 5987 `filename*` value.
const FILENAME_ATTR_CHARS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Builds an attachment disposition for `filename`. Names that do not survive
/// [`header_safe_filename`] unchanged also carry the exact name as a UTF-8 `filename*`.
fn content_disposition(filename: &str) -> String {
    let fallback = header_safe_filename(filename);
    if fallback == filename {
        return format!("attachment; filename=\"{fallback}\"");
    }

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        utf8_percent_encode(filename, FILENAME_ATTR_CHARS)
    )
}

/// Keeps ASCII letters, digits and `-_. ` and replaces everything else with `_`, so the name can
/// sit inside a quoted `Content-Disposition` parameter.
fn header_safe_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
