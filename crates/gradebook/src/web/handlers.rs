//! HTTP handlers.
//!
//! Each protected handler starts with [`require_login`]. Record failures are
//! never turned into error statuses; they become notices on the re-rendered
//! page.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::error;

use super::pages;
use super::session::ClientSession;
use super::AppState;
use crate::auth::Notice;
use crate::error::Error;
use crate::records::{NewGrade, NewStudent, RecordService};

/// Notice shown when an unauthenticated client hits a protected page.
pub const MSG_LOGIN_REQUIRED: &str = "Please log in to access this page.";

/// Notice shown after a rejected login.
pub const MSG_INVALID_LOGIN: &str = "Invalid username or password.";

/// Notice shown after a successful registration.
pub const MSG_STUDENT_REGISTERED: &str = "Student registered successfully!";

/// Notice shown after a successful grade entry.
pub const MSG_GRADE_RECORDED: &str = "Grade recorded successfully!";

/// Login form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    username: String,
    password: String,
}

/// Student registration form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StudentForm {
    name: String,
    registration_number: String,
    email: String,
}

/// Grade entry form fields.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GradeForm {
    student_id: String,
    subject: String,
    score: String,
}

impl From<StudentForm> for NewStudent {
    fn from(form: StudentForm) -> Self {
        Self {
            name: form.name,
            registration_number: form.registration_number,
            email: form.email,
        }
    }
}

impl From<GradeForm> for NewGrade {
    fn from(form: GradeForm) -> Self {
        Self {
            student_id: form.student_id,
            subject: form.subject,
            score: form.score,
        }
    }
}

// Read failures on the list queries are the only errors that reach the client
// as a status code.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        error!("Request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

/// Redirect to the login page unless the session is logged in.
fn require_login(state: &AppState, session: &ClientSession) -> Option<Response> {
    if state.guard.is_authenticated(&session.id) {
        return None;
    }
    state
        .guard
        .sessions()
        .push_notice(&session.id, Notice::info(MSG_LOGIN_REQUIRED));
    Some(session.attach(state, Redirect::to("/").into_response()))
}

/// `GET /`
pub async fn login_page(State(state): State<AppState>, session: ClientSession) -> Response {
    let notices = state.guard.sessions().take_notices(&session.id);
    session.attach(
        &state,
        Html(pages::login_page(&notices)).into_response(),
    )
}

/// `POST /`
pub async fn login_submit(
    State(state): State<AppState>,
    session: ClientSession,
    Form(form): Form<LoginForm>,
) -> Response {
    if state.guard.login(&session.id, &form.username, &form.password) {
        return session.attach(&state, Redirect::to("/students").into_response());
    }

    let mut notices = state.guard.sessions().take_notices(&session.id);
    notices.push(Notice::error(MSG_INVALID_LOGIN));
    session.attach(
        &state,
        Html(pages::login_page(&notices)).into_response(),
    )
}

/// `GET /logout`
pub async fn logout(State(state): State<AppState>, session: ClientSession) -> Response {
    let fresh = ClientSession {
        id: state.guard.logout(&session.id),
        is_new: true,
    };
    fresh.attach(&state, Redirect::to("/").into_response())
}

/// `GET /students`
pub async fn students_page(
    State(state): State<AppState>,
    session: ClientSession,
) -> Result<Response, Error> {
    if let Some(redirect) = require_login(&state, &session) {
        return Ok(redirect);
    }
    render_students(&state, &session, None).await
}

/// `POST /students`
pub async fn register_student(
    State(state): State<AppState>,
    session: ClientSession,
    Form(form): Form<StudentForm>,
) -> Result<Response, Error> {
    if let Some(redirect) = require_login(&state, &session) {
        return Ok(redirect);
    }

    let input = NewStudent::from(form);
    let outcome = state
        .with_records(move |records| records.register_student(&input))
        .await?;
    let notice = match outcome {
        Ok(_) => Notice::success(MSG_STUDENT_REGISTERED),
        Err(err) => err.notice(),
    };
    render_students(&state, &session, Some(notice)).await
}

async fn render_students(
    state: &AppState,
    session: &ClientSession,
    notice: Option<Notice>,
) -> Result<Response, Error> {
    let students = state
        .with_records(RecordService::list_students)
        .await??;
    let mut notices = state.guard.sessions().take_notices(&session.id);
    notices.extend(notice);
    Ok(session.attach(
        state,
        Html(pages::students_page(&notices, &students)).into_response(),
    ))
}

/// `GET /grades`
pub async fn grades_page(
    State(state): State<AppState>,
    session: ClientSession,
) -> Result<Response, Error> {
    if let Some(redirect) = require_login(&state, &session) {
        return Ok(redirect);
    }
    render_grades(&state, &session, None).await
}

/// `POST /grades`
pub async fn record_grade(
    State(state): State<AppState>,
    session: ClientSession,
    Form(form): Form<GradeForm>,
) -> Result<Response, Error> {
    if let Some(redirect) = require_login(&state, &session) {
        return Ok(redirect);
    }

    let input = NewGrade::from(form);
    let outcome = state
        .with_records(move |records| records.record_grade(&input))
        .await?;
    let notice = match outcome {
        Ok(_) => Notice::success(MSG_GRADE_RECORDED),
        Err(err) => err.notice(),
    };
    render_grades(&state, &session, Some(notice)).await
}

async fn render_grades(
    state: &AppState,
    session: &ClientSession,
    notice: Option<Notice>,
) -> Result<Response, Error> {
    let (grades, students) = state
        .with_records(|records| {
            Ok::<_, Error>((records.list_grades()?, records.list_students_for_form()?))
        })
        .await??;
    let mut notices = state.guard.sessions().take_notices(&session.id);
    notices.extend(notice);
    Ok(session.attach(
        state,
        Html(pages::grades_page(&notices, &grades, &students)).into_response(),
    ))
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
