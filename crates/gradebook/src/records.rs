//! Student registration and grade entry.
//!
//! [`RecordService`] validates raw form input, performs the insert, and turns
//! store failures into [`RecordError`]s. Listing operations read straight
//! through to [`Storage`].

use tracing::{debug, warn};

use crate::error::{Error, RecordError, Result};
use crate::model::{GradeEntry, Student, StudentOption};
use crate::storage::Storage;

/// Message for a registration missing name or registration number.
pub const MSG_STUDENT_REQUIRED: &str = "Name and registration number are required.";

/// Message for a grade submission with an empty field.
pub const MSG_GRADE_REQUIRED: &str = "All fields are required.";

/// Message for a score that does not parse as a number.
pub const MSG_SCORE_NUMERIC: &str = "score must be numeric";

/// Raw student registration input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    /// Full name (required).
    pub name: String,
    /// Enrollment identifier (required).
    pub registration_number: String,
    /// Email; empty means none.
    pub email: String,
}

/// Raw grade entry input, as submitted by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewGrade {
    /// Id of the student, as text.
    pub student_id: String,
    /// Subject (required).
    pub subject: String,
    /// Score, as text; must parse as a number.
    pub score: String,
}

/// The create/list operations over students and grades.
#[derive(Debug)]
pub struct RecordService {
    storage: Storage,
}

impl RecordService {
    /// Wrap an opened storage.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Register a student and return the new id.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Validation`] if name or registration number is empty.
    /// - [`RecordError::Duplicate`] if the registration number or email is taken.
    /// - [`RecordError::Operation`] for any other store failure.
    pub fn register_student(&self, input: &NewStudent) -> std::result::Result<i64, RecordError> {
        let name = input.name.as_str();
        let registration_number = input.registration_number.as_str();
        let email = Some(input.email.as_str()).filter(|e| !e.is_empty());

        if name.is_empty() || registration_number.is_empty() {
            return Err(RecordError::validation(MSG_STUDENT_REQUIRED));
        }

        match self
            .storage
            .insert_student(name, registration_number, email)
        {
            Ok(id) => {
                debug!("Registered student {} as id {}", registration_number, id);
                Ok(id)
            }
            Err(err) if err.is_unique_violation() => {
                warn!("Duplicate student registration: {}", err.store_message());
                Err(RecordError::duplicate(duplicate_message(&err)))
            }
            Err(err) => {
                warn!("Failed to register student: {}", err);
                Err(RecordError::operation(format!(
                    "Could not register student: {}",
                    err.store_message()
                )))
            }
        }
    }

    /// Every student, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn list_students(&self) -> Result<Vec<Student>> {
        self.storage.students()
    }

    /// Record a grade and return the new id.
    ///
    /// # Errors
    ///
    /// - [`RecordError::Validation`] if a field is empty or the score is not a
    ///   number.
    /// - [`RecordError::Operation`] for anything else, including a student id
    ///   that is not an integer or names no student.
    pub fn record_grade(&self, input: &NewGrade) -> std::result::Result<i64, RecordError> {
        let student_id = input.student_id.as_str();
        let subject = input.subject.as_str();
        let score = input.score.as_str();

        if student_id.is_empty() || subject.is_empty() || score.is_empty() {
            return Err(RecordError::validation(MSG_GRADE_REQUIRED));
        }

        let score = parse_score(score)?;
        let student_id: i64 = student_id.trim().parse().map_err(|err| {
            warn!("Failed to record grade: bad student id {:?}: {}", student_id, err);
            RecordError::operation(format!(
                "Could not record grade: invalid student id {student_id:?} ({err})"
            ))
        })?;

        match self.storage.insert_grade(student_id, subject, score) {
            Ok(id) => {
                debug!("Recorded grade {} for student {}", id, student_id);
                Ok(id)
            }
            Err(err) => {
                warn!("Failed to record grade: {}", err);
                Err(RecordError::operation(format!(
                    "Could not record grade: {}",
                    err.store_message()
                )))
            }
        }
    }

    /// Every grade with its student's name, ordered by name then subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn list_grades(&self) -> Result<Vec<GradeEntry>> {
        self.storage.grade_entries()
    }

    /// The students offered in the grade-entry selector.
    ///
    /// # Errors
    ///
    /// Returns an error if the database read fails.
    pub fn list_students_for_form(&self) -> Result<Vec<StudentOption>> {
        self.storage.student_options()
    }
}

/// Parse a score. Any magnitude is accepted, including values that overflow
/// to infinity; only text that is not a number (and `NaN`) is rejected.
///
/// # Errors
///
/// Returns [`RecordError::Validation`] with [`MSG_SCORE_NUMERIC`].
pub fn parse_score(raw: &str) -> std::result::Result<f64, RecordError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(|| RecordError::validation(MSG_SCORE_NUMERIC))
}

fn duplicate_message(err: &Error) -> String {
    let detail = err.store_message();
    let field = if detail.contains("students.registration_number") {
        Some("registration number")
    } else if detail.contains("students.email") {
        Some("email")
    } else {
        None
    };

    match field {
        Some(field) => format!("A student with this {field} already exists ({detail})."),
        None => format!("Duplicate student data ({detail})."),
    }
}
