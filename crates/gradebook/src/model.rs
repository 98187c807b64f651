//! Record types returned by the store.

use serde::Serialize;

/// A registered student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    /// Store-assigned id.
    pub id: i64,
    /// Full name, not unique.
    pub name: String,
    /// Enrollment identifier, unique across all students.
    pub registration_number: String,
    /// Contact email, unique when present.
    pub email: Option<String>,
}

/// The subset of a student shown in the grade-entry selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentOption {
    /// Store-assigned id, submitted back as `student_id`.
    pub id: i64,
    /// Full name.
    pub name: String,
    /// Enrollment identifier.
    pub registration_number: String,
}

/// A grade joined with the name of the student it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeEntry {
    /// Store-assigned id.
    pub id: i64,
    /// Name of the owning student.
    pub student_name: String,
    /// Free-form subject.
    pub subject: String,
    /// Score exactly as entered.
    pub score: f64,
}

impl From<&Student> for StudentOption {
    fn from(student: &Student) -> Self {
        Self {
            id: student.id,
            name: student.name.clone(),
            registration_number: student.registration_number.clone(),
        }
    }
}
