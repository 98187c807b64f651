//! Storage layer for gradebook.
//!
//! This module provides `SQLite`-based persistent storage for students and
//! their grades. Uniqueness and referential integrity are enforced by the
//! database itself, so every insert is a single atomic statement that either
//! lands completely or not at all.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{GradeEntry, Student, StudentOption};

/// Storage engine for student records.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// turns on foreign key enforcement, and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::prepare(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        Self::prepare(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    fn prepare(conn: &Connection) -> Result<()> {
        // SQLite leaves foreign keys off unless asked, per connection
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::initialize_schema(conn)
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-run the idempotent schema initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub fn initialize_schema(&self) -> Result<()> {
        migrations::initialize_schema(&self.conn)
    }

    /// Insert a student and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseQuery`] carrying the constraint violation if
    /// the registration number or email is already taken.
    pub fn insert_student(
        &self,
        name: &str,
        registration_number: &str,
        email: Option<&str>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO students (name, registration_number, email) VALUES (?1, ?2, ?3)",
            params![name, registration_number, email],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted student with id {}", id);
        Ok(id)
    }

    /// Insert a grade for an existing student and return the assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseQuery`] if `student_id` does not reference a
    /// student or the insert otherwise fails.
    pub fn insert_grade(&self, student_id: i64, subject: &str, score: f64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO grades (student_id, subject, score) VALUES (?1, ?2, ?3)",
            params![student_id, subject, score],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted grade with id {} for student {}", id, student_id);
        Ok(id)
    }

    /// All students in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn students(&self) -> Result<Vec<Student>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, name, registration_number, email
            FROM students ORDER BY id
            ",
        )?;

        let students = stmt
            .query_map([], Self::row_to_student)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(students)
    }

    /// Id, name and registration number of every student, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn student_options(&self) -> Result<Vec<StudentOption>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, registration_number FROM students ORDER BY id")?;

        let options = stmt
            .query_map([], |row| {
                Ok(StudentOption {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    registration_number: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(options)
    }

    /// Look up a student by registration number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn student_by_registration(&self, registration_number: &str) -> Result<Option<Student>> {
        let student = self
            .conn
            .query_row(
                r"
                SELECT id, name, registration_number, email
                FROM students WHERE registration_number = ?1
                ",
                [registration_number],
                Self::row_to_student,
            )
            .optional()?;
        Ok(student)
    }

    /// All grades joined with the student's name, ordered by student name,
    /// then subject, then grade id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn grade_entries(&self) -> Result<Vec<GradeEntry>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT grades.id, students.name, grades.subject, grades.score
            FROM grades
            JOIN students ON grades.student_id = students.id
            ORDER BY students.name, grades.subject, grades.id
            ",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(GradeEntry {
                    id: row.get(0)?,
                    student_name: row.get(1)?,
                    subject: row.get(2)?,
                    score: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Count registered students.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_students(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Count recorded grades.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_grades(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM grades", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_student(row: &rusqlite::Row) -> rusqlite::Result<Student> {
        Ok(Student {
            id: row.get(0)?,
            name: row.get(1)?,
            registration_number: row.get(2)?,
            email: row.get(3)?,
        })
    }
}
