//! `SQLite` schema definitions for gradebook.
//!
//! Every statement is `IF NOT EXISTS`, so running the full list against an
//! existing database changes nothing.

/// SQL statement to create the students table.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    registration_number TEXT NOT NULL UNIQUE,
    email TEXT UNIQUE
)
";

/// SQL statement to create the grades table.
pub const CREATE_GRADES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS grades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id INTEGER NOT NULL,
    subject TEXT NOT NULL,
    score REAL NOT NULL,
    FOREIGN KEY (student_id) REFERENCES students (id)
)
";

/// SQL statement to create an index on `student_id` for the grade listing join.
pub const CREATE_GRADES_STUDENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_STUDENTS_TABLE,
    CREATE_GRADES_TABLE,
    CREATE_GRADES_STUDENT_INDEX,
    CREATE_METADATA_TABLE,
];
