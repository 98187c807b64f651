//! `gradebook` - Minimal academic record keeping
//!
//! A teacher logs in with a single configured credential pair, registers
//! students and records per-subject grades. Records live in a local `SQLite`
//! database whose UNIQUE and FOREIGN KEY constraints carry the integrity
//! rules; the [`web`] module exposes the operations over HTTP.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod records;
pub mod storage;
pub mod web;

pub use auth::{AccessGuard, Credentials, Notice, NoticeLevel, SessionStore};
pub use config::Config;
pub use error::{Error, RecordError, Result};
pub use logging::init_logging;
pub use model::{GradeEntry, Student, StudentOption};
pub use records::{NewGrade, NewStudent, RecordService};
pub use storage::Storage;
