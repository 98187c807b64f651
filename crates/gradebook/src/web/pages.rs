//! HTML rendering for the three pages.
//!
//! Markup is deliberately plain. All user-supplied text goes through
//! [`escape`].

use std::fmt::Write;

use crate::auth::Notice;
use crate::model::{GradeEntry, Student, StudentOption};

/// Escape text for use in HTML element content and quoted attributes.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, logged_in: bool, notices: &[Notice], body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n",
        title = escape(title)
    );
    if logged_in {
        html.push_str(
            "<nav><a href=\"/students\">Students</a> | <a href=\"/grades\">Grades</a> | \
             <a href=\"/logout\">Log out</a></nav>\n",
        );
    }
    for notice in notices {
        let _ = writeln!(
            html,
            "<div class=\"notice notice-{}\">{}</div>",
            notice.level,
            escape(&notice.message)
        );
    }
    html.push_str(body);
    html.push_str("</body>\n</html>\n");
    html
}

/// The login form.
#[must_use]
pub fn login_page(notices: &[Notice]) -> String {
    let body = "<h1>Teacher Login</h1>\n\
        <form method=\"post\" action=\"/\">\n\
        <label>Username <input name=\"username\" required></label>\n\
        <label>Password <input type=\"password\" name=\"password\" required></label>\n\
        <button type=\"submit\">Log in</button>\n\
        </form>\n";
    layout("Teacher Login", false, notices, body)
}

/// The student registration form and the list of registered students.
#[must_use]
pub fn students_page(notices: &[Notice], students: &[Student]) -> String {
    let mut body = String::from(
        "<h1>Register Student</h1>\n\
         <form method=\"post\" action=\"/students\">\n\
         <label>Name <input name=\"name\" required></label>\n\
         <label>Registration number <input name=\"registration_number\" required></label>\n\
         <label>Email <input type=\"email\" name=\"email\"></label>\n\
         <button type=\"submit\">Register</button>\n\
         </form>\n\
         <h2>Registered Students</h2>\n",
    );

    if students.is_empty() {
        body.push_str("<p>No students registered yet.</p>\n");
    } else {
        body.push_str(
            "<table>\n<tr><th>ID</th><th>Name</th><th>Registration number</th><th>Email</th></tr>\n",
        );
        for student in students {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                student.id,
                escape(&student.name),
                escape(&student.registration_number),
                escape(student.email.as_deref().unwrap_or("")),
            );
        }
        body.push_str("</table>\n");
    }

    layout("Students", true, notices, &body)
}

/// The grade entry form and the list of recorded grades.
#[must_use]
pub fn grades_page(notices: &[Notice], grades: &[GradeEntry], students: &[StudentOption]) -> String {
    let mut body = String::from(
        "<h1>Record Grade</h1>\n<form method=\"post\" action=\"/grades\">\n\
         <label>Student <select name=\"student_id\" required>\n\
         <option value=\"\">Select a student</option>\n",
    );
    for student in students {
        let _ = writeln!(
            body,
            "<option value=\"{}\">{} ({})</option>",
            student.id,
            escape(&student.name),
            escape(&student.registration_number),
        );
    }
    body.push_str(
        "</select></label>\n\
         <label>Subject <input name=\"subject\" required></label>\n\
         <label>Score <input name=\"score\" required></label>\n\
         <button type=\"submit\">Record</button>\n\
         </form>\n\
         <h2>Recorded Grades</h2>\n",
    );

    if grades.is_empty() {
        body.push_str("<p>No grades recorded yet.</p>\n");
    } else {
        body.push_str("<table>\n<tr><th>ID</th><th>Student</th><th>Subject</th><th>Score</th></tr>\n");
        for grade in grades {
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                grade.id,
                escape(&grade.student_name),
                escape(&grade.subject),
                grade.score,
            );
        }
        body.push_str("</table>\n");
    }

    layout("Grades", true, notices, &body)
}
