//! Server-rendered HTML pages.

use crate::manager::ClassOverview;
use crate::models::{Class, Status};

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n\
         <body>\n<nav><a href=\"/\">Home</a> | <a href=\"/classes\">Classes</a></nav>\n\
         {}</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn index_page() -> String {
    layout(
        "Attendance",
        "<h1>Attendance</h1>\n<p><a href=\"/classes\">Manage classes</a></p>\n",
    )
}

pub fn not_found_page() -> String {
    layout(
        "Not found",
        "<h1>Not found</h1>\n<p>That class does not exist.</p>\n",
    )
}

pub fn classes_page(classes: &[Class]) -> String {
    let mut body = String::from("<h1>Classes</h1>\n");

    if classes.is_empty() {
        body.push_str("<p>No classes yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for class in classes {
            body.push_str(&format!(
                "<li><a href=\"/class/{}\">{}</a></li>\n",
                class.id,
                escape(&class.name)
            ));
        }
        body.push_str("</ul>\n");
    }

    body.push_str(
        "<form method=\"post\" action=\"/class/create\">\n\
         <input name=\"name\" placeholder=\"Class name\">\n\
         <button type=\"submit\">Create class</button>\n</form>\n",
    );

    layout("Classes", &body)
}

pub fn class_page(overview: &ClassOverview) -> String {
    let id = overview.class.id;
    let mut body = String::new();

    body.push_str(&format!("<h1>{}</h1>\n", escape(&overview.class.name)));
    body.push_str(&format!("<p>Attendance for {}</p>\n", overview.today));

    if overview.roster.is_empty() {
        body.push_str("<p>No students yet.</p>\n");
    } else {
        body.push_str(&format!("<form method=\"post\" action=\"/class/{id}/mark\">\n"));
        body.push_str("<table>\n<tr><th>Student</th><th>Present</th><th>Today</th></tr>\n");
        for student in &overview.roster {
            let status = overview.attendance.get(&student.id).map(|a| a.status);
            let checked = if status == Some(Status::Present) {
                " checked"
            } else {
                ""
            };
            let label = status.map_or("not marked", |s| s.as_str());

            body.push_str(&format!(
                "<tr><td>{}</td><td><input type=\"checkbox\" name=\"present\" value=\"{}\"{}></td>\
                 <td>{}</td></tr>\n",
                escape(&student.name),
                student.id,
                checked,
                label
            ));
        }
        body.push_str("</table>\n<button type=\"submit\">Save attendance</button>\n</form>\n");
    }

    body.push_str(&format!(
        "<form method=\"post\" action=\"/class/{id}/add_student\">\n\
         <input name=\"student_name\" placeholder=\"Student name\">\n\
         <button type=\"submit\">Add student</button>\n</form>\n\
         <p><a href=\"/export/class/{id}/csv\">Download attendance CSV</a></p>\n"
    ));

    layout(&overview.class.name, &body)
}
