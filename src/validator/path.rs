//! Concrete request path against an endpoint's path template

use crate::schema::{placeholder_name, split_path};
use crate::validator::report::ValidationReport;

/// Compare segment by segment. A count mismatch is one error on `path`;
/// otherwise each differing literal and each empty placeholder is reported.
pub fn validate_path(template: &str, actual: &str, report: &mut ValidationReport) {
    let actual = strip_query(actual);
    let template_parts = split_path(template);
    let actual_parts = split_path(actual);

    if template_parts.len() != actual_parts.len() {
        report.add_error(
            "path",
            format!("Path structure mismatch: expected {}, got {}", template, actual),
            None,
        );
        return;
    }

    for (position, (expected, got)) in template_parts.iter().zip(&actual_parts).enumerate() {
        match placeholder_name(expected) {
            Some(name) if got.is_empty() => {
                report.add_error(format!("path.{}", name), "Path parameter cannot be empty", None);
            }
            Some(_) => {}
            None if expected != got => {
                report.add_error(
                    "path",
                    format!(
                        "Path segment mismatch at position {}: expected '{}', got '{}'",
                        position, expected, got
                    ),
                    None,
                );
            }
            None => {}
        }
    }
}

fn strip_query(path: &str) -> &str {
    path.split(['?', '#']).next().unwrap_or(path)
}
