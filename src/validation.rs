//! Request validation errors
//!
//! Collects per-field violations, typically produced by `validator` derive
//! checks on an incoming request, into a single reportable error.

use serde::Serialize;
use std::fmt;
use validator::ValidationErrorsKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field_violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new(field_violations: Vec<FieldViolation>) -> Self {
        Self { field_violations }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let violations: Vec<String> = self
            .field_violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.description))
            .collect();
        write!(f, "validation error(s): [{}]", violations.join(" "))
    }
}

impl std::error::Error for ValidationError {}

impl From<&validator::ValidationErrors> for ValidationError {
    fn from(errors: &validator::ValidationErrors) -> Self {
        Self::new(build_violations(errors))
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::from(&errors)
    }
}

/// One violation per failed field check, ordered by field name.
///
/// Errors from nested structs and lists are flattened. Their fields are
/// named by path, e.g. `card.number` or `items[1].sku`.
pub fn build_violations(errors: &validator::ValidationErrors) -> Vec<FieldViolation> {
    let mut violations = Vec::new();
    collect_violations(errors, None, &mut violations);
    violations.sort_by(|a, b| a.field.cmp(&b.field));
    violations
}

fn collect_violations(
    errors: &validator::ValidationErrors,
    prefix: Option<&str>,
    out: &mut Vec<FieldViolation>,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{field}"),
            None => field.to_string(),
        };
        match kind {
            ValidationErrorsKind::Field(errs) => out.extend(
                errs.iter()
                    .map(|err| FieldViolation::new(path.clone(), err.to_string())),
            ),
            ValidationErrorsKind::Struct(inner) => collect_violations(inner, Some(&path), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_violations(inner, Some(&format!("{path}[{index}]")), out);
                }
            }
        }
    }
}
