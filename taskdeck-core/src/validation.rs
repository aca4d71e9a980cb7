//! Client-side form validation. Runs before any request leaves the process.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Field name to message, in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn require(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if is_blank(value) {
        errors.add(field, message);
    }
}

pub fn require_positive(errors: &mut FieldErrors, field: &'static str, value: f64) {
    if !value.is_finite() || value <= 0.0 {
        errors.add(field, "Value must be greater than 0");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.io"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn first_message_per_field_sticks() {
        let mut errors = FieldErrors::new();
        errors.add("email_c", "Email is required");
        errors.add("email_c", "Invalid email format");
        assert_eq!(errors.get("email_c"), Some("Email is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn positive_rejects_zero_negative_and_nan() {
        for value in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let mut errors = FieldErrors::new();
            require_positive(&mut errors, "value_c", value);
            assert_eq!(errors.get("value_c"), Some("Value must be greater than 0"));
        }
        let mut errors = FieldErrors::new();
        require_positive(&mut errors, "value_c", 0.01);
        assert!(errors.is_empty());
    }

    #[test]
    fn display_joins_fields() {
        let mut errors = FieldErrors::new();
        errors.add("title_c", "Task title is required");
        errors.add("project_id_c", "Please select a project");
        assert_eq!(
            errors.to_string(),
            "project_id_c: Please select a project; title_c: Task title is required"
        );
    }
}
