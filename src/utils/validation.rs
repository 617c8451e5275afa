//! Field checks that collect into [`FieldErrors`] instead of failing fast.

use crate::error::FieldErrors;
use serde::{Deserialize, Deserializer};

pub fn check_required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field may not be blank.");
    }
}

pub fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
    }
}

pub fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    check_required(errors, field, value);
    check_max_len(errors, field, value, max);
}

pub fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    if !value.is_empty() && !value.contains('@') {
        errors.add(field, "Enter a valid email address.");
    }
}

/// Keeps "absent" and "explicit null" apart on PATCH bodies:
/// absent -> `None`, `null` -> `Some(None)`, value -> `Some(Some(v))`.
/// Use together with `#[serde(default)]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
