//! Field-level validation collecting one message per field.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Loose RFC 5322 style email pattern (same shape as the WHATWG one).
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// Field name → message map returned to clients as the error payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    /// Build a map holding a single field error.
    pub fn single(key: &str, message: &str) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(key.to_owned(), message.to_owned());
        Self(errors)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{key}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Accumulates field errors. The first message recorded for a field wins.
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, key: &str, message: &str) {
        self.errors
            .entry(key.to_owned())
            .or_insert_with(|| message.to_owned());
    }

    pub fn check(&mut self, ok: bool, key: &str, message: &str) {
        if !ok {
            self.add_error(key, message);
        }
    }

    /// Fold in errors from another validation pass, keeping messages already recorded.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (key, message) in other.0 {
            self.errors.entry(key).or_insert(message);
        }
    }

    /// `Ok(())` when no errors were recorded.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.valid() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

pub fn permitted_value<T: PartialEq>(value: &T, list: &[T]) -> bool {
    list.contains(value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
