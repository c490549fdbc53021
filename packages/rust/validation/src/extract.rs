//! Presence and JSON-type checks on the raw submission object.
//!
//! Every getter records at most one error for its field and returns a default
//! value so the remaining fields can still be checked.

use serde_json::{Map, Number, Value};

use crmbridge_shared::FieldError;

/// Collects field errors while pulling typed values out of a JSON object.
pub(crate) struct Extractor<'a> {
    object: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> Extractor<'a> {
    pub fn new(object: &'a Map<String, Value>) -> Self {
        Self {
            object,
            errors: Vec::new(),
        }
    }

    /// A trimmed string field.
    pub fn string(&mut self, key: &str) -> String {
        let value = self.object.get(key);
        string_at(value, key, &mut self.errors)
    }

    /// An integer field. Range rules are applied later by the form.
    pub fn integer(&mut self, key: &str) -> i64 {
        match self.object.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(FieldError::new(key, "is required"));
                0
            }
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => i,
                None if n.is_u64() => {
                    self.errors.push(FieldError::new(key, "is out of range"));
                    0
                }
                None => {
                    self.errors.push(FieldError::new(key, "must be an integer"));
                    0
                }
            },
            Some(_) => {
                self.errors.push(FieldError::new(key, "must be an integer"));
                0
            }
        }
    }

    /// A numeric field, integer or floating point, kept exactly as sent.
    pub fn number(&mut self, key: &str) -> Number {
        match self.object.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(FieldError::new(key, "is required"));
                Number::from(0)
            }
            Some(Value::Number(n)) => n.clone(),
            Some(_) => {
                self.errors.push(FieldError::new(key, "must be a number"));
                Number::from(0)
            }
        }
    }

    /// A nested object with `first` and `last` string members.
    pub fn person_name(&mut self, key: &str) -> (String, String) {
        match self.object.get(key) {
            None | Some(Value::Null) => {
                self.errors.push(FieldError::new(key, "is required"));
                (String::new(), String::new())
            }
            Some(Value::Object(name)) => {
                let first = string_at(name.get("first"), &format!("{key}.first"), &mut self.errors);
                let last = string_at(name.get("last"), &format!("{key}.last"), &mut self.errors);
                (first, last)
            }
            Some(_) => {
                self.errors.push(FieldError::new(
                    key,
                    "must be an object with `first` and `last`",
                ));
                (String::new(), String::new())
            }
        }
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

fn string_at(value: Option<&Value>, field: &str, errors: &mut Vec<FieldError>) -> String {
    match value {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(field, "is required"));
            String::new()
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            String::new()
        }
    }
}
