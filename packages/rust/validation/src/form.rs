//! Declarative field rules for a submission, checked with `validator`.
//!
//! The form holds values that already have the right JSON type. Type and
//! presence checks happen earlier, in [`crate::extract`].

use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crmbridge_shared::FieldError;

use crate::fields;

/// Typed, trimmed submission values awaiting rule checks.
#[derive(Debug, Clone, Default, Validate)]
pub(crate) struct SubmissionForm {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub parent_company_name: String,

    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub company_id: i64,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub child_company: String,

    #[validate(nested)]
    pub poc_name: PocNameForm,

    #[validate(email(message = "must be a valid email address"))]
    pub poc_email: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub start_date: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub end_date: String,

    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub term_years: i64,
}

#[derive(Debug, Clone, Default, Validate)]
pub(crate) struct PocNameForm {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub first: String,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub last: String,
}

impl SubmissionForm {
    /// Run every rule and return the failures keyed by wire field name, in no
    /// particular order.
    pub fn check(&self) -> Vec<FieldError> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let mut out = Vec::new();
                flatten(&errors, None, &mut out);
                out
            }
        }
    }
}

/// Walk a (possibly nested) `ValidationErrors` tree into flat field errors.
fn flatten(errors: &ValidationErrors, parent: Option<&str>, out: &mut Vec<FieldError>) {
    for (key, kind) in errors.errors() {
        let key: &str = key;
        let name = match parent {
            Some(parent) => format!("{parent}.{key}"),
            None => wire_name(key).to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(first) = errs.first() {
                    out.push(FieldError::new(name, describe(first)));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(inner, Some(&name), out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(inner, Some(&format!("{name}[{index}]")), out);
                }
            }
        }
    }
}

fn describe(err: &ValidationError) -> String {
    match &err.message {
        Some(message) => message.to_string(),
        None => format!("failed `{}` check", err.code),
    }
}

/// Map a form field to the name it has in the inbound JSON.
fn wire_name(field: &str) -> &str {
    match field {
        "parent_company_name" => fields::PARENT_COMPANY_NAME,
        "company_id" => fields::COMPANY_ID,
        "child_company" => fields::CHILD_COMPANY,
        "poc_name" => fields::POC_NAME,
        "poc_email" => fields::POC_EMAIL,
        "start_date" => fields::START_DATE,
        "end_date" => fields::END_DATE,
        "term_years" => fields::TERM_YEARS,
        other => other,
    }
}
