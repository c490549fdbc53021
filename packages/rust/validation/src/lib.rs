//! Inbound submission validation.
//!
//! A raw JSON body becomes a [`Submission`] only when every field is present
//! and valid. Nothing downstream ever sees a partially valid submission, and
//! no outbound call is made for one.

mod extract;
mod form;

use serde_json::{Number, Value};
use tracing::debug;

use crmbridge_shared::{CrmBridgeError, FieldError, Result, ValidationFailure};

use extract::Extractor;
use form::{PocNameForm, SubmissionForm};

/// Field names of the inbound JSON body.
pub mod fields {
    pub const PARENT_COMPANY_NAME: &str = "Parent Company Name";
    pub const COMPANY_ID: &str = "Company ID";
    pub const CHILD_COMPANY: &str = "Child Company";
    pub const POC_NAME: &str = "Org POC Name";
    pub const POC_EMAIL: &str = "Org POC Email";
    pub const CONTRACT_TOTAL: &str = "Contract Total";
    pub const START_DATE: &str = "Start Date";
    pub const END_DATE: &str = "End Date";
    pub const TERM_YEARS: &str = "Term (in years)";

    /// Order in which field errors are reported.
    pub(crate) const ORDER: [&str; 9] = [
        PARENT_COMPANY_NAME,
        COMPANY_ID,
        CHILD_COMPANY,
        POC_NAME,
        POC_EMAIL,
        CONTRACT_TOTAL,
        START_DATE,
        END_DATE,
        TERM_YEARS,
    ];
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A fully validated form submission. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    parent_company_name: String,
    company_id: u64,
    child_company: String,
    poc_first_name: String,
    poc_last_name: String,
    poc_email: String,
    contract_total: Number,
    start_date: String,
    end_date: String,
    term_years: u64,
}

impl Submission {
    pub fn parent_company_name(&self) -> &str {
        &self.parent_company_name
    }

    /// External reference id of the parent company.
    pub fn company_id(&self) -> u64 {
        self.company_id
    }

    pub fn child_company(&self) -> &str {
        &self.child_company
    }

    pub fn poc_first_name(&self) -> &str {
        &self.poc_first_name
    }

    pub fn poc_last_name(&self) -> &str {
        &self.poc_last_name
    }

    pub fn poc_email(&self) -> &str {
        &self.poc_email
    }

    /// Contract total exactly as submitted (integer or float).
    pub fn contract_total(&self) -> &Number {
        &self.contract_total
    }

    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    pub fn end_date(&self) -> &str {
        &self.end_date
    }

    pub fn term_years(&self) -> u64 {
        self.term_years
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse a request body and validate it.
///
/// Bytes that are not JSON at all are an [`CrmBridgeError::Unexpected`] error;
/// JSON that does not match the schema is a [`CrmBridgeError::Validation`] error.
pub fn parse_body(body: &[u8]) -> Result<Submission> {
    let raw: Value = serde_json::from_slice(body)
        .map_err(|e| CrmBridgeError::Unexpected(format!("malformed JSON body: {e}")))?;
    validate(&raw)
}

/// Validate a raw JSON value into a [`Submission`].
///
/// All fields are checked before returning, so the error lists every invalid
/// field at once.
pub fn validate(raw: &Value) -> Result<Submission> {
    let Value::Object(object) = raw else {
        return Err(invalid(vec![FieldError::new(
            "body",
            "must be a JSON object",
        )]));
    };

    let mut ex = Extractor::new(object);
    let parent_company_name = ex.string(fields::PARENT_COMPANY_NAME);
    let company_id = ex.integer(fields::COMPANY_ID);
    let child_company = ex.string(fields::CHILD_COMPANY);
    let (first, last) = ex.person_name(fields::POC_NAME);
    let poc_email = ex.string(fields::POC_EMAIL);
    let contract_total = ex.number(fields::CONTRACT_TOTAL);
    let start_date = ex.string(fields::START_DATE);
    let end_date = ex.string(fields::END_DATE);
    let term_years = ex.integer(fields::TERM_YEARS);
    let mut errors = ex.into_errors();

    let form = SubmissionForm {
        parent_company_name,
        company_id,
        child_company,
        poc_name: PocNameForm { first, last },
        poc_email,
        start_date,
        end_date,
        term_years,
    };

    // Type errors win over rule errors for the same field or its sub-fields.
    for err in form.check() {
        if !errors.iter().any(|e| covers(&e.field, &err.field)) {
            errors.push(err);
        }
    }

    if !errors.is_empty() {
        errors.sort_by_key(|e| field_rank(&e.field));
        debug!(count = errors.len(), "submission rejected");
        return Err(invalid(errors));
    }

    Ok(Submission {
        parent_company_name: form.parent_company_name,
        company_id: positive(form.company_id),
        child_company: form.child_company,
        poc_first_name: form.poc_name.first,
        poc_last_name: form.poc_name.last,
        poc_email: form.poc_email,
        contract_total,
        start_date: form.start_date,
        end_date: form.end_date,
        term_years: positive(form.term_years),
    })
}

fn invalid(errors: Vec<FieldError>) -> CrmBridgeError {
    CrmBridgeError::Validation(ValidationFailure { errors })
}

/// Whether an error on `reported` already accounts for `field`.
fn covers(reported: &str, field: &str) -> bool {
    field == reported
        || field
            .strip_prefix(reported)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Position of a field in the report order. Sub-fields sort right after their
/// parent, `first` before `last`.
fn field_rank(field: &str) -> (usize, usize) {
    let (top, sub) = field.split_once('.').unwrap_or((field, ""));
    let top = fields::ORDER
        .iter()
        .position(|f| *f == top)
        .unwrap_or(fields::ORDER.len());
    let sub = match sub {
        "" => 0,
        "first" => 1,
        "last" => 2,
        _ => 3,
    };
    (top, sub)
}

/// Range rules already guarantee `value >= 1` here.
fn positive(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}
