//! Per-field pattern rules over normalized OCR text.
//!
//! Each field has an independent pure matcher; one field failing to match
//! never affects the others. Unmatched fields are omitted from the
//! serialized object rather than null-filled.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DOB: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{2}[-/.]\d{2}[-/.]\d{4})").unwrap());
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"Name[:\s]*([A-Z][A-Za-z\s]{2,50})").unwrap());
static GENDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(Male|Female|M|F)\b").unwrap());
static AADHAAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}\s*\d{4}\s*\d{4})").unwrap());

/// Date formats accepted for age derivation, tried in order.
const DOB_FORMATS: [&str; 3] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Labels that commonly follow the name on identity cards. Their values are
/// numeric, so the letters-and-spaces name pattern stops at the digits and
/// the label itself would leak into the capture; cut it off instead.
const TRAILING_LABELS: [&str; 5] = ["DOB", "GENDER", "ID", "AADHAAR", "YOB"];

/// Identity fields recovered from a document. Unmatched fields serialize as
/// absent keys, never as nulls.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct DocumentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aadhaar_number: Option<String>,
}

/// Apply every field rule to raw OCR text, evaluating age as of `today`.
pub fn parse(text: &str, today: NaiveDate) -> DocumentFields {
    let text = normalize(text);
    let dob = find_dob(&text);
    let age = dob.as_deref().and_then(|d| age_on(d, today));

    DocumentFields {
        dob,
        age,
        name: find_name(&text),
        gender: find_gender(&text),
        aadhaar_number: find_aadhaar(&text),
    }
}

/// Collapse all whitespace runs (including newlines) to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `DD<sep>MM<sep>YYYY` substring, `<sep>` one of `-`, `/`, `.`.
fn find_dob(text: &str) -> Option<String> {
    DOB.captures(text).map(|c| c[1].to_string())
}

/// Whole years between `dob` and `today`, one less when the birthday has not
/// yet been reached this year. None when no accepted format parses — an
/// unparseable date degrades to an omitted age, not an error.
pub fn age_on(dob: &str, today: NaiveDate) -> Option<i32> {
    for fmt in DOB_FORMATS {
        if let Ok(birth) = NaiveDate::parse_from_str(dob, fmt) {
            let mut age = today.year() - birth.year();
            if (today.month(), today.day()) < (birth.month(), birth.day()) {
                age -= 1;
            }
            return Some(age);
        }
    }
    None
}

/// Text following a literal `Name` label: optional separators, then 3–50
/// letters/spaces starting uppercase, trimmed, cut at any trailing field
/// label the pattern swallowed.
fn find_name(text: &str) -> Option<String> {
    let captured = NAME.captures(text).map(|c| c[1].trim().to_string())?;

    let mut tokens: Vec<&str> = captured.split_whitespace().collect();
    if let Some(cut) = tokens.iter().position(|t| {
        let upper = t.to_uppercase();
        TRAILING_LABELS.contains(&upper.as_str())
    }) {
        tokens.truncate(cut);
    }

    let name = tokens.join(" ");
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// First whole-word `Male`/`Female`/`M`/`F` (case-insensitive), normalized
/// to the full word.
fn find_gender(text: &str) -> Option<String> {
    GENDER.captures(text).map(|c| {
        match c[1].to_uppercase().as_str() {
            "M" | "MALE" => "Male".to_string(),
            _ => "Female".to_string(),
        }
    })
}

/// First 12-digit sequence, optionally split into three groups of four,
/// reported with whitespace stripped.
fn find_aadhaar(text: &str) -> Option<String> {
    AADHAAR
        .captures(text)
        .map(|c| c[1].split_whitespace().collect())
}
