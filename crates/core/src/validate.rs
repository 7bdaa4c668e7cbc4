// crates/core/src/validate.rs
//! Per-record validation and normalization.
//!
//! [`normalize_member`] is pure: it never touches storage and never aborts a
//! batch. A record either comes back as a [`Member`] ready to upsert or as a
//! [`RecordError`] listing every offending field.

use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use regex_lite::Regex;
use sha2::{Digest, Sha256};

use crate::error::{RecordError, ValidationError};
use crate::member::{present, Member, RawMember};

/// Date layouts accepted for `birthDate`, tried in order.
const BIRTH_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Knobs that change how records are canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    /// Prefix applied to phone numbers written without one, e.g. `+1`.
    pub default_country_code: String,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            default_country_code: "+1".to_string(),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"))
}

fn e164_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").expect("phone regex compiles"))
}

/// Validate one record and produce its storage form.
///
/// `index` is the record's 0-based position in the batch and is only used to
/// label errors for records without a member number.
pub fn normalize_member(
    index: usize,
    raw: &RawMember,
    salt: &[u8],
    rules: &ValidationRules,
) -> Result<Member, RecordError> {
    let mut problems = Vec::new();
    let today = Utc::now().date_naive();

    let member_number = present(&raw.member_number).map(str::to_string);
    let national_id = present(&raw.national_id).map(str::to_string);

    let email = present(&raw.email).and_then(|value| match validate_email(value) {
        Ok(email) => Some(email),
        Err(e) => {
            problems.push(e);
            None
        }
    });

    let phone = present(&raw.phone).and_then(|value| {
        match normalize_phone(value, &rules.default_country_code) {
            Ok(phone) => Some(phone),
            Err(e) => {
                problems.push(e);
                None
            }
        }
    });

    let birth_date = present(&raw.birth_date).and_then(|value| {
        match parse_birth_date(value, today) {
            Ok(date) => Some(date),
            Err(e) => {
                problems.push(e);
                None
            }
        }
    });

    // A malformed email still counts as an identifier the caller meant to
    // give, so only flag the record when nothing identifying was supplied.
    if member_number.is_none() && national_id.is_none() && present(&raw.email).is_none() {
        problems.push(ValidationError::MissingIdentifier);
    }

    if !problems.is_empty() {
        return Err(RecordError {
            label: raw.label(index),
            problems,
        });
    }

    Ok(Member {
        member_number,
        name: present(&raw.name).map(str::to_string),
        surname: present(&raw.surname).map(str::to_string),
        national_id,
        email,
        phone,
        birth_date,
        hashed_password: present(&raw.password).map(|p| hash_password(salt, p)),
        other: raw.other.clone(),
    })
}

/// Check an email address and return its lowercased form.
pub fn validate_email(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if email_regex().is_match(trimmed) {
        Ok(trimmed.to_lowercase())
    } else {
        Err(ValidationError::InvalidEmail(value.to_string()))
    }
}

/// Canonicalize a phone number to E.164.
///
/// Separators are dropped, a leading `00` becomes `+`, and numbers without an
/// international prefix get `default_country_code` (minus one trunk `0`).
pub fn normalize_phone(value: &str, default_country_code: &str) -> Result<String, ValidationError> {
    let compact: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    let international = if let Some(rest) = compact.strip_prefix("00") {
        format!("+{rest}")
    } else if compact.starts_with('+') {
        compact
    } else {
        let national = compact.strip_prefix('0').unwrap_or(&compact);
        format!("{default_country_code}{national}")
    };

    if e164_regex().is_match(&international) {
        Ok(international)
    } else {
        Err(ValidationError::InvalidPhone(value.to_string()))
    }
}

/// Parse a birth date in any accepted layout. Dates after `today` are rejected.
pub fn parse_birth_date(value: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    let date = BIRTH_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ValidationError::InvalidBirthDate(value.to_string()))?;

    if date > today {
        return Err(ValidationError::FutureBirthDate(value.to_string()));
    }
    Ok(date)
}

/// Deterministic salted password hash: hex SHA-256 of `salt || password`.
pub fn hash_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
