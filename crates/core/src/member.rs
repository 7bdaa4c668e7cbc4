// crates/core/src/member.rs
//! Organization member records, as submitted and as stored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A member record exactly as the caller submitted it.
///
/// Every field is optional; blank strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMember {
    pub member_number: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub password: Option<String>,
    /// Extra caller-defined attributes, stored verbatim.
    pub other: Map<String, Value>,
}

impl RawMember {
    /// Label used in error messages: the member number when given,
    /// otherwise `#` and the 1-based position within the batch.
    pub fn label(&self, index: usize) -> String {
        match present(&self.member_number) {
            Some(number) => number.to_string(),
            None => format!("#{}", index + 1),
        }
    }
}

/// A validated, canonicalized member ready for storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub member_number: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub national_id: Option<String>,
    /// Lowercased.
    pub email: Option<String>,
    /// E.164.
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Hex SHA-256 of salt and password. Never serialized.
    #[serde(skip_serializing, default)]
    pub hashed_password: Option<String>,
    #[serde(default)]
    pub other: Map<String, Value>,
}

/// Trimmed field value, or `None` for absent and blank fields.
pub(crate) fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
