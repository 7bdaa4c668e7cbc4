// crates/db/src/queries/row_types.rs
// Internal row types and their conversions into domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::Member;
use rollcall_types::{Job, JobId, JobType};
use sqlx::Row;

use super::members::StoredMember;
use crate::{DbError, DbResult};

fn corrupt(table: &'static str, message: impl ToString) -> DbError {
    DbError::Corrupt {
        table,
        message: message.to_string(),
    }
}

fn parse_time(table: &'static str, raw: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp {raw:?}: {e}")))
}

// ============================================================================
// members
// ============================================================================

#[derive(Debug)]
pub(crate) struct MemberRow {
    id: i64,
    org_id: String,
    member_number: Option<String>,
    name: Option<String>,
    surname: Option<String>,
    national_id: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    birth_date: Option<String>,
    hashed_password: Option<String>,
    other: String,
    created_at: String,
    updated_at: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for MemberRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            org_id: row.try_get("org_id")?,
            member_number: row.try_get("member_number")?,
            name: row.try_get("name")?,
            surname: row.try_get("surname")?,
            national_id: row.try_get("national_id")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            birth_date: row.try_get("birth_date")?,
            hashed_password: row.try_get("hashed_password")?,
            other: row.try_get("other")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl MemberRow {
    pub(crate) fn into_stored_member(self) -> DbResult<StoredMember> {
        let birth_date = self
            .birth_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|e| corrupt("members", format!("bad birth_date {raw:?}: {e}")))
            })
            .transpose()?;
        let other = serde_json::from_str(&self.other).map_err(|e| corrupt("members", e))?;

        Ok(StoredMember {
            id: self.id,
            org_id: self.org_id,
            member: Member {
                member_number: self.member_number,
                name: self.name,
                surname: self.surname,
                national_id: self.national_id,
                email: self.email,
                phone: self.phone,
                birth_date,
                hashed_password: self.hashed_password,
                other,
            },
            created_at: parse_time("members", &self.created_at)?,
            updated_at: parse_time("members", &self.updated_at)?,
        })
    }
}

// ============================================================================
// jobs
// ============================================================================

#[derive(Debug)]
pub(crate) struct JobRow {
    job_id: String,
    job_type: String,
    org_id: String,
    total: i64,
    added: i64,
    errors: String,
    created_at: String,
    completed_at: Option<String>,
    completed: bool,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for JobRow {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            job_id: row.try_get("job_id")?,
            job_type: row.try_get("job_type")?,
            org_id: row.try_get("org_id")?,
            total: row.try_get("total")?,
            added: row.try_get("added")?,
            errors: row.try_get("errors")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
            completed: row.try_get("completed")?,
        })
    }
}

impl JobRow {
    pub(crate) fn into_job(self) -> DbResult<Job> {
        let job_id: JobId = self.job_id.parse().map_err(|e| corrupt("jobs", e))?;
        let job_type: JobType = self.job_type.parse().map_err(|e| corrupt("jobs", e))?;
        let errors: Vec<String> =
            serde_json::from_str(&self.errors).map_err(|e| corrupt("jobs", e))?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_time("jobs", raw))
            .transpose()?;

        Ok(Job {
            job_id,
            job_type,
            org_id: self.org_id,
            total: self.total.max(0) as u64,
            added: self.added.max(0) as u64,
            errors,
            created_at: parse_time("jobs", &self.created_at)?,
            completed_at,
            completed: self.completed,
        })
    }
}
