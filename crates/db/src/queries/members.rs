//! Member upserts and lookups.

use chrono::{DateTime, Utc};
use rollcall_core::Member;
use serde::Serialize;
use sqlx::SqliteConnection;

use super::row_types::MemberRow;
use super::to_db_time;
use crate::{Database, DbError, DbResult};

/// A member as persisted for one organization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMember {
    pub id: i64,
    pub org_id: String,
    #[serde(flatten)]
    pub member: Member,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a member upsert, carrying the row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberUpsert {
    Inserted(i64),
    Updated(i64),
}

impl MemberUpsert {
    pub fn id(&self) -> i64 {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

impl Database {
    /// Insert or update one member of `org_id`.
    ///
    /// The member is matched against stored members by member number, email
    /// and national id. Matching two different stored members is refused
    /// with [`DbError::WouldCreateDuplicates`].
    pub async fn upsert_member(&self, org_id: &str, member: &Member) -> DbResult<MemberUpsert> {
        let mut conn = self.pool().acquire().await?;
        upsert_member_conn(&mut conn, org_id, member).await
    }

    /// Fetch one member by row id, scoped to its organization.
    pub async fn get_member(&self, org_id: &str, id: i64) -> DbResult<Option<StoredMember>> {
        let row: Option<MemberRow> =
            sqlx::query_as("SELECT * FROM members WHERE org_id = ?1 AND id = ?2")
                .bind(org_id)
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        row.map(MemberRow::into_stored_member).transpose()
    }

    /// All members of an organization, oldest first.
    pub async fn list_members(&self, org_id: &str) -> DbResult<Vec<StoredMember>> {
        let rows: Vec<MemberRow> =
            sqlx::query_as("SELECT * FROM members WHERE org_id = ?1 ORDER BY id")
                .bind(org_id)
                .fetch_all(self.pool())
                .await?;
        rows.into_iter().map(MemberRow::into_stored_member).collect()
    }
}

/// Upsert on a caller-held connection. The bulk writer reuses one connection
/// per chunk of records.
pub(crate) async fn upsert_member_conn(
    conn: &mut SqliteConnection,
    org_id: &str,
    member: &Member,
) -> DbResult<MemberUpsert> {
    let matches: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM members
        WHERE org_id = ?1
          AND (member_number = ?2 OR email = ?3 OR national_id = ?4)
        LIMIT 2
        "#,
    )
    .bind(org_id)
    .bind(member.member_number.as_deref())
    .bind(member.email.as_deref())
    .bind(member.national_id.as_deref())
    .fetch_all(&mut *conn)
    .await?;

    let now = to_db_time(Utc::now());
    let birth_date = member.birth_date.map(|d| d.format("%Y-%m-%d").to_string());
    let other = serde_json::to_string(&member.other).map_err(|e| DbError::Corrupt {
        table: "members",
        message: e.to_string(),
    })?;

    match matches.as_slice() {
        [] => {
            let row: (i64,) = sqlx::query_as(
                r#"
                INSERT INTO members (
                    org_id, member_number, name, surname, national_id, email, phone,
                    birth_date, hashed_password, other, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
                RETURNING id
                "#,
            )
            .bind(org_id)
            .bind(member.member_number.as_deref())
            .bind(member.name.as_deref())
            .bind(member.surname.as_deref())
            .bind(member.national_id.as_deref())
            .bind(member.email.as_deref())
            .bind(member.phone.as_deref())
            .bind(birth_date.as_deref())
            .bind(member.hashed_password.as_deref())
            .bind(&other)
            .bind(&now)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| unique_violation_as_conflict(e, member))?;
            Ok(MemberUpsert::Inserted(row.0))
        }
        [(id,)] => {
            sqlx::query(
                r#"
                UPDATE members SET
                    member_number   = COALESCE(?2, member_number),
                    name            = COALESCE(?3, name),
                    surname         = COALESCE(?4, surname),
                    national_id     = COALESCE(?5, national_id),
                    email           = COALESCE(?6, email),
                    phone           = COALESCE(?7, phone),
                    birth_date      = COALESCE(?8, birth_date),
                    hashed_password = COALESCE(?9, hashed_password),
                    other           = CASE WHEN ?10 = '{}' THEN other ELSE ?10 END,
                    updated_at      = ?11
                WHERE id = ?1
                "#,
            )
            .bind(id)
            .bind(member.member_number.as_deref())
            .bind(member.name.as_deref())
            .bind(member.surname.as_deref())
            .bind(member.national_id.as_deref())
            .bind(member.email.as_deref())
            .bind(member.phone.as_deref())
            .bind(birth_date.as_deref())
            .bind(member.hashed_password.as_deref())
            .bind(&other)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(|e| unique_violation_as_conflict(e, member))?;
            Ok(MemberUpsert::Updated(*id))
        }
        _ => Err(DbError::WouldCreateDuplicates(identifiers(member))),
    }
}

fn unique_violation_as_conflict(err: sqlx::Error, member: &Member) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return DbError::Conflict(identifiers(member));
        }
    }
    DbError::Sqlx(err)
}

/// Human-readable list of the identifiers a member was matched on.
fn identifiers(member: &Member) -> String {
    [
        ("member number", member.member_number.as_deref()),
        ("email", member.email.as_deref()),
        ("national id", member.national_id.as_deref()),
    ]
    .iter()
    .filter_map(|(name, value)| value.map(|v| format!("{name} \"{v}\"")))
    .collect::<Vec<_>>()
    .join(", ")
}
