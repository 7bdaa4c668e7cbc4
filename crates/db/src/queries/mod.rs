// crates/db/src/queries/mod.rs
// Member and job CRUD operations for the rollcall SQLite database.

pub(crate) mod row_types;
pub mod jobs;
pub mod members;

pub(crate) use members::upsert_member_conn;

/// Timestamp format used for every TEXT time column. Fixed-width UTC so
/// lexical order matches chronological order.
pub(crate) fn to_db_time(t: chrono::DateTime<chrono::Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
