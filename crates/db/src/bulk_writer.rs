// crates/db/src/bulk_writer.rs
//! Streams a batch of member records into the database.
//!
//! [`BulkWriter::start`] validates and upserts records on a background task
//! and reports a running tally on a bounded channel. Connections are taken
//! from the pool one chunk at a time. The final snapshot is
//! the only one with `progress == 100`; the sender is dropped right after it,
//! so channel closure and completion coincide.

use std::sync::Arc;

use rollcall_core::{normalize_member, RawMember, ValidationRules};
use rollcall_types::Progress;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::queries::upsert_member_conn;
use crate::{Database, DbResult};

/// Records processed between two intermediate snapshots.
pub const PROGRESS_CHUNK: usize = 10;

/// Buffered snapshots before the writer waits on a slow reader.
pub const CHANNEL_CAPACITY: usize = 32;

/// Producer side of an import: one call to [`start`](Self::start) per batch.
#[derive(Debug, Clone)]
pub struct BulkWriter {
    db: Database,
    rules: ValidationRules,
}

impl BulkWriter {
    pub fn new(db: Database, rules: ValidationRules) -> Self {
        Self { db, rules }
    }

    /// Begin writing `records` for `org_id`.
    ///
    /// Fails only when the database has been closed. Everything that goes
    /// wrong with an individual record ends up in that snapshot's `errors`
    /// instead.
    ///
    /// At most [`WRITER_SLOTS`](crate::WRITER_SLOTS) batches write at once;
    /// later ones wait for a slot on their own task, so this never blocks on
    /// another import.
    pub async fn start(
        &self,
        org_id: &str,
        records: Vec<RawMember>,
        salt: &[u8],
    ) -> DbResult<mpsc::Receiver<Progress>> {
        if self.db.pool().is_closed() {
            return Err(sqlx::Error::PoolClosed.into());
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(write_batch(
            self.db.clone(),
            self.db.writer_slots(),
            org_id.to_owned(),
            records,
            salt.to_vec(),
            self.rules.clone(),
            tx,
        ));

        Ok(rx)
    }
}

async fn write_batch(
    db: Database,
    slots: Arc<Semaphore>,
    org_id: String,
    records: Vec<RawMember>,
    salt: Vec<u8>,
    rules: ValidationRules,
    tx: mpsc::Sender<Progress>,
) {
    // The semaphore is never closed, so this only waits.
    let _slot = slots.acquire_owned().await.ok();

    let total = records.len();
    let mut tally = Progress {
        total: total as u64,
        ..Progress::default()
    };

    for (n, chunk) in records.chunks(PROGRESS_CHUNK).enumerate() {
        let offset = n * PROGRESS_CHUNK;
        write_chunk(&db, &org_id, offset, chunk, &salt, &rules, &mut tally).await;

        let processed = offset + chunk.len();
        if processed < total {
            tally.progress = Progress::intermediate_percent(processed as u64, total as u64);
            // A closed receiver only means nobody is watching; keep writing.
            let _ = tx.send(tally.clone()).await;
        }
    }

    tally.progress = 100;
    info!(
        org_id = %org_id,
        total,
        added = tally.added,
        errors = tally.errors.len(),
        "bulk write finished"
    );
    let _ = tx.send(tally).await;
}

/// Write one chunk on a single pooled connection, released before the
/// caller reports progress.
async fn write_chunk(
    db: &Database,
    org_id: &str,
    offset: usize,
    chunk: &[RawMember],
    salt: &[u8],
    rules: &ValidationRules,
    tally: &mut Progress,
) {
    let mut conn = match db.pool().acquire().await {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!(org_id, offset, error = %e, "no connection for chunk");
            None
        }
    };

    for (i, raw) in chunk.iter().enumerate() {
        let index = offset + i;
        let outcome = match normalize_member(index, raw, salt, rules) {
            Ok(member) => match conn.as_mut() {
                Some(conn) => upsert_member_conn(conn, org_id, &member)
                    .await
                    .map_err(|e| format!("member {}: {e}", raw.label(index))),
                None => Err(format!("member {}: storage unavailable", raw.label(index))),
            },
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(_) => tally.added += 1,
            Err(message) => {
                debug!(org_id, index, error = %message, "record rejected");
                tally.errors.push(message);
            }
        }
    }
}
