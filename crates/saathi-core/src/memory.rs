//! Per-user preference storage over a long-term Sled DB.

use crate::error::{CoreError, CoreResult};
use crate::shared::PreferenceRecord;
use sled::Db;
use std::path::Path;

/// Sled-backed store for `PreferenceRecord`s, keyed by `user_id`. Records
/// are stored as JSON documents; a single-key write is the only mutation,
/// so no locking is needed above this layer.
pub struct PreferenceStore {
    db: Db,
}

impl PreferenceStore {
    /// Opens or creates the preference database at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Retrieves the record for `user_id`. An unknown user yields an empty
    /// default record; only a store failure is an error.
    pub fn get(&self, user_id: &str) -> CoreResult<PreferenceRecord> {
        match self.db.get(user_id.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                CoreError::StoreUnavailable(format!("stored record for {user_id} is unreadable: {e}"))
            }),
            None => Ok(PreferenceRecord::empty(user_id)),
        }
    }

    /// Persists the full record, replacing any existing record for the same
    /// `user_id`. Whole-document write; last write wins.
    pub fn upsert(&self, record: &PreferenceRecord) -> CoreResult<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| CoreError::StoreUnavailable(format!("record encode failed: {e}")))?;
        self.db.insert(record.user_id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Flushes pending writes to disk. Called on shutdown.
    pub fn flush(&self) -> CoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
