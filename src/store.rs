use crate::config::ProfileSettings;
use crate::db;
use crate::error::{GradebookError, Result};
use crate::record::{AssessmentRecord, RecordInput};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use tracing::debug;

pub const TEACHER_DATA_PREFIX: &str = "teacher_data_";
pub const LEGACY_ASSESSMENTS_KEY: &str = "teacher_assessments";

/// Where a record store is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSlot {
    Profile(String),
    /// Flat record list used while nobody is logged in.
    Legacy,
}

impl StorageSlot {
    pub fn key(&self) -> String {
        match self {
            StorageSlot::Profile(email) => format!("{TEACHER_DATA_PREFIX}{email}"),
            StorageSlot::Legacy => LEGACY_ASSESSMENTS_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeacherData {
    #[serde(default)]
    assessments: Vec<AssessmentRecord>,
    #[serde(default)]
    settings: ProfileSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_saved: Option<DateTime<Utc>>,
}

/// Ordered assessment records for one slot.
///
/// Every successful mutation is flushed before it returns. A failed flush
/// rolls the in-memory change back, so memory and storage never disagree.
#[derive(Debug, Clone)]
pub struct RecordStore {
    slot: StorageSlot,
    records: Vec<AssessmentRecord>,
    settings: ProfileSettings,
    last_saved: Option<DateTime<Utc>>,
    high_water_id: i64,
}

impl RecordStore {
    fn from_parts(
        slot: StorageSlot,
        records: Vec<AssessmentRecord>,
        settings: ProfileSettings,
        last_saved: Option<DateTime<Utc>>,
    ) -> Self {
        let high_water_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            slot,
            records,
            settings,
            last_saved,
            high_water_id,
        }
    }

    /// Loads the slot; a slot with nothing stored yields an empty store.
    pub fn load(conn: &Connection, slot: StorageSlot) -> Result<Self> {
        let key = slot.key();
        let store = if slot == StorageSlot::Legacy {
            let records: Vec<AssessmentRecord> = db::kv_get_json(conn, &key)?.unwrap_or_default();
            Self::from_parts(slot, records, ProfileSettings::default(), None)
        } else {
            let data: TeacherData = db::kv_get_json(conn, &key)?.unwrap_or_default();
            Self::from_parts(slot, data.assessments, data.settings, data.last_saved)
        };
        debug!(key = %key, count = store.records.len(), "record store loaded");
        Ok(store)
    }

    /// Loads the slot, persisting an empty envelope first if none exists.
    pub fn open_or_create(conn: &Connection, slot: StorageSlot) -> Result<(Self, bool)> {
        if db::kv_exists(conn, &slot.key())? {
            return Ok((Self::load(conn, slot)?, false));
        }
        let mut store = Self::from_parts(slot, Vec::new(), ProfileSettings::default(), None);
        store.flush(conn)?;
        Ok((store, true))
    }

    pub fn flush(&mut self, conn: &Connection) -> Result<()> {
        let key = self.slot.key();
        match &self.slot {
            StorageSlot::Profile(_) => {
                let saved_at = Utc::now();
                let data = TeacherData {
                    assessments: self.records.clone(),
                    settings: self.settings.clone(),
                    last_saved: Some(saved_at),
                };
                db::kv_set_json(conn, &key, &data)?;
                self.last_saved = Some(saved_at);
            }
            StorageSlot::Legacy => db::kv_set_json(conn, &key, &self.records)?,
        }
        debug!(key = %key, count = self.records.len(), "record store flushed");
        Ok(())
    }

    #[cfg(test)]
    pub fn slot(&self) -> &StorageSlot {
        &self.slot
    }

    pub fn settings(&self) -> &ProfileSettings {
        &self.settings
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Creation timestamp in milliseconds, bumped past every id issued so far.
    pub fn next_id(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp_millis().max(self.high_water_id + 1)
    }

    pub fn add(&mut self, conn: &Connection, record: AssessmentRecord) -> Result<()> {
        if self.position(record.id).is_some() {
            return Err(GradebookError::validation(
                "id",
                format!("assessment id {} already exists", record.id),
            ));
        }
        let id = record.id;
        self.records.push(record);
        if let Err(e) = self.flush(conn) {
            self.records.pop();
            return Err(e);
        }
        self.high_water_id = self.high_water_id.max(id);
        debug!(id, "assessment added");
        Ok(())
    }

    /// Builds a record from form input and adds it.
    pub fn create(
        &mut self,
        conn: &Connection,
        input: &RecordInput,
        now: DateTime<Utc>,
    ) -> Result<AssessmentRecord> {
        let record =
            AssessmentRecord::build(self.next_id(now), input, &self.settings.grade_scale, now)?;
        self.add(conn, record.clone())?;
        Ok(record)
    }

    /// Replaces the record with the same id. Creation time and position are
    /// kept from the stored record.
    pub fn update(
        &mut self,
        conn: &Connection,
        mut record: AssessmentRecord,
    ) -> Result<AssessmentRecord> {
        let idx = self
            .position(record.id)
            .ok_or_else(|| GradebookError::not_found("assessment", record.id))?;
        record.created_at = self.records[idx].created_at;
        let previous = std::mem::replace(&mut self.records[idx], record.clone());
        if let Err(e) = self.flush(conn) {
            self.records[idx] = previous;
            return Err(e);
        }
        debug!(id = record.id, "assessment updated");
        Ok(record)
    }

    /// Rebuilds an existing record from form input.
    pub fn edit(
        &mut self,
        conn: &Connection,
        id: i64,
        input: &RecordInput,
    ) -> Result<AssessmentRecord> {
        let created_at = self
            .get(id)
            .map(|r| r.created_at)
            .ok_or_else(|| GradebookError::not_found("assessment", id))?;
        let record = AssessmentRecord::build(id, input, &self.settings.grade_scale, created_at)?;
        self.update(conn, record)
    }

    pub fn delete(&mut self, conn: &Connection, id: i64) -> Result<AssessmentRecord> {
        let idx = self
            .position(id)
            .ok_or_else(|| GradebookError::not_found("assessment", id))?;
        let removed = self.records.remove(idx);
        if let Err(e) = self.flush(conn) {
            self.records.insert(idx, removed);
            return Err(e);
        }
        debug!(id, "assessment deleted");
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Option<&AssessmentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insertion order.
    pub fn list_all(&self) -> &[AssessmentRecord] {
        &self.records
    }

    pub fn list_recent(&self, n: usize) -> Vec<&AssessmentRecord> {
        newest_first(&self.records).into_iter().take(n).collect()
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

/// The one newest-first ordering: creation time descending, then id
/// descending. Used by the recent list and by reports.
pub fn newest_first(records: &[AssessmentRecord]) -> Vec<&AssessmentRecord> {
    let mut out: Vec<&AssessmentRecord> = records.iter().collect();
    out.sort_by_key(|r| Reverse((r.created_at, r.id)));
    out
}
