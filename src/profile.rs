use crate::db;
use crate::error::{GradebookError, Result};
use crate::store::{RecordStore, StorageSlot, TEACHER_DATA_PREFIX};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const CURRENT_TEACHER_KEY: &str = "current_teacher";
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// A local teacher identity. Not an authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "email")]
    pub email_key: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "school")]
    pub school_name: String,
    #[serde(rename = "loginDate")]
    pub login_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub school: String,
}

impl LoginForm {
    /// Field presence, then password length, then email shape. The password
    /// is only length-checked and never stored.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("email", &self.email),
            ("password", &self.password),
            ("name", &self.name),
            ("school", &self.school),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(GradebookError::validation(*field, "Please fill all fields"));
        }
        if self.password.trim().chars().count() < MIN_PASSWORD_LEN {
            return Err(GradebookError::validation(
                "password",
                "Password must be at least 6 characters",
            ));
        }
        if !is_valid_email(self.email.trim()) {
            return Err(GradebookError::validation(
                "email",
                "Please enter a valid email address",
            ));
        }
        Ok(())
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Active-profile pointer plus the record store it selects.
///
/// With nobody logged in the store is the legacy global slot.
#[derive(Debug)]
pub struct ProfileStore {
    active: Option<Profile>,
    records: RecordStore,
    last_activity: DateTime<Utc>,
}

impl ProfileStore {
    /// Restores a persisted `current_teacher`, if any.
    pub fn open(conn: &Connection, now: DateTime<Utc>) -> Result<Self> {
        let active: Option<Profile> = db::kv_get_json(conn, CURRENT_TEACHER_KEY)?;
        let slot = match &active {
            Some(p) => StorageSlot::Profile(p.email_key.clone()),
            None => StorageSlot::Legacy,
        };
        let records = RecordStore::load(conn, slot)?;
        if let Some(p) = &active {
            info!(email = %p.email_key, "restored active profile");
        }
        Ok(Self {
            active,
            records,
            last_activity: now,
        })
    }

    /// Returns the profile and whether its record store was newly created.
    pub fn login(
        &mut self,
        conn: &Connection,
        form: &LoginForm,
        now: DateTime<Utc>,
    ) -> Result<(Profile, bool)> {
        form.validate()?;
        if self.active.is_some() {
            self.logout(conn)?;
        }

        let profile = Profile {
            email_key: form.email.trim().to_string(),
            display_name: form.name.trim().to_string(),
            school_name: form.school.trim().to_string(),
            login_timestamp: now,
        };
        let (records, created) =
            RecordStore::open_or_create(conn, StorageSlot::Profile(profile.email_key.clone()))?;
        db::kv_set_json(conn, CURRENT_TEACHER_KEY, &profile)?;

        info!(
            email = %profile.email_key,
            created,
            assessments = records.len(),
            "teacher logged in"
        );
        self.active = Some(profile.clone());
        self.records = records;
        self.last_activity = now;
        Ok((profile, created))
    }

    /// Flushes the active store, then clears the active profile. Returns the
    /// profile that was logged out.
    pub fn logout(&mut self, conn: &Connection) -> Result<Option<Profile>> {
        if self.active.is_none() {
            return Ok(None);
        }
        self.records.flush(conn)?;
        let legacy = RecordStore::load(conn, StorageSlot::Legacy)?;
        db::kv_remove(conn, CURRENT_TEACHER_KEY)?;

        self.records = legacy;
        let profile = self.active.take();
        if let Some(p) = &profile {
            info!(email = %p.email_key, "teacher logged out");
        }
        Ok(profile)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn is_idle(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        self.active.is_some() && now - self.last_activity >= timeout
    }

    /// Logs the active profile out once the inactivity window has elapsed.
    pub fn expire_if_idle(
        &mut self,
        conn: &Connection,
        now: DateTime<Utc>,
        timeout: chrono::Duration,
    ) -> Result<Option<Profile>> {
        if !self.is_idle(now, timeout) {
            return Ok(None);
        }
        let idle_secs = (now - self.last_activity).num_seconds();
        let expired = self.logout(conn)?;
        if let Some(p) = &expired {
            info!(email = %p.email_key, idle_secs, "session expired");
        }
        Ok(expired)
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active.as_ref()
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut RecordStore {
        &mut self.records
    }

    /// Emails of every profile with stored data.
    pub fn list_profiles(conn: &Connection) -> Result<Vec<String>> {
        Ok(db::kv_keys_with_prefix(conn, TEACHER_DATA_PREFIX)?
            .into_iter()
            .filter_map(|k| k.strip_prefix(TEACHER_DATA_PREFIX).map(str::to_string))
            .collect())
    }

    pub fn delete_profile_data(&self, conn: &Connection, email: &str) -> Result<()> {
        if self.active.as_ref().map(|p| p.email_key == email).unwrap_or(false) {
            return Err(GradebookError::validation(
                "email",
                "log out before deleting this profile's data",
            ));
        }
        let key = StorageSlot::Profile(email.to_string()).key();
        if !db::kv_remove(conn, &key)? {
            return Err(GradebookError::not_found("profile", email));
        }
        info!(email, "profile data deleted");
        Ok(())
    }
}
