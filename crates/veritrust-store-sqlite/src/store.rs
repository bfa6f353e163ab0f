// crates/veritrust-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Trust Store
// Description: Durable TrustStore backed by SQLite WAL.
// Purpose: Persist actors, samples, requests, alerts, and webhook messages.
// Dependencies: veritrust-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements every persistence trait of the platform over a
//! single `SQLite` database. Connection access is serialized through a
//! mutex; contested transitions such as the model lock claim and the
//! summary gate run inside one transaction and are therefore atomic.
//! Decoding fails closed: a stored code or JSON column that does not parse
//! is corruption, never a silent default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use veritrust_core::Alert;
use veritrust_core::AlertLevel;
use veritrust_core::AlertStatus;
use veritrust_core::EnrolmentModel;
use veritrust_core::EnrolmentSample;
use veritrust_core::RequestProviderResult;
use veritrust_core::RequestResult;
use veritrust_core::RequestStatus;
use veritrust_core::ResultCode;
use veritrust_core::ResultStatus;
use veritrust_core::SampleStatus;
use veritrust_core::SampleValidation;
use veritrust_core::Timestamp;
use veritrust_core::ValidationStatus;
use veritrust_core::WebhookClient;
use veritrust_core::WebhookMessage;
use veritrust_core::WebhookStatus;
use veritrust_core::core::CourseRecord;
use veritrust_core::core::InstrumentRecord;
use veritrust_core::core::LearnerRecord;
use veritrust_core::core::ProviderRecord;
use veritrust_core::core::UserRecord;
use veritrust_core::core::VleRecord;
use veritrust_core::core::identifiers::ActivityId;
use veritrust_core::core::identifiers::AlertId;
use veritrust_core::core::identifiers::CourseId;
use veritrust_core::core::identifiers::InstitutionId;
use veritrust_core::core::identifiers::InstrumentId;
use veritrust_core::core::identifiers::LearnerId;
use veritrust_core::core::identifiers::ProviderId;
use veritrust_core::core::identifiers::QueueName;
use veritrust_core::core::identifiers::RequestId;
use veritrust_core::core::identifiers::SampleId;
use veritrust_core::core::identifiers::SubjectId;
use veritrust_core::core::identifiers::TaskId;
use veritrust_core::core::identifiers::UserId;
use veritrust_core::core::identifiers::ValidationId;
use veritrust_core::core::identifiers::VleId;
use veritrust_core::core::identifiers::WebhookClientId;
use veritrust_core::core::identifiers::WebhookMessageId;
use veritrust_core::core::verification::VerificationRequest;
use veritrust_core::interfaces::AlertStore;
use veritrust_core::interfaces::CatalogStore;
use veritrust_core::interfaces::EnrolmentStore;
use veritrust_core::interfaces::IdentityStore;
use veritrust_core::interfaces::NewAlert;
use veritrust_core::interfaces::NewRequest;
use veritrust_core::interfaces::NewSample;
use veritrust_core::interfaces::NewValidation;
use veritrust_core::interfaces::NewWebhookMessage;
use veritrust_core::interfaces::StoreError;
use veritrust_core::interfaces::VerificationStore;
use veritrust_core::interfaces::WebhookStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` trust store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a configuration with defaults for the given database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Store(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed trust store with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex; contested writes run
///   inside one transaction.
/// - Stored enum codes and JSON columns are decoded fail-closed.
#[derive(Clone)]
pub struct SqliteTrustStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTrustStore {
    /// Opens (or creates) the database and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or the stored schema version is unsupported.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_path(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the connection, failing closed on a poisoned mutex.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Store("connection mutex poisoned".to_owned()))
    }

    // ------------------------------------------------------------------
    // Seed methods used by deployment provisioning and tests.
    // ------------------------------------------------------------------

    /// Inserts or replaces a learner record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_learner(&self, learner: &LearnerRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO learners (id, institution_id, subject, consent, active)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    to_i64(learner.id.get())?,
                    to_i64(learner.institution_id.get())?,
                    learner.subject.as_str(),
                    to_json(&learner.consent)?,
                    learner.active,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces a user record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let institution = user
            .institution_id
            .map(|id| to_i64(id.get()))
            .transpose()?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO users
                     (id, institution_id, uid, roles, global_admin, active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    to_i64(user.id.get())?,
                    institution,
                    user.uid.as_str(),
                    to_json(&user.roles)?,
                    user.global_admin,
                    user.active,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces a VLE record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_vle(&self, vle: &VleRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO vles (id, institution_id, name, active)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_i64(vle.id.get())?,
                    to_i64(vle.institution_id.get())?,
                    vle.name,
                    vle.active,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces a provider record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_provider(&self, provider: &ProviderRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO providers
                     (id, instrument_id, acronym, queue, enabled, allow_validation,
                      validation_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    to_i64(provider.id.get())?,
                    to_i64(provider.instrument_id.get())?,
                    provider.acronym,
                    provider.queue.as_str(),
                    provider.enabled,
                    provider.allow_validation,
                    provider.validation_active,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces an instrument record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_instrument(&self, instrument: &InstrumentRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO instruments (id, name, requires_enrolment, enabled)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_i64(instrument.id.get())?,
                    instrument.name,
                    instrument.requires_enrolment,
                    instrument.enabled,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces a course record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_course(&self, course: &CourseRecord) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO courses (id, institution_id, instructors, learners)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    to_i64(course.id.get())?,
                    to_i64(course.institution_id.get())?,
                    to_json(&course.instructors)?,
                    to_json(&course.learners)?,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Inserts or replaces a webhook client record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    pub fn upsert_webhook_client(&self, client: &WebhookClient) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO webhook_clients
                     (id, name, header, id_header, secret, handler, enabled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    to_i64(client.id.get())?,
                    client.name,
                    client.header,
                    client.id_header,
                    client.secret,
                    client.handler,
                    client.enabled,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Loads the instrument set attached to a sample.
    fn sample_instruments(
        connection: &Connection,
        sample_id: i64,
    ) -> Result<BTreeSet<InstrumentId>, StoreError> {
        let mut statement = connection
            .prepare(
                "SELECT instrument_id FROM sample_instruments
                 WHERE sample_id = ?1 ORDER BY instrument_id",
            )
            .map_err(db_err)?;
        let raw: Vec<i64> = statement
            .query_map(params![sample_id], |row| row.get(0))
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        raw.into_iter()
            .map(|value| id_from(value, InstrumentId::from_raw, "instrument"))
            .collect()
    }

    /// Loads the instrument set attached to a request.
    fn request_instruments(
        connection: &Connection,
        request_id: i64,
    ) -> Result<BTreeSet<InstrumentId>, StoreError> {
        let mut statement = connection
            .prepare(
                "SELECT instrument_id FROM request_instruments
                 WHERE request_id = ?1 ORDER BY instrument_id",
            )
            .map_err(db_err)?;
        let raw: Vec<i64> = statement
            .query_map(params![request_id], |row| row.get(0))
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        raw.into_iter()
            .map(|value| id_from(value, InstrumentId::from_raw, "instrument"))
            .collect()
    }

    /// Loads the instrument set attached to an alert.
    fn alert_instruments(
        connection: &Connection,
        alert_id: i64,
    ) -> Result<BTreeSet<InstrumentId>, StoreError> {
        let mut statement = connection
            .prepare(
                "SELECT instrument_id FROM alert_instruments
                 WHERE alert_id = ?1 ORDER BY instrument_id",
            )
            .map_err(db_err)?;
        let raw: Vec<i64> = statement
            .query_map(params![alert_id], |row| row.get(0))
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        raw.into_iter()
            .map(|value| id_from(value, InstrumentId::from_raw, "instrument"))
            .collect()
    }

    /// Replaces an attachment table's rows with the known subset.
    fn replace_instruments(
        tx: &Transaction<'_>,
        table: &str,
        owner_column: &str,
        owner: i64,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        tx.execute(
            &format!("DELETE FROM {table} WHERE {owner_column} = ?1"),
            params![owner],
        )
        .map_err(db_err)?;
        let mut attached = 0;
        for instrument in instruments {
            let known: Option<i64> = tx
                .query_row(
                    "SELECT id FROM instruments WHERE id = ?1",
                    params![to_i64(instrument.get())?],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            if let Some(id) = known {
                tx.execute(
                    &format!(
                        "INSERT OR IGNORE INTO {table} ({owner_column}, instrument_id)
                         VALUES (?1, ?2)"
                    ),
                    params![owner, id],
                )
                .map_err(db_err)?;
                attached += 1;
            }
        }
        Ok(attached)
    }
}

// ============================================================================
// SECTION: Identity Store
// ============================================================================

impl IdentityStore for SqliteTrustStore {
    fn learner(&self, id: LearnerId) -> Result<Option<LearnerRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, String, String, bool)> = connection
            .query_row(
                "SELECT id, institution_id, subject, consent, active
                 FROM learners WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(learner_from_row).transpose()
    }

    fn learner_by_subject(&self, subject: &SubjectId) -> Result<Option<LearnerRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, String, String, bool)> = connection
            .query_row(
                "SELECT id, institution_id, subject, consent, active
                 FROM learners WHERE subject = ?1",
                params![subject.as_str()],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(learner_from_row).transpose()
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, Option<i64>, String, String, bool, bool)> = connection
            .query_row(
                "SELECT id, institution_id, uid, roles, global_admin, active
                 FROM users WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(user_from_row).transpose()
    }

    fn user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, Option<i64>, String, String, bool, bool)> = connection
            .query_row(
                "SELECT id, institution_id, uid, roles, global_admin, active
                 FROM users WHERE uid = ?1",
                params![uid],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(user_from_row).transpose()
    }

    fn vle(&self, id: VleId) -> Result<Option<VleRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, String, bool)> = connection
            .query_row(
                "SELECT id, institution_id, name, active FROM vles WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(id, institution, name, active)| {
            Ok(VleRecord {
                id: id_from(id, VleId::from_raw, "vle")?,
                institution_id: id_from(institution, InstitutionId::from_raw, "institution")?,
                name,
                active,
            })
        })
        .transpose()
    }
}

// ============================================================================
// SECTION: Catalog Store
// ============================================================================

/// Raw provider row tuple.
type ProviderRow = (i64, i64, String, String, bool, bool, bool);

/// Converts a provider row into its record.
fn provider_from_row(row: ProviderRow) -> Result<ProviderRecord, StoreError> {
    let (id, instrument, acronym, queue, enabled, allow_validation, validation_active) = row;
    Ok(ProviderRecord {
        id: id_from(id, ProviderId::from_raw, "provider")?,
        instrument_id: id_from(instrument, InstrumentId::from_raw, "instrument")?,
        acronym,
        queue: QueueName::from(queue),
        enabled,
        allow_validation,
        validation_active,
    })
}

impl CatalogStore for SqliteTrustStore {
    fn instrument(&self, id: InstrumentId) -> Result<Option<InstrumentRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, String, bool, bool)> = connection
            .query_row(
                "SELECT id, name, requires_enrolment, enabled FROM instruments WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(id, name, requires_enrolment, enabled)| {
            Ok(InstrumentRecord {
                id: id_from(id, InstrumentId::from_raw, "instrument")?,
                name,
                requires_enrolment,
                enabled,
            })
        })
        .transpose()
    }

    fn provider(&self, id: ProviderId) -> Result<Option<ProviderRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<ProviderRow> = connection
            .query_row(
                "SELECT id, instrument_id, acronym, queue, enabled, allow_validation,
                        validation_active
                 FROM providers WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(provider_from_row).transpose()
    }

    fn provider_by_acronym(&self, acronym: &str) -> Result<Option<ProviderRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<ProviderRow> = connection
            .query_row(
                "SELECT id, instrument_id, acronym, queue, enabled, allow_validation,
                        validation_active
                 FROM providers WHERE acronym = ?1",
                params![acronym],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(provider_from_row).transpose()
    }

    fn providers_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT id, instrument_id, acronym, queue, enabled, allow_validation,
                        validation_active
                 FROM providers WHERE instrument_id = ?1 AND enabled = 1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows: Vec<ProviderRow> = statement
            .query_map(params![to_i64(id.get())?], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(provider_from_row).collect()
    }

    fn validators_for_instrument(
        &self,
        id: InstrumentId,
    ) -> Result<Vec<ProviderRecord>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT id, instrument_id, acronym, queue, enabled, allow_validation,
                        validation_active
                 FROM providers
                 WHERE instrument_id = ?1 AND enabled = 1
                   AND allow_validation = 1 AND validation_active = 1
                 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows: Vec<ProviderRow> = statement
            .query_map(params![to_i64(id.get())?], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(provider_from_row).collect()
    }

    fn course(&self, id: CourseId) -> Result<Option<CourseRecord>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, String, String)> = connection
            .query_row(
                "SELECT id, institution_id, instructors, learners FROM courses WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(id, institution, instructors, learners)| {
            Ok(CourseRecord {
                id: id_from(id, CourseId::from_raw, "course")?,
                institution_id: id_from(institution, InstitutionId::from_raw, "institution")?,
                instructors: from_json(&instructors, "course instructors")?,
                learners: from_json(&learners, "course learners")?,
            })
        })
        .transpose()
    }
}

// ============================================================================
// SECTION: Enrolment Store
// ============================================================================

impl EnrolmentStore for SqliteTrustStore {
    fn insert_sample(&self, sample: &NewSample) -> Result<SampleId, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO samples (learner_id, data_path, status, error_message)
             VALUES (?1, ?2, ?3, NULL)",
            params![
                to_i64(sample.learner_id.get())?,
                sample.data_path,
                i64::from(SampleStatus::Stored.code()),
            ],
        )
        .map_err(db_err)?;
        let sample_row = tx.last_insert_rowid();
        // The requested set is stored as-is; attachment later replaces it
        // with the known subset.
        for instrument in &sample.instruments {
            tx.execute(
                "INSERT OR IGNORE INTO sample_instruments (sample_id, instrument_id)
                 VALUES (?1, ?2)",
                params![sample_row, to_i64(instrument.get())?],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        id_from(sample_row, SampleId::from_raw, "sample")
    }

    fn sample(&self, id: SampleId) -> Result<Option<EnrolmentSample>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, String, i64, Option<String>)> = connection
            .query_row(
                "SELECT id, learner_id, data_path, status, error_message
                 FROM samples WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(sample_row, learner, data_path, status, error_message)| {
            Ok(EnrolmentSample {
                id: id_from(sample_row, SampleId::from_raw, "sample")?,
                learner_id: id_from(learner, LearnerId::from_raw, "learner")?,
                data_path,
                instruments: Self::sample_instruments(&connection, sample_row)?,
                status: code_from(status, SampleStatus::from_code, "sample status")?,
                error_message,
            })
        })
        .transpose()
    }

    fn attach_sample_instruments(
        &self,
        id: SampleId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        let attached = Self::replace_instruments(
            &tx,
            "sample_instruments",
            "sample_id",
            to_i64(id.get())?,
            instruments,
        )?;
        tx.commit().map_err(db_err)?;
        Ok(attached)
    }

    fn set_sample_status(
        &self,
        id: SampleId,
        status: SampleStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE samples SET status = ?2, error_message = ?3 WHERE id = ?1",
                params![to_i64(id.get())?, i64::from(status.code()), error_message],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("sample {id}")));
        }
        Ok(())
    }

    fn insert_validation(&self, validation: &NewValidation) -> Result<ValidationId, StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO validations
                     (sample_id, provider_id, status, contribution, info_path, error_message)
                 VALUES (?1, ?2, ?3, NULL, NULL, NULL)",
                params![
                    to_i64(validation.sample_id.get())?,
                    to_i64(validation.provider_id.get())?,
                    i64::from(ValidationStatus::Pending.code()),
                ],
            )
            .map_err(db_err)?;
        id_from(connection.last_insert_rowid(), ValidationId::from_raw, "validation")
    }

    fn validation(&self, id: ValidationId) -> Result<Option<SampleValidation>, StoreError> {
        let connection = self.lock()?;
        let row: Option<ValidationRow> = connection
            .query_row(
                "SELECT id, sample_id, provider_id, status, contribution, info_path,
                        error_message
                 FROM validations WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(validation_from_row).transpose()
    }

    fn validations_for_sample(&self, id: SampleId) -> Result<Vec<SampleValidation>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT id, sample_id, provider_id, status, contribution, info_path,
                        error_message
                 FROM validations WHERE sample_id = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows: Vec<ValidationRow> = statement
            .query_map(params![to_i64(id.get())?], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(validation_from_row).collect()
    }

    fn record_validation(
        &self,
        id: ValidationId,
        status: ValidationStatus,
        contribution: Option<f64>,
        info_path: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE validations
                 SET status = ?2, contribution = ?3, info_path = ?4, error_message = ?5
                 WHERE id = ?1",
                params![
                    to_i64(id.get())?,
                    i64::from(status.code()),
                    contribution,
                    info_path,
                    error_message,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("validation {id}")));
        }
        Ok(())
    }

    fn model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
    ) -> Result<Option<EnrolmentModel>, StoreError> {
        let connection = self.lock()?;
        load_model(&connection, to_i64(learner_id.get())?, to_i64(provider_id.get())?)
    }

    fn claim_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
        now: Timestamp,
        max_age_seconds: i64,
    ) -> Result<EnrolmentModel, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        let learner_key = to_i64(learner_id.get())?;
        let provider_key = to_i64(provider_id.get())?;
        let existing = load_model(&tx, learner_key, provider_key)?;
        let mut model = match existing {
            Some(model) => model,
            None => {
                tx.execute(
                    "INSERT INTO models
                         (learner_id, provider_id, percentage, can_analyse, locked_by,
                          locked_at, model_path, used_samples)
                     VALUES (?1, ?2, 0.0, 0, NULL, NULL, NULL, '[]')",
                    params![learner_key, provider_key],
                )
                .map_err(db_err)?;
                EnrolmentModel {
                    learner_id,
                    provider_id,
                    percentage: 0.0,
                    can_analyse: false,
                    locked_by: None,
                    locked_at: None,
                    model_path: None,
                    used_samples: BTreeSet::new(),
                }
            }
        };
        let claimable = match (&model.locked_by, model.locked_at) {
            (None, _) | (_, None) => true,
            (Some(holder), Some(locked_at)) => {
                holder == task || locked_at.is_older_than(now, max_age_seconds)
            }
        };
        if !claimable {
            return Err(StoreError::Conflict(format!(
                "model {learner_id}/{provider_id} is locked"
            )));
        }
        tx.execute(
            "UPDATE models SET locked_by = ?3, locked_at = ?4
             WHERE learner_id = ?1 AND provider_id = ?2",
            params![learner_key, provider_key, task.as_str(), now.unix_seconds()],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        model.locked_by = Some(task.clone());
        model.locked_at = Some(now);
        Ok(model)
    }

    fn save_model(&self, model: &EnrolmentModel) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE models
                 SET percentage = ?3, can_analyse = ?4, model_path = ?5, used_samples = ?6
                 WHERE learner_id = ?1 AND provider_id = ?2",
                params![
                    to_i64(model.learner_id.get())?,
                    to_i64(model.provider_id.get())?,
                    model.percentage,
                    model.can_analyse,
                    model.model_path,
                    to_json(&model.used_samples)?,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "model {}/{}",
                model.learner_id, model.provider_id
            )));
        }
        Ok(())
    }

    fn release_model(
        &self,
        learner_id: LearnerId,
        provider_id: ProviderId,
        task: &TaskId,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "UPDATE models SET locked_by = NULL, locked_at = NULL
                 WHERE learner_id = ?1 AND provider_id = ?2 AND locked_by = ?3",
                params![
                    to_i64(learner_id.get())?,
                    to_i64(provider_id.get())?,
                    task.as_str(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Verification Store
// ============================================================================

impl VerificationStore for SqliteTrustStore {
    fn insert_request(&self, request: &NewRequest) -> Result<RequestId, StoreError> {
        let activity = request
            .activity_id
            .map(|id| to_i64(id.get()))
            .transpose()?;
        let session = request.session_id.map(to_i64).transpose()?;
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        tx.execute(
            "INSERT INTO requests
                 (learner_id, activity_id, session_id, data_path, status, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                to_i64(request.learner_id.get())?,
                activity,
                session,
                request.data_path,
                i64::from(RequestStatus::Stored.code()),
            ],
        )
        .map_err(db_err)?;
        let request_row = tx.last_insert_rowid();
        for instrument in &request.instruments {
            tx.execute(
                "INSERT OR IGNORE INTO request_instruments (request_id, instrument_id)
                 VALUES (?1, ?2)",
                params![request_row, to_i64(instrument.get())?],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;
        id_from(request_row, RequestId::from_raw, "request")
    }

    fn request(&self, id: RequestId) -> Result<Option<VerificationRequest>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, Option<i64>, Option<i64>, String, i64, Option<String>)> =
            connection
                .query_row(
                    "SELECT id, learner_id, activity_id, session_id, data_path, status,
                            error_message
                     FROM requests WHERE id = ?1",
                    params![to_i64(id.get())?],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    },
                )
                .optional()
                .map_err(db_err)?;
        row.map(
            |(request_row, learner, activity, session, data_path, status, error_message)| {
                Ok(VerificationRequest {
                    id: id_from(request_row, RequestId::from_raw, "request")?,
                    learner_id: id_from(learner, LearnerId::from_raw, "learner")?,
                    activity_id: activity
                        .map(|value| id_from(value, ActivityId::from_raw, "activity"))
                        .transpose()?,
                    session_id: session
                        .map(|value| {
                            u64::try_from(value).map_err(|_| {
                                StoreError::Corrupt(format!("invalid session key {value}"))
                            })
                        })
                        .transpose()?,
                    data_path,
                    instruments: Self::request_instruments(&connection, request_row)?,
                    status: code_from(status, RequestStatus::from_code, "request status")?,
                    error_message,
                })
            },
        )
        .transpose()
    }

    fn attach_request_instruments(
        &self,
        id: RequestId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        let attached = Self::replace_instruments(
            &tx,
            "request_instruments",
            "request_id",
            to_i64(id.get())?,
            instruments,
        )?;
        tx.commit().map_err(db_err)?;
        Ok(attached)
    }

    fn set_request_status(
        &self,
        id: RequestId,
        status: RequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE requests SET status = ?2, error_message = ?3 WHERE id = ?1",
                params![to_i64(id.get())?, i64::from(status.code()), error_message],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("request {id}")));
        }
        Ok(())
    }

    fn upsert_request_result(&self, result: &RequestResult) -> Result<(), StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO request_results
                     (request_id, instrument_id, status, result, code)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    to_i64(result.request_id.get())?,
                    to_i64(result.instrument_id.get())?,
                    i64::from(result.status.code()),
                    result.result,
                    i64::from(result.code.code()),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn request_result(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<Option<RequestResult>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, i64, Option<f64>, i64)> = connection
            .query_row(
                "SELECT request_id, instrument_id, status, result, code
                 FROM request_results WHERE request_id = ?1 AND instrument_id = ?2",
                params![to_i64(request_id.get())?, to_i64(instrument_id.get())?],
                |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(|(request, instrument, status, result, code)| {
            Ok(RequestResult {
                request_id: id_from(request, RequestId::from_raw, "request")?,
                instrument_id: id_from(instrument, InstrumentId::from_raw, "instrument")?,
                status: code_from(status, ResultStatus::from_code, "result status")?,
                result,
                code: code_from(code, ResultCode::from_code, "result code")?,
            })
        })
        .transpose()
    }

    fn try_begin_summary(
        &self,
        request_id: RequestId,
        instrument_id: InstrumentId,
    ) -> Result<bool, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        let request_key = to_i64(request_id.get())?;
        let instrument_key = to_i64(instrument_id.get())?;
        let changed = tx
            .execute(
                "UPDATE request_results SET status = ?3
                 WHERE request_id = ?1 AND instrument_id = ?2 AND status = ?4",
                params![
                    request_key,
                    instrument_key,
                    i64::from(ResultStatus::Processing.code()),
                    i64::from(ResultStatus::Pending.code()),
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM request_results
                     WHERE request_id = ?1 AND instrument_id = ?2",
                    params![request_key, instrument_key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;
            tx.commit().map_err(db_err)?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "result {request_id}/{instrument_id}"
                )));
            }
            return Ok(false);
        }
        tx.commit().map_err(db_err)?;
        Ok(true)
    }

    fn insert_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError> {
        let audit_data = result
            .audit_data
            .as_ref()
            .map(|value| to_json(value))
            .transpose()?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT OR REPLACE INTO request_provider_results
                     (request_id, provider_id, status, result, code, audit_path, audit_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    to_i64(result.request_id.get())?,
                    to_i64(result.provider_id.get())?,
                    i64::from(result.status.code()),
                    result.result,
                    i64::from(result.code.code()),
                    result.audit_path,
                    audit_data,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn provider_result(
        &self,
        request_id: RequestId,
        provider_id: ProviderId,
    ) -> Result<Option<RequestProviderResult>, StoreError> {
        let connection = self.lock()?;
        let row: Option<ProviderResultRow> = connection
            .query_row(
                "SELECT request_id, provider_id, status, result, code, audit_path, audit_data
                 FROM request_provider_results
                 WHERE request_id = ?1 AND provider_id = ?2",
                params![to_i64(request_id.get())?, to_i64(provider_id.get())?],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(provider_result_from_row).transpose()
    }

    fn provider_results(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<RequestProviderResult>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT request_id, provider_id, status, result, code, audit_path, audit_data
                 FROM request_provider_results WHERE request_id = ?1 ORDER BY provider_id",
            )
            .map_err(db_err)?;
        let rows: Vec<ProviderResultRow> = statement
            .query_map(params![to_i64(request_id.get())?], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        rows.into_iter().map(provider_result_from_row).collect()
    }

    fn update_provider_result(&self, result: &RequestProviderResult) -> Result<(), StoreError> {
        let audit_data = result
            .audit_data
            .as_ref()
            .map(|value| to_json(value))
            .transpose()?;
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE request_provider_results
                 SET status = ?3, result = ?4, code = ?5, audit_path = ?6, audit_data = ?7
                 WHERE request_id = ?1 AND provider_id = ?2",
                params![
                    to_i64(result.request_id.get())?,
                    to_i64(result.provider_id.get())?,
                    i64::from(result.status.code()),
                    result.result,
                    i64::from(result.code.code()),
                    result.audit_path,
                    audit_data,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!(
                "provider result {}/{}",
                result.request_id, result.provider_id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Alert Store
// ============================================================================

impl AlertStore for SqliteTrustStore {
    fn insert_alert(&self, alert: &NewAlert) -> Result<AlertId, StoreError> {
        let institution = alert
            .institution_id
            .map(|id| to_i64(id.get()))
            .transpose()?;
        let learner = alert.learner_id.map(|id| to_i64(id.get())).transpose()?;
        let activity = alert.activity_id.map(|id| to_i64(id.get())).transpose()?;
        let session = alert.session_id.map(to_i64).transpose()?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO alerts
                     (level, status, institution_id, learner_id, activity_id,
                      session_id, raised_by, data, error_message, raised_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9)",
                params![
                    i64::from(alert.level.code()),
                    i64::from(AlertStatus::Stored.code()),
                    institution,
                    learner,
                    activity,
                    session,
                    alert.raised_by,
                    to_json(&alert.data)?,
                    alert.raised_at.unix_seconds(),
                ],
            )
            .map_err(db_err)?;
        id_from(connection.last_insert_rowid(), AlertId::from_raw, "alert")
    }

    fn alert(&self, id: AlertId) -> Result<Option<Alert>, StoreError> {
        let connection = self.lock()?;
        let key = to_i64(id.get())?;
        let row: Option<AlertRow> = connection
            .query_row(
                "SELECT id, level, status, institution_id, learner_id, activity_id,
                        session_id, raised_by, data, error_message, raised_at
                 FROM alerts WHERE id = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let instruments = Self::alert_instruments(&connection, key)?;
        alert_from_row(row, instruments).map(Some)
    }

    fn attach_alert_instruments(
        &self,
        id: AlertId,
        instruments: &BTreeSet<InstrumentId>,
    ) -> Result<usize, StoreError> {
        let mut connection = self.lock()?;
        let tx = connection.transaction().map_err(db_err)?;
        let attached = Self::replace_instruments(
            &tx,
            "alert_instruments",
            "alert_id",
            to_i64(id.get())?,
            instruments,
        )?;
        tx.commit().map_err(db_err)?;
        Ok(attached)
    }

    fn set_alert_status(
        &self,
        id: AlertId,
        status: AlertStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE alerts SET status = ?2, error_message = ?3 WHERE id = ?1",
                params![
                    to_i64(id.get())?,
                    i64::from(status.code()),
                    error_message,
                ],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Webhook Store
// ============================================================================

impl WebhookStore for SqliteTrustStore {
    fn enabled_clients(&self) -> Result<Vec<WebhookClient>, StoreError> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare(
                "SELECT id, name, header, id_header, secret, handler, enabled
                 FROM webhook_clients WHERE enabled = 1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows: Vec<(i64, String, String, Option<String>, String, String, bool)> = statement
            .query_map(params![], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })
            .map_err(db_err)?
            .collect::<Result<_, _>>()
            .map_err(db_err)?;
        rows.into_iter()
            .map(|(id, name, header, id_header, secret, handler, enabled)| {
                Ok(WebhookClient {
                    id: id_from(id, WebhookClientId::from_raw, "webhook client")?,
                    name,
                    header,
                    id_header,
                    secret,
                    handler,
                    enabled,
                })
            })
            .collect()
    }

    fn insert_message(
        &self,
        message: &NewWebhookMessage,
    ) -> Result<WebhookMessageId, StoreError> {
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO webhook_messages
                     (client_id, external_id, body, status, error_message, received_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                params![
                    to_i64(message.client_id.get())?,
                    message.external_id,
                    to_json(&message.body)?,
                    i64::from(WebhookStatus::Created.code()),
                    message.received_at.unix_seconds(),
                ],
            )
            .map_err(db_err)?;
        id_from(
            connection.last_insert_rowid(),
            WebhookMessageId::from_raw,
            "webhook message",
        )
    }

    fn webhook_message(
        &self,
        id: WebhookMessageId,
    ) -> Result<Option<WebhookMessage>, StoreError> {
        let connection = self.lock()?;
        let row: Option<(i64, i64, Option<String>, String, i64, Option<String>, i64)> = connection
            .query_row(
                "SELECT id, client_id, external_id, body, status, error_message, received_at
                 FROM webhook_messages WHERE id = ?1",
                params![to_i64(id.get())?],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;
        row.map(
            |(id, client, external_id, body, status, error_message, received_at)| {
                Ok(WebhookMessage {
                    id: id_from(id, WebhookMessageId::from_raw, "webhook message")?,
                    client_id: id_from(client, WebhookClientId::from_raw, "webhook client")?,
                    external_id,
                    body: from_json(&body, "webhook body")?,
                    status: code_from(status, WebhookStatus::from_code, "webhook status")?,
                    error_message,
                    received_at: Timestamp::from_unix_seconds(received_at),
                })
            },
        )
        .transpose()
    }

    fn set_message_status(
        &self,
        id: WebhookMessageId,
        status: WebhookStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let connection = self.lock()?;
        let changed = connection
            .execute(
                "UPDATE webhook_messages SET status = ?2, error_message = ?3 WHERE id = ?1",
                params![to_i64(id.get())?, i64::from(status.code()), error_message],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("webhook message {id}")));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Row Conversions
// ============================================================================

/// Raw validation row tuple.
type ValidationRow = (i64, i64, i64, i64, Option<f64>, Option<String>, Option<String>);

/// Raw provider result row tuple.
type ProviderResultRow = (i64, i64, i64, Option<f64>, i64, Option<String>, Option<String>);

/// Raw alert row tuple.
type AlertRow = (
    i64,
    i64,
    i64,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    String,
    String,
    Option<String>,
    i64,
);

/// Converts a learner row into its record.
fn learner_from_row(row: (i64, i64, String, String, bool)) -> Result<LearnerRecord, StoreError> {
    let (id, institution, subject, consent, active) = row;
    Ok(LearnerRecord {
        id: id_from(id, LearnerId::from_raw, "learner")?,
        institution_id: id_from(institution, InstitutionId::from_raw, "institution")?,
        subject: SubjectId::from(subject),
        consent: from_json(&consent, "learner consent")?,
        active,
    })
}

/// Converts a user row into its record.
fn user_from_row(
    row: (i64, Option<i64>, String, String, bool, bool),
) -> Result<UserRecord, StoreError> {
    let (id, institution, uid, roles, global_admin, active) = row;
    Ok(UserRecord {
        id: id_from(id, UserId::from_raw, "user")?,
        institution_id: institution
            .map(|value| id_from(value, InstitutionId::from_raw, "institution"))
            .transpose()?,
        uid: SubjectId::from(uid),
        roles: from_json(&roles, "user roles")?,
        global_admin,
        active,
    })
}

/// Converts a validation row into its record.
fn validation_from_row(row: ValidationRow) -> Result<SampleValidation, StoreError> {
    let (id, sample, provider, status, contribution, info_path, error_message) = row;
    Ok(SampleValidation {
        id: id_from(id, ValidationId::from_raw, "validation")?,
        sample_id: id_from(sample, SampleId::from_raw, "sample")?,
        provider_id: id_from(provider, ProviderId::from_raw, "provider")?,
        status: code_from(status, ValidationStatus::from_code, "validation status")?,
        contribution,
        info_path,
        error_message,
    })
}

/// Converts a provider result row into its record.
fn provider_result_from_row(row: ProviderResultRow) -> Result<RequestProviderResult, StoreError> {
    let (request, provider, status, result, code, audit_path, audit_data) = row;
    Ok(RequestProviderResult {
        request_id: id_from(request, RequestId::from_raw, "request")?,
        provider_id: id_from(provider, ProviderId::from_raw, "provider")?,
        status: code_from(status, ResultStatus::from_code, "result status")?,
        result,
        code: code_from(code, ResultCode::from_code, "result code")?,
        audit_path,
        audit_data: audit_data
            .map(|value| from_json(&value, "audit data"))
            .transpose()?,
    })
}

/// Converts an alert row and its instrument set into a record.
fn alert_from_row(row: AlertRow, instruments: BTreeSet<InstrumentId>) -> Result<Alert, StoreError> {
    let (
        id,
        level,
        status,
        institution,
        learner,
        activity,
        session,
        raised_by,
        data,
        error_message,
        raised_at,
    ) = row;
    Ok(Alert {
        id: id_from(id, AlertId::from_raw, "alert")?,
        level: code_from(level, AlertLevel::from_code, "alert level")?,
        status: code_from(status, AlertStatus::from_code, "alert status")?,
        institution_id: institution
            .map(|value| id_from(value, InstitutionId::from_raw, "institution"))
            .transpose()?,
        learner_id: learner
            .map(|value| id_from(value, LearnerId::from_raw, "learner"))
            .transpose()?,
        activity_id: activity
            .map(|value| id_from(value, ActivityId::from_raw, "activity"))
            .transpose()?,
        session_id: session
            .map(|value| {
                u64::try_from(value)
                    .map_err(|_| StoreError::Corrupt(format!("invalid session key {value}")))
            })
            .transpose()?,
        instruments,
        raised_by,
        data: from_json(&data, "alert data")?,
        error_message,
        raised_at: Timestamp::from_unix_seconds(raised_at),
    })
}

/// Loads a model row through the given connection or transaction.
fn load_model(
    connection: &Connection,
    learner_key: i64,
    provider_key: i64,
) -> Result<Option<EnrolmentModel>, StoreError> {
    let row: Option<ModelRow> = connection
        .query_row(
            "SELECT learner_id, provider_id, percentage, can_analyse, locked_by, locked_at,
                    model_path, used_samples
             FROM models WHERE learner_id = ?1 AND provider_id = ?2",
            params![learner_key, provider_key],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            },
        )
        .optional()
        .map_err(db_err)?;
    row.map(model_from_row).transpose()
}

/// Raw model row tuple.
type ModelRow = (
    i64,
    i64,
    f64,
    bool,
    Option<String>,
    Option<i64>,
    Option<String>,
    String,
);

/// Converts a model row into its record.
fn model_from_row(row: ModelRow) -> Result<EnrolmentModel, StoreError> {
    let (learner, provider, percentage, can_analyse, locked_by, locked_at, model_path, used) = row;
    Ok(EnrolmentModel {
        learner_id: id_from(learner, LearnerId::from_raw, "learner")?,
        provider_id: id_from(provider, ProviderId::from_raw, "provider")?,
        percentage,
        can_analyse,
        locked_by: locked_by.map(TaskId::from),
        locked_at: locked_at.map(Timestamp::from_unix_seconds),
        model_path,
        used_samples: from_json(&used, "model samples")?,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a `rusqlite` error onto the shared store error.
fn db_err(error: rusqlite::Error) -> StoreError {
    StoreError::Store(error.to_string())
}

/// Converts an identifier into the storable signed range.
fn to_i64(raw: u64) -> Result<i64, StoreError> {
    i64::try_from(raw)
        .map_err(|_| StoreError::Store(format!("identifier {raw} exceeds the storable range")))
}

/// Rebuilds a typed identifier from a stored key.
fn id_from<T>(value: i64, build: fn(u64) -> Option<T>, what: &str) -> Result<T, StoreError> {
    u64::try_from(value)
        .ok()
        .and_then(build)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid {what} key {value}")))
}

/// Rebuilds a status enum from a stored code.
fn code_from<T>(value: i64, parse: fn(u8) -> Option<T>, what: &str) -> Result<T, StoreError> {
    u8::try_from(value)
        .ok()
        .and_then(parse)
        .ok_or_else(|| StoreError::Corrupt(format!("invalid {what} code {value}")))
}

/// Serializes a value into a JSON column.
fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Store(err.to_string()))
}

/// Deserializes a JSON column fail-closed.
fn from_json<T: DeserializeOwned>(text: &str, what: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|err| StoreError::Corrupt(format!("{what}: {err}")))
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Validates the configured database path.
fn validate_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path is empty".to_owned()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_owned(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            config.journal_mode.pragma_value()
        ))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!(
            "PRAGMA synchronous = {};",
            config.sync_mode.pragma_value()
        ))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the stored version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection
        .transaction()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute(
                "INSERT INTO store_meta (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS learners (
                    id INTEGER PRIMARY KEY,
                    institution_id INTEGER NOT NULL,
                    subject TEXT NOT NULL UNIQUE,
                    consent TEXT NOT NULL,
                    active INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY,
                    institution_id INTEGER,
                    uid TEXT NOT NULL UNIQUE,
                    roles TEXT NOT NULL,
                    global_admin INTEGER NOT NULL,
                    active INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS vles (
                    id INTEGER PRIMARY KEY,
                    institution_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    active INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS instruments (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    requires_enrolment INTEGER NOT NULL,
                    enabled INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS providers (
                    id INTEGER PRIMARY KEY,
                    instrument_id INTEGER NOT NULL,
                    acronym TEXT NOT NULL UNIQUE,
                    queue TEXT NOT NULL,
                    enabled INTEGER NOT NULL,
                    allow_validation INTEGER NOT NULL,
                    validation_active INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_providers_instrument
                    ON providers (instrument_id);
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY,
                    institution_id INTEGER NOT NULL,
                    instructors TEXT NOT NULL,
                    learners TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS samples (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    learner_id INTEGER NOT NULL,
                    data_path TEXT NOT NULL,
                    status INTEGER NOT NULL,
                    error_message TEXT
                );
                CREATE TABLE IF NOT EXISTS sample_instruments (
                    sample_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    PRIMARY KEY (sample_id, instrument_id)
                );
                CREATE TABLE IF NOT EXISTS validations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    sample_id INTEGER NOT NULL,
                    provider_id INTEGER NOT NULL,
                    status INTEGER NOT NULL,
                    contribution REAL,
                    info_path TEXT,
                    error_message TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_validations_sample
                    ON validations (sample_id);
                CREATE TABLE IF NOT EXISTS models (
                    learner_id INTEGER NOT NULL,
                    provider_id INTEGER NOT NULL,
                    percentage REAL NOT NULL,
                    can_analyse INTEGER NOT NULL,
                    locked_by TEXT,
                    locked_at INTEGER,
                    model_path TEXT,
                    used_samples TEXT NOT NULL,
                    PRIMARY KEY (learner_id, provider_id)
                );
                CREATE TABLE IF NOT EXISTS requests (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    learner_id INTEGER NOT NULL,
                    activity_id INTEGER,
                    session_id INTEGER,
                    data_path TEXT NOT NULL,
                    status INTEGER NOT NULL,
                    error_message TEXT
                );
                CREATE TABLE IF NOT EXISTS request_instruments (
                    request_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    PRIMARY KEY (request_id, instrument_id)
                );
                CREATE TABLE IF NOT EXISTS request_results (
                    request_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    status INTEGER NOT NULL,
                    result REAL,
                    code INTEGER NOT NULL,
                    PRIMARY KEY (request_id, instrument_id)
                );
                CREATE TABLE IF NOT EXISTS request_provider_results (
                    request_id INTEGER NOT NULL,
                    provider_id INTEGER NOT NULL,
                    status INTEGER NOT NULL,
                    result REAL,
                    code INTEGER NOT NULL,
                    audit_path TEXT,
                    audit_data TEXT,
                    PRIMARY KEY (request_id, provider_id)
                );
                CREATE TABLE IF NOT EXISTS alerts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    level INTEGER NOT NULL,
                    status INTEGER NOT NULL,
                    institution_id INTEGER,
                    learner_id INTEGER,
                    activity_id INTEGER,
                    session_id INTEGER,
                    raised_by TEXT NOT NULL,
                    data TEXT NOT NULL,
                    error_message TEXT,
                    raised_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS alert_instruments (
                    alert_id INTEGER NOT NULL,
                    instrument_id INTEGER NOT NULL,
                    PRIMARY KEY (alert_id, instrument_id)
                );
                CREATE TABLE IF NOT EXISTS webhook_clients (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    header TEXT NOT NULL,
                    id_header TEXT,
                    secret TEXT NOT NULL,
                    handler TEXT NOT NULL,
                    enabled INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS webhook_messages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    client_id INTEGER NOT NULL,
                    external_id TEXT,
                    body TEXT NOT NULL,
                    status INTEGER NOT NULL,
                    error_message TEXT,
                    received_at INTEGER NOT NULL
                );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
