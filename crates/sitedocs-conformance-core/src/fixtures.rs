// crates/sitedocs-conformance-core/src/fixtures.rs
// ============================================================================
// Module: Fixtures
// Description: Reference JSON snapshots of remote SiteDocs entities.
// Purpose: Load expected entity state and mutation payloads once per run.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! A fixture directory mirrors the layout used by the original SiteDocs test
//! configuration:
//!
//! ```text
//! entities.json        {"WorkerID": "...", "LocationID": "..."}
//! worker.json          expected worker record (also the restore payload)
//! workerPatch.json     PATCH /workers payload
//! location.json        expected location record
//! Forms/form.json      expected form record
//! Forms/formContent.json
//! ```
//!
//! Optional payload files (`locationPatch.json`, `workerStatus.json`,
//! `locationStatus.json`, `locationWorker.json`) enable additional mutation
//! checks. Fixtures are read-only after loading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted size of a fixture document.
const MAX_FIXTURE_BYTES: u64 = 4 * 1024 * 1024;

/// Identifier field carried by every record fixture.
pub const ID_FIELD: &str = "Id";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fixture loading failures.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// A required fixture file is missing or unreadable.
    #[error("failed to read fixture {path}: {source}")]
    Read {
        /// Fixture path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// A fixture file exceeds the size limit.
    #[error("fixture {path} exceeds {limit} bytes")]
    TooLarge {
        /// Fixture path.
        path: PathBuf,
        /// Size limit in bytes.
        limit: u64,
    },
    /// A fixture file is not valid JSON.
    #[error("fixture {path} is not valid JSON: {source}")]
    Parse {
        /// Fixture path.
        path: PathBuf,
        /// Parser error.
        source: serde_json::Error,
    },
    /// A fixture has the wrong shape.
    #[error("fixture {path}: {reason}")]
    Shape {
        /// Fixture path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
}

// ============================================================================
// SECTION: Fixture Set
// ============================================================================

/// Identifiers of the remote entities the suite targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityIds {
    /// Worker identifier (`WorkerID`).
    pub worker_id: String,
    /// Location identifier (`LocationID`, falling back to `location.json`'s `Id`).
    pub location_id: String,
    /// Form identifier (`form.json`'s `Id`).
    pub form_id: String,
}

/// All fixtures for one conformance run.
#[derive(Debug, Clone)]
pub struct FixtureSet {
    /// Targeted entity identifiers.
    pub ids: EntityIds,
    /// Expected worker record and restore payload.
    pub worker: Value,
    /// Worker PATCH payload.
    pub worker_patch: Value,
    /// Expected location record and restore payload.
    pub location: Value,
    /// Location PATCH payload.
    pub location_patch: Option<Value>,
    /// Expected form record.
    pub form: Value,
    /// Expected form content document.
    pub form_content: Value,
    /// Worker status payload override.
    pub worker_status: Option<Value>,
    /// Location status payload override.
    pub location_status: Option<Value>,
    /// Location/worker assignment payload override.
    pub location_worker: Option<Value>,
    /// Directory the fixtures were read from.
    pub root: PathBuf,
}

impl FixtureSet {
    /// Loads every fixture under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when a required file is missing, a document is
    /// malformed, or a record fixture lacks an `Id`.
    pub fn load(root: &Path) -> Result<Self, FixtureError> {
        let entities_path = root.join("entities.json");
        let entities = read_object(&entities_path)?;
        let worker = read_record(&root.join("worker.json"))?;
        let worker_patch = Value::Object(read_object(&root.join("workerPatch.json"))?);
        let location = read_record(&root.join("location.json"))?;
        let form = read_record(&root.join("Forms").join("form.json"))?;
        let form_content = read_json(&root.join("Forms").join("formContent.json"))?;

        let worker_id = match entities.get("WorkerID") {
            Some(value) => id_text(value).ok_or_else(|| FixtureError::Shape {
                path: entities_path.clone(),
                reason: "WorkerID must be a string or number".to_string(),
            })?,
            None => {
                return Err(FixtureError::Shape {
                    path: entities_path,
                    reason: "missing WorkerID".to_string(),
                });
            }
        };
        let location_id = entities
            .get("LocationID")
            .and_then(id_text)
            .or_else(|| location.get(ID_FIELD).and_then(id_text))
            .unwrap_or_default();
        let form_id = form.get(ID_FIELD).and_then(id_text).unwrap_or_default();

        Ok(Self {
            ids: EntityIds {
                worker_id,
                location_id,
                form_id,
            },
            worker,
            worker_patch,
            location,
            location_patch: read_optional(&root.join("locationPatch.json"))?,
            form,
            form_content,
            worker_status: read_optional(&root.join("workerStatus.json"))?,
            location_status: read_optional(&root.join("locationStatus.json"))?,
            location_worker: read_optional(&root.join("locationWorker.json"))?,
            root: root.to_path_buf(),
        })
    }

    /// Payload for `/workers/status`.
    #[must_use]
    pub fn worker_status_body(&self) -> Value {
        self.worker_status.clone().unwrap_or_else(|| json!({ "Id": self.ids.worker_id }))
    }

    /// Payload for `/locations/status`.
    #[must_use]
    pub fn location_status_body(&self) -> Value {
        self.location_status.clone().unwrap_or_else(|| json!({ "Id": self.ids.location_id }))
    }

    /// Payload for `/locations/worker`.
    #[must_use]
    pub fn location_worker_body(&self) -> Value {
        self.location_worker.clone().unwrap_or_else(|| {
            json!({
                "LocationId": self.ids.location_id,
                "WorkerId": self.ids.worker_id,
            })
        })
    }

    /// The `DocumentTemplateId` of the form fixture, used as `formTypeId`.
    #[must_use]
    pub fn form_type_id(&self) -> Option<String> {
        self.form.get("DocumentTemplateId").and_then(id_text)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a string or number identifier as text.
#[must_use]
pub fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Reads and parses one JSON document.
fn read_json(path: &Path) -> Result<Value, FixtureError> {
    let read_err = |source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    };
    let metadata = fs::metadata(path).map_err(read_err)?;
    if metadata.len() > MAX_FIXTURE_BYTES {
        return Err(FixtureError::TooLarge {
            path: path.to_path_buf(),
            limit: MAX_FIXTURE_BYTES,
        });
    }
    let bytes = fs::read(path).map_err(read_err)?;
    serde_json::from_slice(&bytes).map_err(|source| FixtureError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a document that must be a JSON object.
fn read_object(path: &Path) -> Result<Map<String, Value>, FixtureError> {
    match read_json(path)? {
        Value::Object(map) => Ok(map),
        _ => Err(FixtureError::Shape {
            path: path.to_path_buf(),
            reason: "expected a JSON object".to_string(),
        }),
    }
}

/// Reads a record fixture: an object with a string or numeric `Id`.
fn read_record(path: &Path) -> Result<Value, FixtureError> {
    let map = read_object(path)?;
    if map.get(ID_FIELD).and_then(id_text).is_none() {
        return Err(FixtureError::Shape {
            path: path.to_path_buf(),
            reason: format!("record fixtures must carry an {ID_FIELD}"),
        });
    }
    Ok(Value::Object(map))
}

/// Reads an optional document; absence is not an error.
fn read_optional(path: &Path) -> Result<Option<Value>, FixtureError> {
    if !path.exists() {
        return Ok(None);
    }
    read_json(path).map(Some)
}
