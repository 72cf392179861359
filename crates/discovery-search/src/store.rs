//! Interfaces to the external case store and central repository.
//!
//! Both are owned outside the engine and only ever receive read queries.
//! Implementations must be `Send + Sync`; the engine shares them across
//! worker threads behind `Arc`.
//!
//! Query fragments passed to [`CaseStore::find_files_where`] and
//! [`CaseStore::select`] are written against the case store's
//! files/artifacts/attributes schema (`tsk_files`, `blackboard_artifacts`,
//! `blackboard_attributes`, `content_tags`).

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;

use discovery_core::{ArtifactType, AttributeKind, CorrelationKind, FileKnown, FileType};
use serde::{Deserialize, Serialize};

use crate::error::{CentralRepoError, StoreError};

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type CentralRepoResult<T> = std::result::Result<T, CentralRepoError>;

// ---------------------------------------------------------------------------
// Row values
// ---------------------------------------------------------------------------

/// A single column value returned by [`CaseStore::select`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    BigInt(i64),
    Double(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::BigInt(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One row of a raw select, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    columns: Vec<(String, Value)>,
}

impl StoreRow {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Builder-style column append.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.columns.push((column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> StoreResult<i64> {
        match self.get(column) {
            Some(Value::BigInt(n)) => Ok(*n),
            Some(Value::Null) => Ok(0),
            Some(other) => Err(StoreError::decode(column, format!("expected integer, got {other:?}"))),
            None => Err(StoreError::decode(column, "missing column")),
        }
    }

    pub fn get_text(&self, column: &str) -> StoreResult<String> {
        match self.get(column) {
            Some(Value::Text(s)) => Ok(s.clone()),
            Some(other) => Err(StoreError::decode(column, format!("expected text, got {other:?}"))),
            None => Err(StoreError::decode(column, "missing column")),
        }
    }

    /// Text column that may be NULL or absent.
    #[must_use]
    pub fn opt_text(&self, column: &str) -> Option<String> {
        self.get(column)
            .and_then(Value::as_text)
            .map(str::to_string)
    }
}

// ---------------------------------------------------------------------------
// Case store records
// ---------------------------------------------------------------------------

/// File metadata as stored in the case store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRow {
    pub id: i64,
    pub name: String,
    pub parent_path: Option<String>,
    pub size: u64,
    pub md5: Option<String>,
    pub mime_type: Option<String>,
    pub known: FileKnown,
    pub data_source_id: i64,
    pub deleted: bool,
    /// Creation time, epoch seconds (0 when unknown).
    pub crtime: i64,
}

impl FileRow {
    #[must_use]
    pub fn file_type(&self) -> FileType {
        FileType::from_mime_type(self.mime_type.as_deref())
    }

    /// Parent path plus name.
    #[must_use]
    pub fn full_path(&self) -> String {
        format!("{}{}", self.parent_path.as_deref().unwrap_or(""), self.name)
    }
}

/// The directory containing a file, after skipping embedded-file parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRef {
    pub id: i64,
    pub unique_path: String,
}

/// One attribute of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactAttribute {
    pub kind: AttributeKind,
    pub value: Value,
}

/// A structured artifact extracted from the case (web history entry, cache
/// entry, download record and so on).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: i64,
    pub artifact_type: ArtifactType,
    /// Object the artifact was extracted from.
    pub object_id: i64,
    pub data_source_id: i64,
    pub attributes: Vec<ArtifactAttribute>,
}

impl Artifact {
    #[must_use]
    pub fn attribute(&self, kind: AttributeKind) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|attr| attr.kind == kind)
            .map(|attr| &attr.value)
    }

    #[must_use]
    pub fn text(&self, kind: AttributeKind) -> Option<&str> {
        self.attribute(kind).and_then(Value::as_text)
    }

    #[must_use]
    pub fn int(&self, kind: AttributeKind) -> Option<i64> {
        self.attribute(kind).and_then(Value::as_i64)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only access to the case database.
pub trait CaseStore: Send + Sync {
    /// Stream the files whose row satisfies `where_clause` (a boolean
    /// fragment over `tsk_files`) to `visitor`, one call per row. Returning
    /// `ControlFlow::Break` stops the scan early.
    fn find_files_where(
        &self,
        where_clause: &str,
        visitor: &mut dyn FnMut(FileRow) -> ControlFlow<()>,
    ) -> StoreResult<()>;

    /// Run a raw select (`query` is everything after `SELECT`) and call
    /// `visitor` once per row. Returning `ControlFlow::Break` from the
    /// visitor stops the scan early.
    fn select(
        &self,
        query: &str,
        visitor: &mut dyn FnMut(&StoreRow) -> ControlFlow<()>,
    ) -> StoreResult<()>;

    /// Display names of the tags applied to a file.
    fn content_tags(&self, file_id: i64) -> StoreResult<Vec<String>>;

    /// Every artifact of the given type in the case.
    fn artifacts_of_type(&self, artifact_type: ArtifactType) -> StoreResult<Vec<Artifact>>;

    fn file_by_id(&self, file_id: i64) -> StoreResult<Option<FileRow>>;

    fn data_source_name(&self, data_source_id: i64) -> StoreResult<Option<String>>;

    /// Nearest ancestor of the file that is a directory, or `None` when the
    /// file has no resolvable parent.
    fn containing_directory(&self, file_id: i64) -> StoreResult<Option<DirectoryRef>>;

    /// Up to `max_bytes` bytes from the start of the file.
    fn read_content(&self, file_id: i64, max_bytes: usize) -> StoreResult<Vec<u8>>;
}

/// Cross-case correlation lookups.
pub trait CentralRepository: Send + Sync {
    /// Canonical form of `value` for lookups of `kind`.
    fn normalize(&self, kind: CorrelationKind, value: &str) -> CentralRepoResult<String>;

    /// Number of distinct cases each value appears in. Values never seen are
    /// absent from the returned map. `values` are already normalized.
    fn case_counts(
        &self,
        kind: CorrelationKind,
        values: &[String],
    ) -> CentralRepoResult<HashMap<String, u64>>;

    /// Subset of `values` that any case marked known-bad.
    fn known_bad_values(
        &self,
        kind: CorrelationKind,
        values: &[String],
    ) -> CentralRepoResult<HashSet<String>>;
}

// ---------------------------------------------------------------------------
// SQL helpers
// ---------------------------------------------------------------------------

/// Quote a string literal for inclusion in a query fragment.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape a value for use inside a `LIKE '%...%'` pattern body.
#[must_use]
pub fn escape_like_body(value: &str) -> String {
    value.replace('\'', "''")
}
