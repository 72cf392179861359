//! In-memory case store.
//!
//! File searches cannot evaluate SQL in memory, so the store answers
//! `find_files_where` with every file, narrowed by the predicates
//! registered for clause fragments the request contains, streamed one row
//! at a time. Raw selects are
//! answered from canned rows keyed by a query fragment, plus built-in
//! responders for the domain aggregate, latest activity and set-name
//! queries. Every call is counted so tests can assert cache behaviour.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use discovery_core::{ArtifactType, AttributeKind};
use discovery_search::{Artifact, CaseStore, DirectoryRef, FileRow, StoreError, StoreResult, StoreRow};

type FilePredicate = Box<dyn Fn(&FileRow) -> bool + Send + Sync>;
type Hook = Box<dyn Fn() + Send + Sync>;
type RowHook = Box<dyn Fn(&FileRow) + Send + Sync>;

/// Per-method call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_files: usize,
    /// File rows handed to the engine across every file query.
    pub file_rows: usize,
    pub select: usize,
    pub artifacts_of_type: usize,
    pub file_by_id: usize,
    pub data_source_name: usize,
    pub content_tags: usize,
}

#[derive(Default)]
struct Counters {
    find_files: AtomicUsize,
    file_rows: AtomicUsize,
    select: AtomicUsize,
    artifacts_of_type: AtomicUsize,
    file_by_id: AtomicUsize,
    data_source_name: AtomicUsize,
    content_tags: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryCaseStore {
    files: Vec<FileRow>,
    clause_predicates: Vec<(String, FilePredicate)>,
    canned_rows: Vec<(String, Vec<StoreRow>)>,
    domain_rows: Vec<StoreRow>,
    latest_activity: Option<i64>,
    set_names: Vec<(ArtifactType, i64, String)>,
    artifacts: Vec<Artifact>,
    tags: HashMap<i64, Vec<String>>,
    data_sources: HashMap<i64, String>,
    directories: HashMap<i64, DirectoryRef>,
    content: HashMap<i64, Vec<u8>>,
    fail_files: Option<String>,
    fail_artifacts: Option<String>,
    file_delay: Option<Duration>,
    on_find_files: Option<Hook>,
    on_file_row: Option<RowHook>,
    counters: Counters,
    queries: Mutex<Vec<String>>,
}

impl MemoryCaseStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn with_file(mut self, file: FileRow) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = FileRow>) -> Self {
        self.files.extend(files);
        self
    }

    /// Files returned for a where clause containing `fragment` must also
    /// satisfy `keep`.
    #[must_use]
    pub fn with_clause_predicate<F>(mut self, fragment: impl Into<String>, keep: F) -> Self
    where
        F: Fn(&FileRow) -> bool + Send + Sync + 'static,
    {
        self.clause_predicates.push((fragment.into(), Box::new(keep)));
        self
    }

    /// Answer selects containing `fragment` with `rows`.
    #[must_use]
    pub fn with_select_rows(mut self, fragment: impl Into<String>, rows: Vec<StoreRow>) -> Self {
        self.canned_rows.push((fragment.into(), rows));
        self
    }

    /// One row of the aggregate domain query.
    #[must_use]
    pub fn with_domain_row(mut self, row: StoreRow) -> Self {
        self.domain_rows.push(row);
        self
    }

    #[must_use]
    pub const fn with_latest_activity(mut self, epoch_seconds: i64) -> Self {
        self.latest_activity = Some(epoch_seconds);
        self
    }

    /// A set-name artifact (keyword hit, hash set hit, ...) on a file.
    #[must_use]
    pub fn with_set_name(mut self, artifact_type: ArtifactType, object_id: i64, name: impl Into<String>) -> Self {
        self.set_names.push((artifact_type, object_id, name.into()));
        self
    }

    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    #[must_use]
    pub fn with_tag(mut self, file_id: i64, tag: impl Into<String>) -> Self {
        self.tags.entry(file_id).or_default().push(tag.into());
        self
    }

    #[must_use]
    pub fn with_data_source(mut self, id: i64, name: impl Into<String>) -> Self {
        self.data_sources.insert(id, name.into());
        self
    }

    #[must_use]
    pub fn with_directory(mut self, file_id: i64, directory: DirectoryRef) -> Self {
        self.directories.insert(file_id, directory);
        self
    }

    #[must_use]
    pub fn with_content(mut self, file_id: i64, bytes: impl Into<Vec<u8>>) -> Self {
        self.content.insert(file_id, bytes.into());
        self
    }

    /// Make every file search fail with `message`.
    #[must_use]
    pub fn failing_file_queries(mut self, message: impl Into<String>) -> Self {
        self.fail_files = Some(message.into());
        self
    }

    /// Make every artifact lookup fail with `message`.
    #[must_use]
    pub fn failing_artifact_queries(mut self, message: impl Into<String>) -> Self {
        self.fail_artifacts = Some(message.into());
        self
    }

    /// Sleep this long inside every file search.
    #[must_use]
    pub const fn with_file_query_delay(mut self, delay: Duration) -> Self {
        self.file_delay = Some(delay);
        self
    }

    /// Run `hook` at the start of every file search.
    #[must_use]
    pub fn on_find_files<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_find_files = Some(Box::new(hook));
        self
    }

    /// Run `hook` as each file row is about to be handed to the engine.
    #[must_use]
    pub fn on_file_row<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FileRow) + Send + Sync + 'static,
    {
        self.on_file_row = Some(Box::new(hook));
        self
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            find_files: self.counters.find_files.load(Ordering::SeqCst),
            file_rows: self.counters.file_rows.load(Ordering::SeqCst),
            select: self.counters.select.load(Ordering::SeqCst),
            artifacts_of_type: self.counters.artifacts_of_type.load(Ordering::SeqCst),
            file_by_id: self.counters.file_by_id.load(Ordering::SeqCst),
            data_source_name: self.counters.data_source_name.load(Ordering::SeqCst),
            content_tags: self.counters.content_tags.load(Ordering::SeqCst),
        }
    }

    /// Every where clause and select received, in call order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, query: &str) {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());
    }

    fn rows_for(&self, query: &str) -> Vec<StoreRow> {
        if query.contains("AS latest_activity") {
            return self
                .latest_activity
                .map(|latest| vec![StoreRow::new().with("latest_activity", latest)])
                .unwrap_or_default();
        }
        if query.contains("AS activity_start") {
            return self.domain_rows.clone();
        }
        if query.contains("AS set_name") {
            let set_kind = format!("attribute_type_id='{}'", AttributeKind::SetName.type_id());
            if !query.contains(&set_kind) {
                return Vec::new();
            }
            return self
                .set_names
                .iter()
                .filter(|(ty, _, _)| query.contains(&format!("artifact_type_id='{}'", ty.type_id())))
                .map(|(_, object_id, name)| {
                    StoreRow::new()
                        .with("object_id", *object_id)
                        .with("set_name", name.as_str())
                })
                .collect();
        }
        self.canned_rows
            .iter()
            .find(|(fragment, _)| query.contains(fragment.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

impl CaseStore for MemoryCaseStore {
    fn find_files_where(
        &self,
        where_clause: &str,
        visitor: &mut dyn FnMut(FileRow) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        self.counters.find_files.fetch_add(1, Ordering::SeqCst);
        self.record(where_clause);
        if let Some(hook) = &self.on_find_files {
            hook();
        }
        if let Some(delay) = self.file_delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.fail_files {
            return Err(StoreError::Query(message.clone()));
        }
        let active: Vec<&FilePredicate> = self
            .clause_predicates
            .iter()
            .filter(|(fragment, _)| where_clause.contains(fragment.as_str()))
            .map(|(_, keep)| keep)
            .collect();
        for file in self.files.iter().filter(|file| active.iter().all(|keep| keep(file))) {
            if let Some(hook) = &self.on_file_row {
                hook(file);
            }
            self.counters.file_rows.fetch_add(1, Ordering::SeqCst);
            if visitor(file.clone()).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn select(
        &self,
        query: &str,
        visitor: &mut dyn FnMut(&StoreRow) -> ControlFlow<()>,
    ) -> StoreResult<()> {
        self.counters.select.fetch_add(1, Ordering::SeqCst);
        self.record(query);
        for row in self.rows_for(query) {
            if visitor(&row).is_break() {
                break;
            }
        }
        Ok(())
    }

    fn content_tags(&self, file_id: i64) -> StoreResult<Vec<String>> {
        self.counters.content_tags.fetch_add(1, Ordering::SeqCst);
        Ok(self.tags.get(&file_id).cloned().unwrap_or_default())
    }

    fn artifacts_of_type(&self, artifact_type: ArtifactType) -> StoreResult<Vec<Artifact>> {
        self.counters.artifacts_of_type.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_artifacts {
            return Err(StoreError::Query(message.clone()));
        }
        Ok(self
            .artifacts
            .iter()
            .filter(|a| a.artifact_type == artifact_type)
            .cloned()
            .collect())
    }

    fn file_by_id(&self, file_id: i64) -> StoreResult<Option<FileRow>> {
        self.counters.file_by_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.iter().find(|f| f.id == file_id).cloned())
    }

    fn data_source_name(&self, data_source_id: i64) -> StoreResult<Option<String>> {
        self.counters.data_source_name.fetch_add(1, Ordering::SeqCst);
        Ok(self.data_sources.get(&data_source_id).cloned())
    }

    fn containing_directory(&self, file_id: i64) -> StoreResult<Option<DirectoryRef>> {
        Ok(self.directories.get(&file_id).cloned())
    }

    fn read_content(&self, file_id: i64, max_bytes: usize) -> StoreResult<Vec<u8>> {
        let bytes = self
            .content
            .get(&file_id)
            .ok_or_else(|| StoreError::not_found("file content", file_id.to_string()))?;
        Ok(bytes[..bytes.len().min(max_bytes)].to_vec())
    }
}

impl std::fmt::Debug for MemoryCaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCaseStore")
            .field("files", &self.files.len())
            .field("domain_rows", &self.domain_rows.len())
            .field("artifacts", &self.artifacts.len())
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}
