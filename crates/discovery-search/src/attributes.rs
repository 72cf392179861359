//! Grouping attributes.
//!
//! Each attribute maps a result to a [`GroupKey`] and may enrich a batch of
//! results with the fields that key needs (set names, tags, cross-case
//! frequency and so on). Enrichment only ever adds to de-duplicating sets or
//! overwrites scalar fields, so running it twice is harmless.
//!
//! External lookups are batched: one select per attribute for set names,
//! central repository lookups in chunks of the configured batch size.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use discovery_core::{
    ArtifactType, AttributeKind, CorrelationKind, FileKnown, FileSize, Frequency,
    PreviouslyNotable,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::SearchEnv;
use crate::error::{CentralRepoError, DiscoveryError, DiscoveryResult};
use crate::group_key::{ActivityDay, GroupKey, NameList};
use crate::results::{DomainResult, FileResult, SearchResult};
use crate::store::{CentralRepository, StoreRow};

/// Strategy for grouping results by one property.
pub trait AttributeType: Send + Sync {
    /// Name used in logs and error context.
    fn name(&self) -> &'static str;

    /// Key for `result`, computed from fields already on the result.
    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey>;

    /// Whether [`AttributeType::enrich`] does any work.
    fn requires_enrichment(&self) -> bool {
        false
    }

    /// Populate the fields this attribute's key depends on.
    fn enrich(&self, _results: &mut [SearchResult], _env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GroupingAttribute
// ---------------------------------------------------------------------------

/// The closed set of attributes a search can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingAttribute {
    FileSize,
    FileType,
    Frequency,
    KeywordList,
    DataSource,
    ParentPath,
    HashSet,
    InterestingItem,
    FileTag,
    ObjectDetected,
    LastActivityDate,
    FirstActivityDate,
    PageViews,
    PreviouslyNotable,
    DomainCategory,
    NoGrouping,
}

impl GroupingAttribute {
    #[must_use]
    pub fn attribute(self) -> &'static dyn AttributeType {
        match self {
            Self::FileSize => &FileSizeAttribute,
            Self::FileType => &FileTypeAttribute,
            Self::Frequency => &FrequencyAttribute,
            Self::KeywordList => &KeywordListAttribute,
            Self::DataSource => &DataSourceAttribute,
            Self::ParentPath => &ParentPathAttribute,
            Self::HashSet => &HashSetAttribute,
            Self::InterestingItem => &InterestingItemAttribute,
            Self::FileTag => &FileTagAttribute,
            Self::ObjectDetected => &ObjectDetectedAttribute,
            Self::LastActivityDate => &LastActivityDateAttribute,
            Self::FirstActivityDate => &FirstActivityDateAttribute,
            Self::PageViews => &PageViewsAttribute,
            Self::PreviouslyNotable => &PreviouslyNotableAttribute,
            Self::DomainCategory => &DomainCategoryAttribute,
            Self::NoGrouping => &NoGroupingAttribute,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::FileSize => "File Size",
            Self::FileType => "File Type",
            Self::Frequency => "Past Occurrences",
            Self::KeywordList => "Keyword",
            Self::DataSource => "Data Source",
            Self::ParentPath => "Parent Folder",
            Self::HashSet => "Hash Set",
            Self::InterestingItem => "Interesting Item",
            Self::FileTag => "Tag",
            Self::ObjectDetected => "Object Detected",
            Self::LastActivityDate => "Last Activity Date",
            Self::FirstActivityDate => "First Activity Date",
            Self::PageViews => "Page Views",
            Self::PreviouslyNotable => "Previously Notable",
            Self::DomainCategory => "Domain Category",
            Self::NoGrouping => "None",
        }
    }

    /// Attributes offered when grouping file searches.
    #[must_use]
    pub const fn options_for_files() -> &'static [Self] {
        &[
            Self::FileSize,
            Self::Frequency,
            Self::ParentPath,
            Self::ObjectDetected,
            Self::HashSet,
            Self::InterestingItem,
        ]
    }

    /// Attributes offered when grouping domain searches.
    #[must_use]
    pub const fn options_for_domains() -> &'static [Self] {
        &[
            Self::LastActivityDate,
            Self::FirstActivityDate,
            Self::PageViews,
            Self::Frequency,
            Self::PreviouslyNotable,
            Self::DomainCategory,
        ]
    }
}

impl fmt::Display for GroupingAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Enrich `results` for every attribute in `attributes`, skipping duplicates
/// and attributes without enrichment. Empty input is a no-op.
pub fn enrich_all(
    attributes: &[GroupingAttribute],
    results: &mut [SearchResult],
    env: &SearchEnv<'_>,
) -> DiscoveryResult<()> {
    if results.is_empty() {
        return Ok(());
    }
    let unique: BTreeSet<GroupingAttribute> = attributes.iter().copied().collect();
    for grouping in unique {
        let attribute = grouping.attribute();
        if !attribute.requires_enrichment() {
            continue;
        }
        env.context.check(attribute.name())?;
        attribute.enrich(results, env)?;
        tracing::debug!(
            attribute = attribute.name(),
            results = results.len(),
            "attribute enrichment complete"
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn expect_file<'r>(
    attribute: &'static str,
    result: &'r SearchResult,
) -> DiscoveryResult<&'r FileResult> {
    result.as_file().ok_or(DiscoveryError::UnexpectedResultType {
        attribute,
        expected: "file",
        found: result.kind_name(),
    })
}

fn expect_domain<'r>(
    attribute: &'static str,
    result: &'r SearchResult,
) -> DiscoveryResult<&'r DomainResult> {
    result.as_domain().ok_or(DiscoveryError::UnexpectedResultType {
        attribute,
        expected: "domain",
        found: result.kind_name(),
    })
}

/// Select returning `(object_id, set_name)` pairs for every artifact of
/// `artifact_type` attached to one of `object_ids`, where `set_name` is the
/// text value of the `kind` attribute.
#[must_use]
pub fn set_name_query(object_ids: &[i64], artifact_type: ArtifactType, kind: AttributeKind) -> String {
    let ids = object_ids
        .iter()
        .map(|id| format!("'{id}'"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "blackboard_artifacts.obj_id AS object_id, blackboard_attributes.value_text AS set_name \
         FROM blackboard_artifacts \
         INNER JOIN blackboard_attributes ON blackboard_artifacts.artifact_id=blackboard_attributes.artifact_id \
         WHERE blackboard_attributes.artifact_type_id='{}' \
         AND blackboard_attributes.attribute_type_id='{}' \
         AND blackboard_artifacts.obj_id IN ({ids}) ",
        artifact_type.type_id(),
        kind.type_id(),
    )
}

/// Look up set names for every file result and hand each `(result, name)`
/// pair to `apply`. Rows for objects not in `results` are ignored.
fn enrich_set_names(
    label: &'static str,
    artifact_type: ArtifactType,
    kind: AttributeKind,
    results: &mut [SearchResult],
    env: &SearchEnv<'_>,
    apply: fn(&mut FileResult, String),
) -> DiscoveryResult<()> {
    let mut by_object: HashMap<i64, usize> = HashMap::new();
    for (idx, result) in results.iter().enumerate() {
        if let Some(file) = result.as_file() {
            by_object.insert(file.first_instance().id, idx);
        }
    }
    if by_object.is_empty() {
        return Ok(());
    }
    let mut object_ids: Vec<i64> = by_object.keys().copied().collect();
    object_ids.sort_unstable();
    let query = set_name_query(&object_ids, artifact_type, kind);

    let mut hits: Vec<(usize, String)> = Vec::new();
    env.select(label, &query, |row: &StoreRow| {
        let object_id = row.get_i64("object_id")?;
        let name = row.get_text("set_name")?;
        if let Some(&idx) = by_object.get(&object_id) {
            hits.push((idx, name));
        }
        Ok(())
    })?;

    for (idx, name) in hits {
        if let Some(file) = results[idx].as_file_mut() {
            apply(file, name);
        }
    }
    Ok(())
}

/// Lower-cased MD5 of the representative instance, if it has one.
fn md5_key(file: &FileResult) -> Option<String> {
    file.first_instance()
        .md5
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Normalize domain values for central repository lookup. Values that fail
/// normalization are logged and skipped; any other repository failure aborts.
fn normalized_domains(
    label: &'static str,
    results: &[SearchResult],
    candidates: impl Iterator<Item = usize>,
    repo: &dyn CentralRepository,
    env: &SearchEnv<'_>,
) -> DiscoveryResult<IndexMap<String, Vec<usize>>> {
    let mut by_value: IndexMap<String, Vec<usize>> = IndexMap::new();
    for idx in candidates {
        env.context.check(label)?;
        let Some(domain) = results[idx].as_domain() else {
            continue;
        };
        match repo.normalize(CorrelationKind::Domain, &domain.domain) {
            Ok(value) => by_value.entry(value).or_default().push(idx),
            Err(err @ CentralRepoError::Normalization { .. }) => {
                tracing::warn!(
                    domain = %domain.domain,
                    error = %err,
                    "domain could not be normalized for central repository lookup, skipping"
                );
            }
            Err(err) => return Err(DiscoveryError::central_repo(label, err)),
        }
    }
    Ok(by_value)
}

/// Group file result indexes by content hash.
fn hashes_for(
    results: &[SearchResult],
    candidates: impl Iterator<Item = usize>,
) -> IndexMap<String, Vec<usize>> {
    let mut by_hash: IndexMap<String, Vec<usize>> = IndexMap::new();
    for idx in candidates {
        if let Some(hash) = results[idx].as_file().and_then(md5_key) {
            by_hash.entry(hash).or_default().push(idx);
        }
    }
    by_hash
}

/// Split a value→indexes map into lookup batches of at most `batch_size`
/// distinct values.
fn batches(
    by_value: &IndexMap<String, Vec<usize>>,
    batch_size: usize,
) -> impl Iterator<Item = Vec<String>> + '_ {
    let keys: Vec<&String> = by_value.keys().collect();
    let batch_size = batch_size.max(1);
    (0..keys.len())
        .step_by(batch_size)
        .map(move |start| {
            keys[start..(start + batch_size).min(keys.len())]
                .iter()
                .map(|k| (*k).clone())
                .collect()
        })
}

// ---------------------------------------------------------------------------
// File attributes
// ---------------------------------------------------------------------------

/// Group by size bucket. Video files use the video table.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSizeAttribute;

impl AttributeType for FileSizeAttribute {
    fn name(&self) -> &'static str {
        "file size"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(GroupKey::FileSize {
            size: FileSize::for_file(file.file_type(), file.first_instance().size),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileTypeAttribute;

impl AttributeType for FileTypeAttribute {
    fn name(&self) -> &'static str {
        "file type"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        Ok(GroupKey::FileType {
            file_type: result.result_type(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordListAttribute;

impl AttributeType for KeywordListAttribute {
    fn name(&self) -> &'static str {
        "keyword list"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(GroupKey::KeywordList {
            lists: NameList::new(file.keyword_list_names().iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        enrich_set_names(
            "keyword list lookup",
            ArtifactType::KeywordHit,
            AttributeKind::SetName,
            results,
            env,
            |file, name| file.add_keyword_list_name(name),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashSetAttribute;

impl AttributeType for HashSetAttribute {
    fn name(&self) -> &'static str {
        "hash set"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(GroupKey::HashSet {
            sets: NameList::new(file.hash_set_names().iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        enrich_set_names(
            "hash set lookup",
            ArtifactType::HashsetHit,
            AttributeKind::SetName,
            results,
            env,
            |file, name| file.add_hash_set_name(name),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterestingItemAttribute;

impl AttributeType for InterestingItemAttribute {
    fn name(&self) -> &'static str {
        "interesting item"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(GroupKey::InterestingItem {
            sets: NameList::new(file.interesting_set_names().iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        enrich_set_names(
            "interesting item lookup",
            ArtifactType::InterestingFileHit,
            AttributeKind::SetName,
            results,
            env,
            |file, name| file.add_interesting_set_name(name),
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectDetectedAttribute;

impl AttributeType for ObjectDetectedAttribute {
    fn name(&self) -> &'static str {
        "object detected"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(GroupKey::ObjectDetected {
            objects: NameList::new(file.object_detected_names().iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        enrich_set_names(
            "object detected lookup",
            ArtifactType::ObjectDetected,
            AttributeKind::Description,
            results,
            env,
            |file, name| file.add_object_detected_name(name),
        )
    }
}

/// Group by the names of tags applied to the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTagAttribute;

impl AttributeType for FileTagAttribute {
    fn name(&self) -> &'static str {
        "file tag"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        Ok(GroupKey::FileTag {
            tags: NameList::new(result.tag_names().iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        for result in results.iter_mut() {
            env.context.check(self.name())?;
            let Some(file) = result.as_file() else {
                continue;
            };
            let tags = env
                .store
                .content_tags(file.first_instance().id)
                .map_err(|err| DiscoveryError::store("file tag lookup", err))?;
            for tag in tags {
                result.add_tag_name(tag);
            }
        }
        Ok(())
    }
}

/// Group by containing directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentPathAttribute;

impl AttributeType for ParentPathAttribute {
    fn name(&self) -> &'static str {
        "parent path"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let file = expect_file(self.name(), result)?;
        Ok(match file.containing_directory() {
            Some(dir) => GroupKey::ParentPath {
                path: dir.unique_path.clone(),
                id: dir.id,
            },
            None => GroupKey::ParentPath {
                path: file.first_instance().parent_path.clone().unwrap_or_default(),
                id: -1,
            },
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    // Unresolvable parents fall back to the raw parent path.
    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        for result in results.iter_mut() {
            env.context.check(self.name())?;
            let Some(file) = result.as_file_mut() else {
                continue;
            };
            if file.containing_directory().is_some() {
                continue;
            }
            let file_id = file.first_instance().id;
            match env.store.containing_directory(file_id) {
                Ok(dir) => file.set_containing_directory(dir),
                Err(err) => {
                    tracing::warn!(file_id, error = %err, "could not resolve containing directory");
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Attributes shared by files and domains
// ---------------------------------------------------------------------------

/// Group by data source, resolving its display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataSourceAttribute;

impl AttributeType for DataSourceAttribute {
    fn name(&self) -> &'static str {
        "data source"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let name = match result {
            SearchResult::File(file) => file.data_source_name().map(str::to_string),
            SearchResult::Domain(domain) => domain.data_source_name.clone(),
        };
        Ok(GroupKey::DataSource {
            id: result.data_source_id(),
            name,
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        let mut names: HashMap<i64, Option<String>> = HashMap::new();
        for result in results.iter_mut() {
            env.context.check(self.name())?;
            let id = result.data_source_id();
            let name = names
                .entry(id)
                .or_insert_with(|| match env.store.data_source_name(id) {
                    Ok(Some(name)) => Some(name),
                    Ok(None) => {
                        tracing::warn!(data_source_id = id, "data source has no name");
                        None
                    }
                    Err(err) => {
                        tracing::warn!(data_source_id = id, error = %err, "could not look up data source name");
                        None
                    }
                })
                .clone();
            match result {
                SearchResult::File(file) => file.set_data_source_name(name),
                SearchResult::Domain(domain) => domain.data_source_name = name,
            }
        }
        Ok(())
    }
}

/// Group by cross-case frequency.
///
/// Without a central repository only the known status is consulted. With
/// one, file hashes and normalized domains are looked up in batches; values
/// the repository has never seen are unique.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyAttribute;

impl FrequencyAttribute {
    fn lookup_counts(
        label: &'static str,
        kind: CorrelationKind,
        by_value: &IndexMap<String, Vec<usize>>,
        batch_size: usize,
        repo: &dyn CentralRepository,
        results: &mut [SearchResult],
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<()> {
        for batch in batches(by_value, batch_size) {
            env.context.check(label)?;
            let counts = repo
                .case_counts(kind, &batch)
                .map_err(|err| DiscoveryError::central_repo(label, err))?;
            let counts: HashMap<String, u64> = counts
                .into_iter()
                .map(|(value, count)| (value.to_ascii_lowercase(), count))
                .collect();
            for value in &batch {
                let frequency =
                    Frequency::from_count(counts.get(&value.to_ascii_lowercase()).copied().unwrap_or(0));
                for &idx in by_value.get(value).into_iter().flatten() {
                    results[idx].set_frequency(frequency);
                }
            }
        }
        Ok(())
    }
}

impl AttributeType for FrequencyAttribute {
    fn name(&self) -> &'static str {
        "frequency"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        Ok(GroupKey::Frequency {
            frequency: result.frequency(),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        let Some(repo) = env.central_repo else {
            for result in results.iter_mut() {
                if result.frequency() == Frequency::Unknown && result.known() == FileKnown::Known {
                    result.set_frequency(Frequency::Known);
                }
            }
            return Ok(());
        };

        let mut file_candidates = Vec::new();
        let mut domain_candidates = Vec::new();
        for (idx, result) in results.iter_mut().enumerate() {
            if result.known() == FileKnown::Known {
                result.set_frequency(Frequency::Known);
                continue;
            }
            if result.frequency() != Frequency::Unknown {
                continue;
            }
            match result {
                SearchResult::File(_) => file_candidates.push(idx),
                SearchResult::Domain(_) => domain_candidates.push(idx),
            }
        }

        let by_hash = hashes_for(results, file_candidates.into_iter());
        Self::lookup_counts(
            "file frequency lookup",
            CorrelationKind::Files,
            &by_hash,
            env.config.file_hash_batch_size,
            repo,
            results,
            env,
        )?;

        let by_domain = normalized_domains(
            "domain frequency lookup",
            results,
            domain_candidates.into_iter(),
            repo,
            env,
        )?;
        Self::lookup_counts(
            "domain frequency lookup",
            CorrelationKind::Domain,
            &by_domain,
            env.config.domain_batch_size,
            repo,
            results,
            env,
        )
    }
}

/// Group by whether another case flagged the item as notable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviouslyNotableAttribute;

impl PreviouslyNotableAttribute {
    fn lookup_notable(
        label: &'static str,
        kind: CorrelationKind,
        by_value: &IndexMap<String, Vec<usize>>,
        batch_size: usize,
        repo: &dyn CentralRepository,
        results: &mut [SearchResult],
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<()> {
        for batch in batches(by_value, batch_size) {
            env.context.check(label)?;
            let notable = repo
                .known_bad_values(kind, &batch)
                .map_err(|err| DiscoveryError::central_repo(label, err))?;
            let notable: BTreeSet<String> =
                notable.iter().map(|v| v.to_ascii_lowercase()).collect();
            for value in &batch {
                if !notable.contains(&value.to_ascii_lowercase()) {
                    continue;
                }
                for &idx in by_value.get(value).into_iter().flatten() {
                    results[idx].set_previously_notable(PreviouslyNotable::PreviouslyNotable);
                }
            }
        }
        Ok(())
    }
}

impl AttributeType for PreviouslyNotableAttribute {
    fn name(&self) -> &'static str {
        "previously notable"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        Ok(GroupKey::PreviouslyNotable {
            status: result.previously_notable(),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        let Some(repo) = env.central_repo else {
            tracing::debug!("no central repository, previously notable status left unset");
            return Ok(());
        };
        let files = (0..results.len()).filter(|&idx| results[idx].as_file().is_some());
        let by_hash = hashes_for(results, files);
        Self::lookup_notable(
            "previously notable file lookup",
            CorrelationKind::Files,
            &by_hash,
            env.config.file_hash_batch_size,
            repo,
            results,
            env,
        )?;

        let domains: Vec<usize> = (0..results.len())
            .filter(|&idx| results[idx].as_domain().is_some())
            .collect();
        let by_domain = normalized_domains(
            "previously notable domain lookup",
            results,
            domains.into_iter(),
            repo,
            env,
        )?;
        Self::lookup_notable(
            "previously notable domain lookup",
            CorrelationKind::Domain,
            &by_domain,
            env.config.domain_batch_size,
            repo,
            results,
            env,
        )
    }
}

/// Puts every result in one group.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGroupingAttribute;

impl AttributeType for NoGroupingAttribute {
    fn name(&self) -> &'static str {
        "no grouping"
    }

    fn group_key(&self, _result: &SearchResult) -> DiscoveryResult<GroupKey> {
        Ok(GroupKey::NoGrouping)
    }
}

// ---------------------------------------------------------------------------
// Domain attributes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct LastActivityDateAttribute;

impl AttributeType for LastActivityDateAttribute {
    fn name(&self) -> &'static str {
        "last activity date"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let domain = expect_domain(self.name(), result)?;
        Ok(GroupKey::LastActivityDate {
            day: ActivityDay::from_epoch_seconds(domain.activity_end),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstActivityDateAttribute;

impl AttributeType for FirstActivityDateAttribute {
    fn name(&self) -> &'static str {
        "first activity date"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let domain = expect_domain(self.name(), result)?;
        Ok(GroupKey::FirstActivityDate {
            day: ActivityDay::from_epoch_seconds(domain.activity_start),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageViewsAttribute;

impl AttributeType for PageViewsAttribute {
    fn name(&self) -> &'static str {
        "page views"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let domain = expect_domain(self.name(), result)?;
        Ok(GroupKey::PageViews {
            views: discovery_core::PageViews::from_count(domain.total_page_views),
        })
    }
}

/// Group domains by web category, read from web categorization artifacts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainCategoryAttribute;

impl AttributeType for DomainCategoryAttribute {
    fn name(&self) -> &'static str {
        "domain category"
    }

    fn group_key(&self, result: &SearchResult) -> DiscoveryResult<GroupKey> {
        let domain = expect_domain(self.name(), result)?;
        Ok(GroupKey::DomainCategory {
            categories: NameList::new(domain.web_categories.iter().cloned()),
        })
    }

    fn requires_enrichment(&self) -> bool {
        true
    }

    fn enrich(&self, results: &mut [SearchResult], env: &SearchEnv<'_>) -> DiscoveryResult<()> {
        if !results.iter().any(|r| r.as_domain().is_some()) {
            return Ok(());
        }
        let artifacts = env
            .store
            .artifacts_of_type(ArtifactType::WebCategorization)
            .map_err(|err| DiscoveryError::store("domain category lookup", err))?;
        let mut categories: HashMap<String, Vec<String>> = HashMap::new();
        for artifact in &artifacts {
            env.context.check(self.name())?;
            let (Some(domain), Some(category)) = (
                artifact.text(AttributeKind::Domain),
                artifact.text(AttributeKind::Name),
            ) else {
                continue;
            };
            categories
                .entry(domain.trim().to_ascii_lowercase())
                .or_default()
                .push(category.to_string());
        }
        for result in results.iter_mut() {
            let Some(domain) = result.as_domain_mut() else {
                continue;
            };
            let key = domain.domain.trim().to_ascii_lowercase();
            for category in categories.get(&key).into_iter().flatten() {
                domain.add_web_category(category.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileRow;

    fn file(id: i64, size: u64, mime: &str) -> SearchResult {
        SearchResult::file(FileRow {
            id,
            name: format!("f{id}"),
            parent_path: Some("/docs/".into()),
            size,
            md5: None,
            mime_type: Some(mime.into()),
            known: FileKnown::Unknown,
            data_source_id: 1,
            deleted: false,
            crtime: 0,
        })
    }

    #[test]
    fn file_size_key_uses_video_table_for_video() {
        let attr = GroupingAttribute::FileSize.attribute();
        let video = attr.group_key(&file(1, 600_000_000, "video/mp4")).unwrap();
        let image = attr.group_key(&file(2, 600_000_000, "image/png")).unwrap();
        assert_eq!(
            video,
            GroupKey::FileSize {
                size: FileSize::MediumVideo
            }
        );
        assert_eq!(
            image,
            GroupKey::FileSize {
                size: FileSize::XxLargeImage
            }
        );
    }

    #[test]
    fn domain_only_attribute_rejects_file() {
        let err = GroupingAttribute::PageViews
            .attribute()
            .group_key(&file(1, 10, "image/png"))
            .unwrap_err();
        assert_eq!(err.error_code(), "UNEXPECTED_RESULT_TYPE");
        assert!(err.to_string().contains("expects a domain result"));
    }

    #[test]
    fn file_only_attribute_rejects_domain() {
        let domain = SearchResult::Domain(DomainResult::new("example.com", 1));
        let err = GroupingAttribute::KeywordList
            .attribute()
            .group_key(&domain)
            .unwrap_err();
        assert!(matches!(
            err,
            DiscoveryError::UnexpectedResultType {
                expected: "file",
                found: "domain",
                ..
            }
        ));
    }

    #[test]
    fn parent_path_falls_back_to_raw_path() {
        let key = GroupingAttribute::ParentPath
            .attribute()
            .group_key(&file(1, 10, "image/png"))
            .unwrap();
        assert_eq!(
            key,
            GroupKey::ParentPath {
                path: "/docs/".into(),
                id: -1
            }
        );
    }

    #[test]
    fn set_name_query_lists_objects_and_types() {
        let query = set_name_query(&[3, 9], ArtifactType::KeywordHit, AttributeKind::SetName);
        assert!(query.starts_with("blackboard_artifacts.obj_id AS object_id"));
        assert!(query.contains("artifact_type_id='9'"));
        assert!(query.contains("attribute_type_id='37'"));
        assert!(query.contains("obj_id IN ('3','9')"));
    }

    #[test]
    fn batches_split_distinct_values() {
        let mut by_value: IndexMap<String, Vec<usize>> = IndexMap::new();
        for i in 0..5 {
            by_value.insert(format!("v{i}"), vec![i]);
        }
        let sizes: Vec<usize> = batches(&by_value, 2).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn only_enriching_attributes_report_it() {
        assert!(!GroupingAttribute::FileSize.attribute().requires_enrichment());
        assert!(!GroupingAttribute::NoGrouping.attribute().requires_enrichment());
        assert!(GroupingAttribute::Frequency.attribute().requires_enrichment());
        assert!(GroupingAttribute::KeywordList.attribute().requires_enrichment());
    }

    #[test]
    fn display_names() {
        assert_eq!(GroupingAttribute::Frequency.to_string(), "Past Occurrences");
        assert_eq!(GroupingAttribute::ParentPath.to_string(), "Parent Folder");
        assert_eq!(GroupingAttribute::NoGrouping.to_string(), "None");
    }
}
