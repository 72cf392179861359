//! Search filters.
//!
//! A filter either contributes a boolean fragment to the case store query
//! ([`SearchFilter::where_clause`]) or runs as an in-memory pass over the
//! results of that query ([`SearchFilter::apply_alternate_filter`]). Every
//! filter also has a human-readable description, which doubles as its part
//! of the search cache key.
//!
//! In-memory filters keep the input order of the results they retain. Empty
//! input always yields empty output without touching the central repository.

use std::fmt;
use std::sync::Arc;

use chrono::DateTime;
use discovery_core::{
    ArtifactType, AttributeKind, CorrelationKind, FileKnown, FileSize, FileType, Frequency,
    PreviouslyNotable, Score,
};
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeType, FrequencyAttribute, PreviouslyNotableAttribute};
use crate::context::SearchEnv;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::results::SearchResult;
use crate::store::{escape_like_body, quote};

/// Shared handle to a filter, as passed to searches.
pub type FilterRef = Arc<dyn SearchFilter>;

/// End dates at or past this are treated as "no end date" when describing
/// a date range filter.
const OPEN_END_DATE: i64 = 10_000_000_000;

pub trait SearchFilter: Send + Sync + fmt::Debug {
    /// Boolean fragment over the case store, or an empty string when the
    /// filter has no store-level predicate.
    fn where_clause(&self) -> String;

    /// Fragment used by domain searches against the artifact tables.
    fn domain_where_clause(&self) -> String {
        self.where_clause()
    }

    /// Predicate over the aggregated domain group, written against the
    /// `activity` subquery's columns, if the filter constrains the aggregate.
    fn domain_having_clause(&self) -> Option<String> {
        None
    }

    /// Text shown to the user.
    fn description(&self) -> String;

    /// The filter's share of the search cache key. Filters that send
    /// different predicates to the store never share a key, even when their
    /// descriptions read the same.
    fn cache_key(&self) -> String {
        format!("{}[{}]", self.description(), self.where_clause())
    }

    /// `true` if the filter must run as an in-memory pass.
    fn uses_alternate_filter(&self) -> bool {
        false
    }

    /// Keep the subset of `results` that passes, in input order.
    fn apply_alternate_filter(
        &self,
        results: Vec<SearchResult>,
        _env: &SearchEnv<'_>,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        Ok(results)
    }
}

fn join_display<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| quote(s.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn value_text_clause(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("value_text = {}", quote(name)))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// `obj_id` subquery over artifacts of `artifact_types` whose `kind`
/// attribute text is one of `names`.
fn artifact_name_clause(artifact_types: &[ArtifactType], kind: AttributeKind, names: &[String]) -> String {
    let types = match artifact_types {
        [single] => format!("artifact_type_id = {}", single.type_id()),
        many => format!(
            "({})",
            many.iter()
                .map(|t| format!("artifact_type_id = {}", t.type_id()))
                .collect::<Vec<_>>()
                .join(" OR ")
        ),
    };
    format!(
        "(obj_id IN (SELECT obj_id from blackboard_artifacts WHERE artifact_id IN \
         (SELECT artifact_id FROM blackboard_attributes WHERE {types} AND attribute_type_ID = {} \
         AND ({}))))",
        kind.type_id(),
        value_text_clause(names),
    )
}

fn format_day(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0).map_or_else(
        || epoch_seconds.to_string(),
        |date| date.format("%Y/%m/%d").to_string(),
    )
}

/// Retain results matching `keep`, checking cancellation per result.
fn retain_in_order(
    results: Vec<SearchResult>,
    env: &SearchEnv<'_>,
    stage: &'static str,
    mut keep: impl FnMut(&SearchResult) -> bool,
) -> DiscoveryResult<Vec<SearchResult>> {
    let mut kept = Vec::with_capacity(results.len());
    for result in results {
        env.context.check(stage)?;
        if keep(&result) {
            kept.push(result);
        }
    }
    Ok(kept)
}

// ---------------------------------------------------------------------------
// Artifact filters (domain searches)
// ---------------------------------------------------------------------------

/// Activity between two epoch-second timestamps, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDateRangeFilter {
    pub start: i64,
    pub end: i64,
}

impl ArtifactDateRangeFilter {
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

impl SearchFilter for ArtifactDateRangeFilter {
    fn where_clause(&self) -> String {
        let kinds = AttributeKind::DATE_KINDS
            .iter()
            .map(|k| format!("'{}'", k.type_id()))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "attribute_type_id IN ({kinds}) AND (value_int64 BETWEEN {} AND {})",
            self.start, self.end
        )
    }

    // Domain searches compare the range against the aggregated activity
    // window instead of individual attributes.
    fn domain_where_clause(&self) -> String {
        String::new()
    }

    fn domain_having_clause(&self) -> Option<String> {
        Some(format!(
            "MAX(activity.activity_date) >= {} AND MIN(activity.activity_date) <= {}",
            self.start, self.end
        ))
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();
        if self.start > 0 {
            parts.push(format!("after: {}", format_day(self.start)));
        }
        if self.end < OPEN_END_DATE {
            parts.push(format!("before: {}", format_day(self.end)));
        }
        if parts.is_empty() {
            "Activity date: any".to_string()
        } else {
            format!("Activity date {}", parts.join(" and "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTypeFilter {
    pub types: Vec<ArtifactType>,
}

impl ArtifactTypeFilter {
    #[must_use]
    pub const fn new(types: Vec<ArtifactType>) -> Self {
        Self { types }
    }

    fn clause_with(&self, column: &str, extra: &[ArtifactType]) -> String {
        let ids = self
            .types
            .iter()
            .chain(extra)
            .map(|t| format!("'{}'", t.type_id()))
            .collect::<Vec<_>>()
            .join(",");
        format!("{column} IN ({ids})")
    }
}

impl SearchFilter for ArtifactTypeFilter {
    fn where_clause(&self) -> String {
        self.clause_with("artifact_type_id", &[])
    }

    // Account type artifacts are needed to count known account types. The
    // domain query joins artifacts to attributes and both carry the column.
    fn domain_where_clause(&self) -> String {
        self.clause_with(
            "blackboard_artifacts.artifact_type_id",
            &[ArtifactType::WebAccountType],
        )
    }

    fn description(&self) -> String {
        format!(
            "Result type(s): {}",
            join_display(self.types.iter().map(|t| t.display_name()))
        )
    }
}

// ---------------------------------------------------------------------------
// File filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeFilter {
    pub sizes: Vec<FileSize>,
}

impl SizeFilter {
    #[must_use]
    pub const fn new(sizes: Vec<FileSize>) -> Self {
        Self { sizes }
    }
}

impl SearchFilter for SizeFilter {
    fn where_clause(&self) -> String {
        self.sizes
            .iter()
            .map(|size| match size.max_bytes() {
                Some(max) => format!("(size > '{}' AND size <= '{max}')", size.min_bytes()),
                None => format!("(size >= '{}')", size.min_bytes()),
            })
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    fn description(&self) -> String {
        format!(
            "Size(s): {}",
            join_display(self.sizes.iter().map(ToString::to_string))
        )
    }
}

/// One parent path condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentSearchTerm {
    pub search: String,
    /// Exact match when `true`, substring match otherwise.
    pub full_path: bool,
    /// Include matching files when `true`, exclude them otherwise.
    pub included: bool,
}

impl ParentSearchTerm {
    pub fn new(search: impl Into<String>, full_path: bool, included: bool) -> Self {
        Self {
            search: search.into(),
            full_path,
            included,
        }
    }

    #[must_use]
    pub fn sql(&self) -> String {
        match (self.included, self.full_path) {
            (true, true) => format!("parent_path={}", quote(&self.search)),
            (true, false) => format!("parent_path LIKE '%{}%'", escape_like_body(&self.search)),
            (false, true) => format!("parent_path!={}", quote(&self.search)),
            (false, false) => {
                format!("parent_path NOT LIKE '%{}%'", escape_like_body(&self.search))
            }
        }
    }
}

impl fmt::Display for ParentSearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.full_path { " (exact)" } else { " (substring)" };
        let polarity = if self.included { " (include)" } else { " (exclude)" };
        write!(f, "{}{mode}{polarity}", self.search)
    }
}

/// Include terms are OR-ed, exclude terms AND-ed, and the two parts AND-ed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentFilter {
    pub terms: Vec<ParentSearchTerm>,
}

impl ParentFilter {
    #[must_use]
    pub const fn new(terms: Vec<ParentSearchTerm>) -> Self {
        Self { terms }
    }
}

impl SearchFilter for ParentFilter {
    fn where_clause(&self) -> String {
        let (include, exclude): (Vec<_>, Vec<_>) = self.terms.iter().partition(|t| t.included);
        let wrap = |terms: Vec<&ParentSearchTerm>, joiner: &str| {
            if terms.is_empty() {
                String::new()
            } else {
                format!(
                    "({})",
                    terms.iter().map(|t| t.sql()).collect::<Vec<_>>().join(joiner)
                )
            }
        };
        let include = wrap(include, " OR ");
        let exclude = wrap(exclude, " AND ");
        if include.is_empty() || exclude.is_empty() {
            format!("{include}{exclude}")
        } else {
            format!("{include} AND {exclude}")
        }
    }

    fn description(&self) -> String {
        let terms = self.terms.iter().map(|t| {
            format!(
                "{}{}{}",
                t.search,
                if t.full_path { "(exact match)" } else { "(substring)" },
                if t.included { "(included)" } else { "(excluded)" },
            )
        });
        format!("Paths matching: {}", join_display(terms))
    }
}

/// A data source as referenced by filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceFilter {
    pub data_sources: Vec<DataSourceRef>,
}

impl DataSourceFilter {
    #[must_use]
    pub const fn new(data_sources: Vec<DataSourceRef>) -> Self {
        Self { data_sources }
    }
}

impl SearchFilter for DataSourceFilter {
    fn where_clause(&self) -> String {
        let ids = self
            .data_sources
            .iter()
            .map(|ds| format!("'{}'", ds.id))
            .collect::<Vec<_>>()
            .join(",");
        format!("data_source_obj_id IN ({ids})")
    }

    fn description(&self) -> String {
        format!(
            "Data source(s): {}",
            join_display(
                self.data_sources
                    .iter()
                    .map(|ds| format!("{}({})", ds.name, ds.id))
            )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordListFilter {
    pub list_names: Vec<String>,
}

impl KeywordListFilter {
    #[must_use]
    pub const fn new(list_names: Vec<String>) -> Self {
        Self { list_names }
    }
}

impl SearchFilter for KeywordListFilter {
    fn where_clause(&self) -> String {
        artifact_name_clause(
            &[ArtifactType::KeywordHit],
            AttributeKind::SetName,
            &self.list_names,
        )
    }

    fn description(&self) -> String {
        format!("Keywords in list(s): {}", join_display(&self.list_names))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeFilter {
    pub categories: Vec<FileType>,
}

impl FileTypeFilter {
    #[must_use]
    pub const fn new(categories: Vec<FileType>) -> Self {
        Self { categories }
    }
}

impl SearchFilter for FileTypeFilter {
    fn where_clause(&self) -> String {
        let mimes = self
            .categories
            .iter()
            .flat_map(|c| c.media_types().iter().copied());
        format!("mime_type IN ({})", quoted_list(mimes))
    }

    fn description(&self) -> String {
        format!(
            "Type: {}",
            join_display(self.categories.iter().map(|c| c.display_name()))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSetFilter {
    pub set_names: Vec<String>,
}

impl HashSetFilter {
    #[must_use]
    pub const fn new(set_names: Vec<String>) -> Self {
        Self { set_names }
    }
}

impl SearchFilter for HashSetFilter {
    fn where_clause(&self) -> String {
        artifact_name_clause(
            &[ArtifactType::HashsetHit],
            AttributeKind::SetName,
            &self.set_names,
        )
    }

    fn description(&self) -> String {
        format!("Hash set hits in set(s): {}", join_display(&self.set_names))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestingFileSetFilter {
    pub set_names: Vec<String>,
}

impl InterestingFileSetFilter {
    #[must_use]
    pub const fn new(set_names: Vec<String>) -> Self {
        Self { set_names }
    }
}

impl SearchFilter for InterestingFileSetFilter {
    fn where_clause(&self) -> String {
        artifact_name_clause(
            &[ArtifactType::InterestingFileHit, ArtifactType::InterestingItem],
            AttributeKind::SetName,
            &self.set_names,
        )
    }

    fn description(&self) -> String {
        format!(
            "Interesting item hits in set(s): {}",
            join_display(&self.set_names)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDetectionFilter {
    pub type_names: Vec<String>,
}

impl ObjectDetectionFilter {
    #[must_use]
    pub const fn new(type_names: Vec<String>) -> Self {
        Self { type_names }
    }
}

impl SearchFilter for ObjectDetectionFilter {
    fn where_clause(&self) -> String {
        artifact_name_clause(
            &[ArtifactType::ObjectDetected],
            AttributeKind::Description,
            &self.type_names,
        )
    }

    fn description(&self) -> String {
        format!("Objects detected in set(s): {}", join_display(&self.type_names))
    }
}

/// Notable: known-bad hash or a notable tag. Interesting: an interesting
/// item hit or a non-notable tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreFilter {
    pub scores: Vec<Score>,
}

impl ScoreFilter {
    #[must_use]
    pub const fn new(scores: Vec<Score>) -> Self {
        Self { scores }
    }
}

impl SearchFilter for ScoreFilter {
    fn where_clause(&self) -> String {
        let notable = self.scores.contains(&Score::Notable);
        let interesting = self.scores.contains(&Score::Interesting);
        let bad = FileKnown::Bad.db_value();
        let mut parts = Vec::new();
        if notable {
            parts.push(format!(" (known = {bad}) "));
        }
        if interesting {
            parts.push(format!(
                " (obj_id IN (SELECT obj_id from blackboard_artifacts WHERE artifact_type_id = {} OR artifact_type_id = {})) ",
                ArtifactType::InterestingItem.type_id(),
                ArtifactType::InterestingFileHit.type_id(),
            ));
        }
        match (notable, interesting) {
            (true, true) => parts.push("(obj_id IN (SELECT obj_id FROM content_tags))".to_string()),
            (true, false) => parts.push(format!(
                "(obj_id IN (SELECT obj_id FROM content_tags WHERE tag_name_id IN (SELECT tag_name_id FROM tag_names WHERE knownStatus = {bad})))"
            )),
            (false, true) => parts.push(format!(
                "(obj_id IN (SELECT obj_id FROM content_tags WHERE tag_name_id IN (SELECT tag_name_id FROM tag_names WHERE knownStatus != {bad})))"
            )),
            (false, false) => {}
        }
        parts.join(" OR ")
    }

    fn description(&self) -> String {
        format!(
            "Score(s) of : {}",
            join_display(self.scores.iter().map(|s| s.display_name()))
        )
    }
}

/// A tag definition as referenced by filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNameRef {
    pub id: i64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagsFilter {
    pub tag_names: Vec<TagNameRef>,
}

impl TagsFilter {
    #[must_use]
    pub const fn new(tag_names: Vec<TagNameRef>) -> Self {
        Self { tag_names }
    }
}

impl SearchFilter for TagsFilter {
    fn where_clause(&self) -> String {
        let ids = self
            .tag_names
            .iter()
            .map(|t| t.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("(obj_id IN (SELECT obj_id FROM content_tags WHERE tag_name_id IN ({ids})))")
    }

    fn description(&self) -> String {
        format!(
            "Tagged {}",
            join_display(self.tag_names.iter().map(|t| t.display_name.as_str()))
        )
    }
}

/// Files flagged as suspected user content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedFilter;

impl SearchFilter for UserCreatedFilter {
    fn where_clause(&self) -> String {
        format!(
            "(obj_id IN (SELECT obj_id from blackboard_artifacts WHERE artifact_id IN \
             (SELECT artifact_id FROM blackboard_attributes WHERE artifact_type_id = {})))",
            ArtifactType::UserContentSuspected.type_id()
        )
    }

    fn description(&self) -> String {
        "that contain EXIF data".to_string()
    }
}

/// Excludes files matched by a known-file hash set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFilter;

impl SearchFilter for KnownFilter {
    fn where_clause(&self) -> String {
        format!("known!={}", FileKnown::Known.db_value())
    }

    fn description(&self) -> String {
        "which are not known".to_string()
    }
}

// ---------------------------------------------------------------------------
// In-memory filters
// ---------------------------------------------------------------------------

/// Keep results whose cross-case frequency is one of `frequencies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyFilter {
    pub frequencies: Vec<Frequency>,
}

impl FrequencyFilter {
    #[must_use]
    pub const fn new(frequencies: Vec<Frequency>) -> Self {
        Self { frequencies }
    }
}

impl SearchFilter for FrequencyFilter {
    fn where_clause(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        format!(
            "Past occurrences: {}",
            join_display(self.frequencies.iter().map(|f| f.display_name()))
        )
    }

    fn uses_alternate_filter(&self) -> bool {
        true
    }

    fn apply_alternate_filter(
        &self,
        mut results: Vec<SearchResult>,
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }
        FrequencyAttribute.enrich(&mut results, env)?;
        retain_in_order(results, env, "frequency filter", |r| {
            self.frequencies.contains(&r.frequency())
        })
    }
}

/// Keep domains with at least one known account type. Files pass through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownAccountTypeFilter;

impl SearchFilter for KnownAccountTypeFilter {
    fn where_clause(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        "Only domains with known account type".to_string()
    }

    fn uses_alternate_filter(&self) -> bool {
        true
    }

    fn apply_alternate_filter(
        &self,
        results: Vec<SearchResult>,
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        retain_in_order(results, env, "known account type filter", |r| {
            r.as_domain().is_none_or(|d| d.has_known_account_type())
        })
    }
}

/// Keep results another case flagged as notable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviouslyNotableFilter;

impl SearchFilter for PreviouslyNotableFilter {
    fn where_clause(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        "Previously marked as notable in central repository".to_string()
    }

    fn uses_alternate_filter(&self) -> bool {
        true
    }

    fn apply_alternate_filter(
        &self,
        mut results: Vec<SearchResult>,
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }
        env.require_central_repo("previously notable filter")?;
        PreviouslyNotableAttribute.enrich(&mut results, env)?;
        retain_in_order(results, env, "previously notable filter", |r| {
            r.previously_notable() == PreviouslyNotable::PreviouslyNotable
        })
    }
}

/// Keep files whose hash any case in the central repository marked
/// known-bad. Domains never pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotableFilter;

impl SearchFilter for NotableFilter {
    fn where_clause(&self) -> String {
        String::new()
    }

    fn description(&self) -> String {
        "that were previously marked as notable".to_string()
    }

    fn uses_alternate_filter(&self) -> bool {
        true
    }

    fn apply_alternate_filter(
        &self,
        results: Vec<SearchResult>,
        env: &SearchEnv<'_>,
    ) -> DiscoveryResult<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }
        let repo = env.require_central_repo("notable filter")?;

        let mut hashes: Vec<String> = results
            .iter()
            .filter_map(SearchResult::as_file)
            .filter_map(|f| f.first_instance().md5.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        hashes.sort_unstable();
        hashes.dedup();

        let mut notable = std::collections::HashSet::new();
        for batch in hashes.chunks(env.config.file_hash_batch_size.max(1)) {
            env.context.check("notable filter")?;
            let bad = repo
                .known_bad_values(CorrelationKind::Files, batch)
                .map_err(|err| DiscoveryError::central_repo("notable filter", err))?;
            notable.extend(bad.into_iter().map(|v| v.to_ascii_lowercase()));
        }

        retain_in_order(results, env, "notable filter", |r| {
            r.as_file()
                .and_then(|f| f.first_instance().md5.as_deref())
                .is_some_and(|md5| notable.contains(&md5.trim().to_ascii_lowercase()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_filter_sql_and_description() {
        let filter = SizeFilter::new(vec![FileSize::XxLargeImage, FileSize::MediumImage]);
        assert_eq!(
            filter.where_clause(),
            "(size >= '200000000') OR (size > '100000' AND size <= '1000000')"
        );
        assert_eq!(
            filter.description(),
            "Size(s): XXLarge: 200MB+, Medium: 100KB-1MB"
        );
    }

    #[test]
    fn parent_filter_combines_include_and_exclude() {
        let filter = ParentFilter::new(vec![
            ParentSearchTerm::new("/Users/", true, true),
            ParentSearchTerm::new("Pictures", false, true),
            ParentSearchTerm::new("Temp", false, false),
        ]);
        assert_eq!(
            filter.where_clause(),
            "(parent_path='/Users/' OR parent_path LIKE '%Pictures%') AND (parent_path NOT LIKE '%Temp%')"
        );
        assert_eq!(
            filter.description(),
            "Paths matching: /Users/(exact match)(included), Pictures(substring)(included), Temp(substring)(excluded)"
        );
        assert_eq!(
            ParentSearchTerm::new("/a/", true, false).to_string(),
            "/a/ (exact) (exclude)"
        );
    }

    #[test]
    fn parent_filter_with_only_excludes() {
        let filter = ParentFilter::new(vec![ParentSearchTerm::new("/tmp/", true, false)]);
        assert_eq!(filter.where_clause(), "(parent_path!='/tmp/')");
    }

    #[test]
    fn string_literals_are_escaped() {
        let filter = KeywordListFilter::new(vec!["O'Hare".into()]);
        assert!(filter.where_clause().contains("value_text = 'O''Hare'"));
        let parent = ParentSearchTerm::new("it's", false, true);
        assert_eq!(parent.sql(), "parent_path LIKE '%it''s%'");
    }

    #[test]
    fn keyword_list_clause_matches_schema() {
        let filter = KeywordListFilter::new(vec!["a".into(), "b".into()]);
        assert_eq!(
            filter.where_clause(),
            "(obj_id IN (SELECT obj_id from blackboard_artifacts WHERE artifact_id IN \
             (SELECT artifact_id FROM blackboard_attributes WHERE artifact_type_id = 9 AND attribute_type_ID = 37 \
             AND (value_text = 'a' OR value_text = 'b'))))"
        );
        assert_eq!(filter.description(), "Keywords in list(s): a, b");
    }

    #[test]
    fn interesting_set_filter_covers_both_artifact_types() {
        let filter = InterestingFileSetFilter::new(vec!["watch".into()]);
        assert!(
            filter
                .where_clause()
                .contains("(artifact_type_id = 12 OR artifact_type_id = 64)")
        );
    }

    #[test]
    fn data_source_and_file_type_clauses() {
        let ds = DataSourceFilter::new(vec![
            DataSourceRef {
                id: 1,
                name: "disk.e01".into(),
            },
            DataSourceRef {
                id: 2,
                name: "phone".into(),
            },
        ]);
        assert_eq!(ds.where_clause(), "data_source_obj_id IN ('1','2')");
        assert_eq!(ds.description(), "Data source(s): disk.e01(1), phone(2)");

        let types = FileTypeFilter::new(vec![FileType::Image, FileType::Video]);
        assert!(types.where_clause().starts_with("mime_type IN ('image/bmp'"));
        assert!(types.where_clause().contains("'video/mp4'"));
        assert_eq!(types.description(), "Type: Image, Video");
    }

    #[test]
    fn score_filter_parts() {
        let both = ScoreFilter::new(vec![Score::Notable, Score::Interesting]);
        let sql = both.where_clause();
        assert!(sql.starts_with(" (known = 2) "));
        assert!(sql.ends_with("(obj_id IN (SELECT obj_id FROM content_tags))"));

        let notable = ScoreFilter::new(vec![Score::Notable]);
        assert!(notable.where_clause().contains("knownStatus = 2"));
        let interesting = ScoreFilter::new(vec![Score::Interesting]);
        assert!(interesting.where_clause().contains("knownStatus != 2"));
        assert!(!interesting.where_clause().contains("known = 2"));
        assert_eq!(both.description(), "Score(s) of : Notable, Interesting");
    }

    #[test]
    fn artifact_type_filter_widens_for_domains() {
        let filter = ArtifactTypeFilter::new(vec![ArtifactType::WebHistory, ArtifactType::WebCookie]);
        assert_eq!(filter.where_clause(), "artifact_type_id IN ('4','3')");
        assert_eq!(
            filter.domain_where_clause(),
            "blackboard_artifacts.artifact_type_id IN ('4','3','68')"
        );
        assert_eq!(filter.description(), "Result type(s): Web History, Web Cookies");
    }

    #[test]
    fn date_range_filter_clauses_and_description() {
        let filter = ArtifactDateRangeFilter::new(1_577_836_800, 1_609_459_199);
        assert_eq!(
            filter.where_clause(),
            "attribute_type_id IN ('2','31','33') AND (value_int64 BETWEEN 1577836800 AND 1609459199)"
        );
        assert!(filter.domain_where_clause().is_empty());
        assert_eq!(
            filter.domain_having_clause().as_deref(),
            Some("MAX(activity.activity_date) >= 1577836800 AND MIN(activity.activity_date) <= 1609459199")
        );
        assert_eq!(
            filter.description(),
            "Activity date after: 2020/01/01 and before: 2020/12/31"
        );
        assert_eq!(
            ArtifactDateRangeFilter::new(0, OPEN_END_DATE).description(),
            "Activity date: any"
        );
    }

    #[test]
    fn fixed_descriptions() {
        assert_eq!(KnownFilter.where_clause(), "known!=1");
        assert_eq!(KnownFilter.description(), "which are not known");
        assert_eq!(UserCreatedFilter.description(), "that contain EXIF data");
        assert!(UserCreatedFilter.where_clause().contains("artifact_type_id = 32"));
        assert_eq!(
            FrequencyFilter::new(vec![Frequency::Rare, Frequency::Common]).description(),
            "Past occurrences: Rare (2-10), Common (11 - 100)"
        );
        assert_eq!(
            TagsFilter::new(vec![TagNameRef {
                id: 4,
                display_name: "Evidence".into()
            }])
            .where_clause(),
            "(obj_id IN (SELECT obj_id FROM content_tags WHERE tag_name_id IN (4)))"
        );
    }

    #[test]
    fn in_memory_filters_declare_themselves() {
        assert!(FrequencyFilter::new(vec![]).uses_alternate_filter());
        assert!(NotableFilter.uses_alternate_filter());
        assert!(KnownAccountTypeFilter.uses_alternate_filter());
        assert!(PreviouslyNotableFilter.uses_alternate_filter());
        assert!(!SizeFilter::new(vec![]).uses_alternate_filter());
        assert!(NotableFilter.where_clause().is_empty());
    }
}
