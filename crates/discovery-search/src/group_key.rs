//! Group keys: the comparable, display-named value that decides which group a
//! result lands in.
//!
//! Keys of different kinds are ordered by their [`GroupKeyKind`]
//! discriminant first. Keys of the same kind compare by their payload. The
//! `Ord`, `Eq` and `Hash` impls agree: equal keys always compare `Equal` and
//! hash identically.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::DateTime;
use discovery_core::{FileSize, FileType, Frequency, PageViews, PreviouslyNotable};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// Discriminant of a [`GroupKey`], compared before any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKeyKind {
    FileSize,
    FileType,
    KeywordList,
    FileTag,
    Frequency,
    ParentPath,
    DataSource,
    HashSet,
    InterestingItem,
    ObjectDetected,
    LastActivityDate,
    FirstActivityDate,
    PageViews,
    PreviouslyNotable,
    DomainCategory,
    NoGrouping,
}

// ---------------------------------------------------------------------------
// NameList
// ---------------------------------------------------------------------------

/// A sorted list of names rendered as one comma-joined string. Two lists are
/// the same key when their joined strings match. Empty lists sort last.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameList {
    names: Vec<String>,
    joined: String,
}

impl NameList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let joined = names.join(",");
        Self { names, joined }
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn joined(&self) -> &str {
        &self.joined
    }

    fn display_or<'a>(&'a self, empty: &'a str) -> &'a str {
        if self.is_empty() { empty } else { &self.joined }
    }
}

impl PartialEq for NameList {
    fn eq(&self, other: &Self) -> bool {
        self.joined == other.joined
    }
}

impl Eq for NameList {}

impl Hash for NameList {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.joined.hash(state);
    }
}

impl Ord for NameList {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.joined.cmp(&other.joined),
        }
    }
}

impl PartialOrd for NameList {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// ActivityDay
// ---------------------------------------------------------------------------

/// A UTC calendar day, stored as days since the Unix epoch. Later days sort
/// first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivityDay(i64);

impl ActivityDay {
    #[must_use]
    pub const fn from_epoch_seconds(seconds: i64) -> Self {
        Self(seconds.div_euclid(SECONDS_PER_DAY))
    }

    #[must_use]
    pub const fn days_since_epoch(self) -> i64 {
        self.0
    }
}

impl Ord for ActivityDay {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

impl PartialOrd for ActivityDay {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ActivityDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp(self.0.saturating_mul(SECONDS_PER_DAY), 0) {
            Some(date) => write!(f, "{}", date.format("%b %d, %Y")),
            None => write!(f, "day {}", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// GroupKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupKey {
    FileSize { size: FileSize },
    FileType { file_type: FileType },
    KeywordList { lists: NameList },
    FileTag { tags: NameList },
    Frequency { frequency: Frequency },
    /// Containing directory. `id` is -1 when the directory could not be
    /// resolved and `path` then holds the raw parent path.
    ParentPath { path: String, id: i64 },
    /// Compared and hashed by `id` only; `name` is for display.
    DataSource { id: i64, name: Option<String> },
    HashSet { sets: NameList },
    InterestingItem { sets: NameList },
    ObjectDetected { objects: NameList },
    LastActivityDate { day: ActivityDay },
    FirstActivityDate { day: ActivityDay },
    PageViews { views: PageViews },
    PreviouslyNotable { status: PreviouslyNotable },
    DomainCategory { categories: NameList },
    NoGrouping,
}

impl GroupKey {
    #[must_use]
    pub const fn kind(&self) -> GroupKeyKind {
        match self {
            Self::FileSize { .. } => GroupKeyKind::FileSize,
            Self::FileType { .. } => GroupKeyKind::FileType,
            Self::KeywordList { .. } => GroupKeyKind::KeywordList,
            Self::FileTag { .. } => GroupKeyKind::FileTag,
            Self::Frequency { .. } => GroupKeyKind::Frequency,
            Self::ParentPath { .. } => GroupKeyKind::ParentPath,
            Self::DataSource { .. } => GroupKeyKind::DataSource,
            Self::HashSet { .. } => GroupKeyKind::HashSet,
            Self::InterestingItem { .. } => GroupKeyKind::InterestingItem,
            Self::ObjectDetected { .. } => GroupKeyKind::ObjectDetected,
            Self::LastActivityDate { .. } => GroupKeyKind::LastActivityDate,
            Self::FirstActivityDate { .. } => GroupKeyKind::FirstActivityDate,
            Self::PageViews { .. } => GroupKeyKind::PageViews,
            Self::PreviouslyNotable { .. } => GroupKeyKind::PreviouslyNotable,
            Self::DomainCategory { .. } => GroupKeyKind::DomainCategory,
            Self::NoGrouping => GroupKeyKind::NoGrouping,
        }
    }

    /// Text shown for the group.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::FileSize { size } => size.to_string(),
            Self::FileType { file_type } => file_type.to_string(),
            Self::KeywordList { lists: names }
            | Self::FileTag { tags: names }
            | Self::HashSet { sets: names }
            | Self::InterestingItem { sets: names }
            | Self::ObjectDetected { objects: names } => names.display_or("None").to_string(),
            Self::DomainCategory { categories } => {
                categories.display_or("Uncategorized").to_string()
            }
            Self::Frequency { frequency } => frequency.to_string(),
            Self::ParentPath { path, .. } => path.clone(),
            Self::DataSource { id, name } => match name {
                Some(name) => format!("{name}(ID: {id})"),
                None => format!("Data source (ID: {id})"),
            },
            Self::LastActivityDate { day } | Self::FirstActivityDate { day } => day.to_string(),
            Self::PageViews { views } => views.to_string(),
            Self::PreviouslyNotable { status } => status.to_string(),
            Self::NoGrouping => "All Files".to_string(),
        }
    }

    fn cmp_same_kind(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::FileSize { size: a }, Self::FileSize { size: b }) => {
                a.ranking().cmp(&b.ranking())
            }
            (Self::FileType { file_type: a }, Self::FileType { file_type: b }) => {
                a.ranking().cmp(&b.ranking())
            }
            (Self::Frequency { frequency: a }, Self::Frequency { frequency: b }) => {
                a.ranking().cmp(&b.ranking())
            }
            (Self::PageViews { views: a }, Self::PageViews { views: b }) => {
                a.ranking().cmp(&b.ranking())
            }
            (Self::PreviouslyNotable { status: a }, Self::PreviouslyNotable { status: b }) => {
                a.ranking().cmp(&b.ranking())
            }
            (Self::KeywordList { lists: a }, Self::KeywordList { lists: b })
            | (Self::FileTag { tags: a }, Self::FileTag { tags: b })
            | (Self::HashSet { sets: a }, Self::HashSet { sets: b })
            | (Self::InterestingItem { sets: a }, Self::InterestingItem { sets: b })
            | (Self::ObjectDetected { objects: a }, Self::ObjectDetected { objects: b })
            | (Self::DomainCategory { categories: a }, Self::DomainCategory { categories: b }) => {
                a.cmp(b)
            }
            (
                Self::ParentPath { path: pa, id: ia },
                Self::ParentPath { path: pb, id: ib },
            ) => pa.cmp(pb).then_with(|| ia.cmp(ib)),
            (Self::DataSource { id: a, .. }, Self::DataSource { id: b, .. }) => a.cmp(b),
            (Self::LastActivityDate { day: a }, Self::LastActivityDate { day: b })
            | (Self::FirstActivityDate { day: a }, Self::FirstActivityDate { day: b }) => a.cmp(b),
            // Only reached for NoGrouping, the single-valued kind.
            _ => Ordering::Equal,
        }
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind()
            .cmp(&other.kind())
            .then_with(|| self.cmp_same_kind(other))
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Self::FileSize { size } => size.hash(state),
            Self::FileType { file_type } => file_type.hash(state),
            Self::Frequency { frequency } => frequency.hash(state),
            Self::PageViews { views } => views.hash(state),
            Self::PreviouslyNotable { status } => status.hash(state),
            Self::KeywordList { lists: names }
            | Self::FileTag { tags: names }
            | Self::HashSet { sets: names }
            | Self::InterestingItem { sets: names }
            | Self::ObjectDetected { objects: names }
            | Self::DomainCategory { categories: names } => names.hash(state),
            Self::ParentPath { path, id } => {
                path.hash(state);
                id.hash(state);
            }
            Self::DataSource { id, .. } => id.hash(state),
            Self::LastActivityDate { day } | Self::FirstActivityDate { day } => day.hash(state),
            Self::NoGrouping => {}
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
