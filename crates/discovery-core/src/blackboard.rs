//! Identifiers for the case store's artifact and attribute tables.
//!
//! The numeric ids match the case store schema and appear verbatim in the
//! query fragments built by the filters, so they are part of the store
//! contract rather than an internal detail.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Artifact types the discovery engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    WebBookmark,
    WebCookie,
    WebHistory,
    WebDownload,
    KeywordHit,
    HashsetHit,
    InterestingFileHit,
    WebSearchQuery,
    InterestingArtifactHit,
    UserContentSuspected,
    ObjectDetected,
    WebCache,
    InterestingItem,
    WebAccountType,
    WebCategorization,
}

impl ArtifactType {
    /// Artifact types that make up a domain result.
    pub const DOMAIN_TYPES: [Self; 6] = [
        Self::WebBookmark,
        Self::WebCache,
        Self::WebCookie,
        Self::WebDownload,
        Self::WebHistory,
        Self::WebSearchQuery,
    ];

    #[must_use]
    pub const fn type_id(self) -> i32 {
        match self {
            Self::WebBookmark => 2,
            Self::WebCookie => 3,
            Self::WebHistory => 4,
            Self::WebDownload => 5,
            Self::KeywordHit => 9,
            Self::HashsetHit => 10,
            Self::InterestingFileHit => 12,
            Self::WebSearchQuery => 15,
            Self::InterestingArtifactHit => 24,
            Self::UserContentSuspected => 32,
            Self::ObjectDetected => 37,
            Self::WebCache => 41,
            Self::InterestingItem => 64,
            Self::WebAccountType => 68,
            Self::WebCategorization => 69,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::WebBookmark => "Web Bookmarks",
            Self::WebCookie => "Web Cookies",
            Self::WebHistory => "Web History",
            Self::WebDownload => "Web Downloads",
            Self::KeywordHit => "Keyword Hits",
            Self::HashsetHit => "Hashset Hits",
            Self::InterestingFileHit => "Interesting Files",
            Self::WebSearchQuery => "Web Search",
            Self::InterestingArtifactHit => "Interesting Results",
            Self::UserContentSuspected => "User Content Suspected",
            Self::ObjectDetected => "Objects Detected",
            Self::WebCache => "Web Cache",
            Self::InterestingItem => "Interesting Items",
            Self::WebAccountType => "Web Account Type",
            Self::WebCategorization => "Web Categories",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Attribute types attached to artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Url,
    DateTime,
    Name,
    Description,
    PathId,
    Domain,
    DateTimeCreated,
    DateTimeAccessed,
    SetName,
    Text,
}

impl AttributeKind {
    /// Timestamp attributes consulted by activity date filtering.
    pub const DATE_KINDS: [Self; 3] = [Self::DateTime, Self::DateTimeCreated, Self::DateTimeAccessed];

    #[must_use]
    pub const fn type_id(self) -> i32 {
        match self {
            Self::Url => 1,
            Self::DateTime => 2,
            Self::Name => 3,
            Self::Description => 16,
            Self::PathId => 19,
            Self::Domain => 29,
            Self::DateTimeCreated => 31,
            Self::DateTimeAccessed => 33,
            Self::SetName => 37,
            Self::Text => 36,
        }
    }
}

/// Known status of a file as recorded by hash lookups in the case store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKnown {
    #[default]
    Unknown,
    Known,
    Bad,
}

impl FileKnown {
    /// Value stored in the `known` column.
    #[must_use]
    pub const fn db_value(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Known => 1,
            Self::Bad => 2,
        }
    }
}

/// Correlation attribute kinds understood by the central repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationKind {
    /// MD5 content hashes.
    Files,
    /// Network domains.
    Domain,
}

impl fmt::Display for CorrelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Files => f.write_str("files"),
            Self::Domain => f.write_str("domain"),
        }
    }
}
