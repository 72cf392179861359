//! Core types for case discovery search.
//!
//! This crate holds the value types shared by the engine and its callers:
//! result classification enums, case store identifiers and configuration.
//! It performs no I/O.

#![forbid(unsafe_code)]

pub mod blackboard;
pub mod config;
pub mod search_data;

pub use blackboard::{ArtifactType, AttributeKind, CorrelationKind, FileKnown};
pub use config::DiscoveryConfig;
pub use search_data::{FileSize, FileType, Frequency, PageViews, PreviouslyNotable, Score};
