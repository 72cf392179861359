//! Text previews for document results.

use serde::{Deserialize, Serialize};

use crate::store::{CaseStore, FileRow, StoreResult};

pub const NO_PREVIEW: &str = "No preview available.";
pub const NO_BYTES: &str = "No bytes read for document, unable to display preview.";

/// Sentences requested from an injected summarizer.
const SUMMARY_LENGTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSummary {
    pub text: String,
    /// Sample image found in the document, if any.
    pub sample_image: Option<Vec<u8>>,
    pub image_count: usize,
}

impl TextSummary {
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sample_image: None,
            image_count: 0,
        }
    }
}

/// Produces a short summary of a document.
pub trait TextSummarizer: Send + Sync {
    fn summarize(&self, store: &dyn CaseStore, file: &FileRow, length: usize) -> StoreResult<TextSummary>;
}

/// Summarize `file`. Never fails: a summarizer error yields [`NO_PREVIEW`],
/// and a blank summary falls back to the start of the file.
pub fn summarize(
    store: &dyn CaseStore,
    summarizer: Option<&dyn TextSummarizer>,
    file: &FileRow,
    prefix_bytes: usize,
) -> TextSummary {
    if let Some(summarizer) = summarizer {
        match summarizer.summarize(store, file, SUMMARY_LENGTH) {
            Ok(summary) if !summary.text.trim().is_empty() => return summary,
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(file_id = file.id, error = %err, "summarizer failed");
                return TextSummary::text_only(NO_PREVIEW);
            }
        }
    }
    default_summary(store, file, prefix_bytes)
}

/// The first `prefix_bytes` of the file as text, whitespace collapsed.
pub fn default_summary(store: &dyn CaseStore, file: &FileRow, prefix_bytes: usize) -> TextSummary {
    match store.read_content(file.id, prefix_bytes) {
        Ok(bytes) => {
            let text = collapse_whitespace(&String::from_utf8_lossy(&bytes));
            if text.is_empty() {
                TextSummary::text_only(NO_BYTES)
            } else {
                TextSummary::text_only(text)
            }
        }
        Err(err) => {
            tracing::warn!(file_id = file.id, error = %err, "could not read document for preview");
            TextSummary::text_only(NO_PREVIEW)
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_control_characters_collapse() {
        assert_eq!(collapse_whitespace("  a\n\n b\t\u{0}c  "), "a b c");
        assert_eq!(collapse_whitespace("\n \t"), "");
    }

    #[test]
    fn text_only_summary_has_no_images() {
        let summary = TextSummary::text_only(NO_PREVIEW);
        assert_eq!(summary.text, "No preview available.");
        assert_eq!(summary.image_count, 0);
        assert!(summary.sample_image.is_none());
    }
}
