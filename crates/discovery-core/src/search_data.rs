//! Enumerations describing how a discovery result is classified.
//!
//! Every enum here carries a `ranking` used for ordering groups and results.
//! Lower rankings sort first. Display strings are what the presentation layer
//! shows and also feed into search cache keys, so they must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per megabyte as used by the size buckets (decimal, not binary).
pub const BYTES_PER_MB: u64 = 1_000_000;

// ── Frequency ───────────────────────────────────────────────────────────────

/// How often a file hash or domain has been seen across cases.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Unique,
    Rare,
    Common,
    VeryCommon,
    Known,
    #[default]
    Unknown,
}

impl Frequency {
    pub const ALL: [Self; 6] = [
        Self::Unique,
        Self::Rare,
        Self::Common,
        Self::VeryCommon,
        Self::Known,
        Self::Unknown,
    ];

    #[must_use]
    pub const fn ranking(self) -> u8 {
        match self {
            Self::Unique => 0,
            Self::Rare => 1,
            Self::Common => 2,
            Self::VeryCommon => 3,
            Self::Known => 4,
            Self::Unknown => 5,
        }
    }

    /// Upper bound (inclusive) of occurrences for the count-derived buckets.
    #[must_use]
    pub const fn max_occurrences(self) -> Option<u64> {
        match self {
            Self::Unique => Some(1),
            Self::Rare => Some(10),
            Self::Common => Some(100),
            Self::VeryCommon | Self::Known | Self::Unknown => None,
        }
    }

    /// Bucket a cross-case occurrence count.
    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count <= 1 {
            Self::Unique
        } else if count <= 10 {
            Self::Rare
        } else if count <= 100 {
            Self::Common
        } else {
            Self::VeryCommon
        }
    }

    /// Values offered for filtering when a central repository is available.
    #[must_use]
    pub const fn options_with_central_repo() -> &'static [Self] {
        &[
            Self::Unique,
            Self::Rare,
            Self::Common,
            Self::VeryCommon,
            Self::Known,
        ]
    }

    /// Values offered for filtering without a central repository.
    #[must_use]
    pub const fn options_without_central_repo() -> &'static [Self] {
        &[Self::Known, Self::Unknown]
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Unique => "Unique (1)",
            Self::Rare => "Rare (2-10)",
            Self::Common => "Common (11 - 100)",
            Self::VeryCommon => "Very Common (100+)",
            Self::Known => "Known (NSRL)",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Previously notable ──────────────────────────────────────────────────────

/// Whether the central repository has flagged the item as notable in a
/// previous case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviouslyNotable {
    PreviouslyNotable,
    #[default]
    NotPreviouslyNotable,
}

impl PreviouslyNotable {
    #[must_use]
    pub const fn ranking(self) -> u8 {
        match self {
            Self::PreviouslyNotable => 0,
            Self::NotPreviouslyNotable => 1,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::PreviouslyNotable => "Previously Notable",
            Self::NotPreviouslyNotable => "Previously Not Notable",
        }
    }
}

impl fmt::Display for PreviouslyNotable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Page views ──────────────────────────────────────────────────────────────

/// Page-view buckets for domains, most visited first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageViews {
    Over1000,
    UpTo1000,
    UpTo500,
    UpTo100,
    UpTo50,
    UpTo10,
}

impl PageViews {
    pub const ALL: [Self; 6] = [
        Self::Over1000,
        Self::UpTo1000,
        Self::UpTo500,
        Self::UpTo100,
        Self::UpTo50,
        Self::UpTo10,
    ];

    /// Inclusive `(min, max)` page-view range covered by the bucket.
    #[must_use]
    pub const fn bounds(self) -> (u64, u64) {
        match self {
            Self::Over1000 => (1001, u64::MAX),
            Self::UpTo1000 => (501, 1000),
            Self::UpTo500 => (101, 500),
            Self::UpTo100 => (51, 100),
            Self::UpTo50 => (11, 50),
            Self::UpTo10 => (0, 10),
        }
    }

    #[must_use]
    pub const fn covers(self, count: u64) -> bool {
        let (min, max) = self.bounds();
        count >= min && count <= max
    }

    #[must_use]
    pub const fn from_count(count: u64) -> Self {
        if count > 1000 {
            Self::Over1000
        } else if count > 500 {
            Self::UpTo1000
        } else if count > 100 {
            Self::UpTo500
        } else if count > 50 {
            Self::UpTo100
        } else if count > 10 {
            Self::UpTo50
        } else {
            Self::UpTo10
        }
    }

    #[must_use]
    pub const fn ranking(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PageViews {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::Over1000 {
            return f.write_str("1000+ page views");
        }
        let (min, max) = self.bounds();
        write!(f, "{min}-{max} page views")
    }
}

// ── File size ───────────────────────────────────────────────────────────────

/// Size buckets. Video files use the video table, everything else the image
/// table. A size belongs to a bucket when `min < size <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSize {
    XxLargeVideo,
    XLargeVideo,
    LargeVideo,
    MediumVideo,
    SmallVideo,
    XSmallVideo,
    XxLargeImage,
    XLargeImage,
    LargeImage,
    MediumImage,
    SmallImage,
    XSmallImage,
}

impl FileSize {
    pub const VIDEO: [Self; 6] = [
        Self::XxLargeVideo,
        Self::XLargeVideo,
        Self::LargeVideo,
        Self::MediumVideo,
        Self::SmallVideo,
        Self::XSmallVideo,
    ];

    pub const IMAGE: [Self; 6] = [
        Self::XxLargeImage,
        Self::XLargeImage,
        Self::LargeImage,
        Self::MediumImage,
        Self::SmallImage,
        Self::XSmallImage,
    ];

    #[must_use]
    pub const fn ranking(self) -> u8 {
        self as u8
    }

    /// Exclusive lower bound in bytes.
    #[must_use]
    pub const fn min_bytes(self) -> u64 {
        match self {
            Self::XxLargeVideo => 10_000 * BYTES_PER_MB,
            Self::XLargeVideo => 5_000 * BYTES_PER_MB,
            Self::LargeVideo => 1_000 * BYTES_PER_MB,
            Self::MediumVideo => 100 * BYTES_PER_MB,
            Self::SmallVideo => 500_000,
            Self::XxLargeImage => 200 * BYTES_PER_MB,
            Self::XLargeImage => 50 * BYTES_PER_MB,
            Self::LargeImage => BYTES_PER_MB,
            Self::MediumImage => 100_000,
            Self::SmallImage => 16_000,
            Self::XSmallVideo | Self::XSmallImage => 0,
        }
    }

    /// Inclusive upper bound in bytes; `None` for the open-ended buckets.
    #[must_use]
    pub const fn max_bytes(self) -> Option<u64> {
        match self {
            Self::XxLargeVideo | Self::XxLargeImage => None,
            Self::XLargeVideo => Some(10_000 * BYTES_PER_MB),
            Self::LargeVideo => Some(5_000 * BYTES_PER_MB),
            Self::MediumVideo => Some(1_000 * BYTES_PER_MB),
            Self::SmallVideo => Some(100 * BYTES_PER_MB),
            Self::XSmallVideo => Some(500_000),
            Self::XLargeImage => Some(200 * BYTES_PER_MB),
            Self::LargeImage => Some(50 * BYTES_PER_MB),
            Self::MediumImage => Some(BYTES_PER_MB),
            Self::SmallImage => Some(100_000),
            Self::XSmallImage => Some(16_000),
        }
    }

    #[must_use]
    pub const fn size_group(self) -> &'static str {
        match self {
            Self::XxLargeVideo | Self::XxLargeImage => "XXLarge",
            Self::XLargeVideo | Self::XLargeImage => "XLarge",
            Self::LargeVideo | Self::LargeImage => "Large",
            Self::MediumVideo | Self::MediumImage => "Medium",
            Self::SmallVideo | Self::SmallImage => "Small",
            Self::XSmallVideo | Self::XSmallImage => "XSmall",
        }
    }

    #[must_use]
    pub const fn display_size(self) -> &'static str {
        match self {
            Self::XxLargeVideo => ": 10GB+",
            Self::XLargeVideo => ": 5-10GB",
            Self::LargeVideo => ": 1-5GB",
            Self::MediumVideo => ": 100MB-1GB",
            Self::SmallVideo => ": 500KB-100MB",
            Self::XSmallVideo => ": 0-500KB",
            Self::XxLargeImage => ": 200MB+",
            Self::XLargeImage => ": 50-200MB",
            Self::LargeImage => ": 1-50MB",
            Self::MediumImage => ": 100KB-1MB",
            Self::SmallImage => ": 16-100KB",
            Self::XSmallImage => ": 0-16KB",
        }
    }

    const fn covers(self, size: u64) -> bool {
        match self.max_bytes() {
            Some(max) => size > self.min_bytes() && size <= max,
            None => size > self.min_bytes(),
        }
    }

    fn pick(table: &[Self; 6], size: u64) -> Self {
        table
            .iter()
            .copied()
            .find(|bucket| bucket.covers(size))
            .unwrap_or(table[5])
    }

    #[must_use]
    pub fn from_video_size(size: u64) -> Self {
        Self::pick(&Self::VIDEO, size)
    }

    #[must_use]
    pub fn from_image_size(size: u64) -> Self {
        Self::pick(&Self::IMAGE, size)
    }

    /// Bucket a file size using the table appropriate for the file type.
    #[must_use]
    pub fn for_file(file_type: FileType, size: u64) -> Self {
        if file_type == FileType::Video {
            Self::from_video_size(size)
        } else {
            Self::from_image_size(size)
        }
    }

    /// Buckets offered for filtering files of the given type.
    #[must_use]
    pub const fn options_for(file_type: FileType) -> &'static [Self; 6] {
        match file_type {
            FileType::Video => &Self::VIDEO,
            _ => &Self::IMAGE,
        }
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.size_group(), self.display_size())
    }
}

// ── File type ───────────────────────────────────────────────────────────────

const IMAGE_MIME_TYPES: &[&str] = &[
    "image/bmp",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "image/webp",
    "image/heic",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/vnd.adobe.photoshop",
    "image/x-ms-bmp",
    "image/x-raw-nikon",
    "image/x-rgb",
    "image/x-xbitmap",
    "image/x-portable-bitmap",
    "image/x-portable-graymap",
];

const AUDIO_MIME_TYPES: &[&str] = &[
    "audio/midi",
    "audio/mpeg",
    "audio/mp4",
    "audio/ogg",
    "audio/webm",
    "audio/wav",
    "audio/vnd.wave",
    "audio/x-wav",
    "audio/x-aiff",
    "audio/flac",
    "audio/x-flac",
    "audio/x-ms-wma",
];

const VIDEO_MIME_TYPES: &[&str] = &[
    "video/3gpp",
    "video/3gpp2",
    "video/mp4",
    "video/mpeg",
    "video/ogg",
    "video/quicktime",
    "video/webm",
    "video/x-flv",
    "video/x-m4v",
    "video/x-ms-wmv",
    "video/x-msvideo",
];

const EXECUTABLE_MIME_TYPES: &[&str] = &[
    "application/x-bat",
    "application/x-dosexec",
    "application/vnd.microsoft.portable-executable",
    "application/x-msdownload",
    "application/exe",
    "application/x-exe",
    "application/dos-exe",
    "vms/exe",
    "application/x-winexe",
    "application/msdos-windows",
    "application/x-msdos-program",
];

// Discovery uses its own document list rather than the generic category.
const DOCUMENT_MIME_TYPES: &[&str] = &[
    "text/html",
    "text/csv",
    "application/rtf",
    "application/pdf",
    "application/xhtml+xml",
    "application/x-msoffice",
    "application/msword",
    "application/msword2",
    "application/vnd.wordperfect",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.ms-excel.sheet.4",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.oasis.opendocument.presentation",
    "application/vnd.oasis.opendocument.spreadsheet",
    "application/vnd.oasis.opendocument.text",
];

/// Category of a result. `Domain` is used for domain results, every other
/// variant classifies files by MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Image,
    Audio,
    Video,
    Executable,
    Document,
    #[default]
    Other,
    Domain,
}

impl FileType {
    pub const FILE_TYPES: [Self; 6] = [
        Self::Image,
        Self::Audio,
        Self::Video,
        Self::Executable,
        Self::Document,
        Self::Other,
    ];

    #[must_use]
    pub const fn ranking(self) -> u8 {
        match self {
            Self::Image => 0,
            Self::Audio => 1,
            Self::Video => 2,
            Self::Executable => 3,
            Self::Document => 4,
            Self::Other => 5,
            Self::Domain => 6,
        }
    }

    /// MIME types that define this category. `Other` and `Domain` have none.
    #[must_use]
    pub const fn media_types(self) -> &'static [&'static str] {
        match self {
            Self::Image => IMAGE_MIME_TYPES,
            Self::Audio => AUDIO_MIME_TYPES,
            Self::Video => VIDEO_MIME_TYPES,
            Self::Executable => EXECUTABLE_MIME_TYPES,
            Self::Document => DOCUMENT_MIME_TYPES,
            Self::Other | Self::Domain => &[],
        }
    }

    /// Classify a MIME type; unrecognised or missing types map to `Other`.
    #[must_use]
    pub fn from_mime_type(mime: Option<&str>) -> Self {
        let Some(mime) = mime.map(str::trim).filter(|m| !m.is_empty()) else {
            return Self::Other;
        };
        let mime = mime.to_ascii_lowercase();
        Self::FILE_TYPES
            .into_iter()
            .find(|ty| ty.media_types().contains(&mime.as_str()))
            .unwrap_or(Self::Other)
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Audio => "Audio",
            Self::Video => "Video",
            Self::Executable => "Executable",
            Self::Document => "Document",
            Self::Other => "Other/Unknown",
            Self::Domain => "Domain",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ── Score ───────────────────────────────────────────────────────────────────

/// Investigative score of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    Notable,
    Interesting,
    #[default]
    Unknown,
}

impl Score {
    #[must_use]
    pub const fn ranking(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Notable => "Notable",
            Self::Interesting => "Interesting",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
