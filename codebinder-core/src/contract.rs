#![allow(unused)]

//! # contract: shared types and collaborator interfaces for the pipeline
//!
//! This module defines the data model of the packing engine (units, bins,
//! artifacts, categories) and the traits for its external collaborators:
//! the renderer that materialises a batch of units into one paginated
//! artifact, the archiver that extracts uploads and bundles artifact sets,
//! and the page-range source the post-hoc document splitter measures
//! against.
//!
//! ## Interface & Extensibility
//! - Implement [`Renderer`] to plug in a different document format.
//! - Implement [`Archiver`] to change how uploads are unpacked and how
//!   multi-artifact sets are bundled for delivery.
//! - Implement [`PageRangeSource`] to let the range refiner split any
//!   pre-rendered paginated document.
//!
//! ## Mocking & Testing
//! - All traits are annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests (enabled under the
//!   `test-export-mocks` feature, as for the rest of this workspace).

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use mockall::{automock, predicate::*};

/// One packable content item: a stable identity (path relative to the
/// project root) plus the content read for it and its estimated rendered
/// cost. Units are immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    /// Path relative to the project root, used for headings and ordering.
    pub rel_path: String,
    /// Content as read at packing time (sentinel text when unreadable).
    pub content: String,
    /// Estimated rendered byte cost of this unit.
    pub cost: u64,
}

/// Independent grouping of units. Categories are processed in the fixed
/// order of [`Category::ALL`]; no unit ever crosses a category boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Regular,
    Ios,
    Android,
}

impl Category {
    /// Fixed, caller-visible processing order.
    pub const ALL: [Category; 3] = [Category::Regular, Category::Ios, Category::Android];

    /// Human-readable banner label, as printed in document headings.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Regular => "Regular",
            Category::Ios => "iOS",
            Category::Android => "Android",
        }
    }

    /// Lowercase stem used when deriving artifact file names.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Category::Regular => "regular",
            Category::Ios => "ios",
            Category::Android => "android",
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        match s {
            "regular" | "Regular" => Category::Regular,
            "ios" | "iOS" | "Ios" => Category::Ios,
            "android" | "Android" => Category::Android,
            other => {
                tracing::warn!(category = other, "Unknown category, defaulting to Regular");
                Category::Regular
            }
        }
    }
}

/// Output rendering format. Machine format trades readability for a much
/// smaller rendered size (compact fonts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Human,
    Machine,
}

impl RenderFormat {
    /// File-name infix marking machine-format artifacts.
    pub fn infix(&self) -> &'static str {
        match self {
            RenderFormat::Human => "",
            RenderFormat::Machine => "_machine",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RenderFormat::Human => "Human-Readable Format (Standard Size)",
            RenderFormat::Machine => "Machine-Readable Format (Compact Size)",
        }
    }
}

impl From<&str> for RenderFormat {
    fn from(s: &str) -> Self {
        match s {
            "machine" | "Machine" | "compact" => RenderFormat::Machine,
            "human" | "Human" => RenderFormat::Human,
            other => {
                tracing::warn!(format = other, "Unknown render format, defaulting to human");
                RenderFormat::Human
            }
        }
    }
}

/// A contiguous group of units destined for one output artifact, plus its
/// running cost estimate. Bins are numbered from 1 within a category.
#[derive(Debug, Clone)]
pub struct Bin {
    pub number: usize,
    pub units: Vec<Unit>,
    pub estimated_bytes: u64,
}

/// One rendered output file.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub category: Option<Category>,
    pub part: Option<usize>,
    /// Actual size on disk, as reported by the renderer or archiver.
    pub bytes: u64,
}

/// Everything the renderer needs to materialise one artifact: the ordered
/// units of one closed bin plus the fixed preamble data (title, category
/// banner, part number, format).
#[derive(Debug, Clone)]
pub struct RenderBatch {
    pub title: String,
    pub category: Category,
    pub part: usize,
    pub format: RenderFormat,
    pub units: Vec<Unit>,
}

/// Error type for rendering operations.
#[derive(Debug)]
pub enum RenderError {
    Io(std::io::Error),
    /// A batch with no units cannot be materialised.
    EmptyBatch,
    /// The document library rejected the input or output.
    Document(String),
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Error type for archive operations (simple boxed error).
pub type ArchiveError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for materialising one batch of units into a paginated artifact on
/// disk. Returns the actual byte size of the produced file. A failure must
/// not corrupt artifacts produced by earlier calls.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, batch: RenderBatch, dest: &Path) -> Result<u64, RenderError>;
}

/// Trait for unpacking uploaded archives and bundling artifact sets for
/// delivery. Implemented by the zip-based default and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Extract an archive into the destination directory.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError>;

    /// Bundle the given files (flat, by base name) into one archive,
    /// returning the archive's byte size.
    async fn bundle(&self, files: &[PathBuf], dest: &Path) -> Result<u64, ArchiveError>;

    /// Bundle a directory tree, preserving relative paths, returning the
    /// archive's byte size.
    async fn bundle_dir(&self, dir: &Path, dest: &Path) -> Result<u64, ArchiveError>;
}

/// Source of pre-rendered pages for the range refiner: the only operations
/// the refiner needs are the total page count and "materialise the pages
/// `start..end` to a file and tell me how big it came out".
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait PageRangeSource {
    fn page_count(&self) -> usize;

    /// Render the half-open page range `start..end` to `dest`, returning
    /// the written file's size in bytes.
    fn render_range(&self, start: usize, end: usize, dest: &Path) -> Result<u64, RenderError>;
}
