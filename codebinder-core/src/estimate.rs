//! Unit cost estimation: deterministic rendered-size estimates for content
//! units, and tolerant content reading.

use std::path::Path;
use tracing::warn;

/// Sentinel stored in place of content that could not be read or decoded.
pub const UNREADABLE_SENTINEL: &str = "[Binary file or encoding error - content not displayed]";

/// Tuning constants for the rendered-size estimate.
///
/// The floor keeps bins honest when a project holds hundreds of trivial
/// files: real per-unit layout overhead dominates tiny content, so without a
/// floor a bin would appear to have room for far more units than the
/// rendered output can hold.
#[derive(Debug, Clone)]
pub struct EstimateParams {
    /// Estimated rendered bytes per character of source text.
    pub bytes_per_char: u64,
    /// Fixed per-unit overhead for headings and layout, in bytes.
    pub unit_overhead: u64,
    /// Lower bound on any single unit's contribution, in bytes.
    pub unit_floor: u64,
}

impl Default for EstimateParams {
    fn default() -> Self {
        Self {
            bytes_per_char: 2,
            unit_overhead: 5_000,
            unit_floor: 30 * 1024,
        }
    }
}

/// Estimate the rendered byte contribution of one unit's content.
///
/// Pure: the same content and params always yield the same estimate, so
/// packing decisions are reproducible.
pub fn estimate(content: &str, params: &EstimateParams) -> u64 {
    let raw = content.len() as u64 * params.bytes_per_char + params.unit_overhead;
    raw.max(params.unit_floor)
}

/// Read a unit's content from disk. Never fails: unreadable or undecodable
/// content becomes the sentinel placeholder, estimated like any other
/// content, with a warning logged.
pub fn read_unit_content(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = ?e, "Undecodable content, substituting placeholder");
                UNREADABLE_SENTINEL.to_string()
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = ?e, "Unreadable content, substituting placeholder");
            UNREADABLE_SENTINEL.to_string()
        }
    }
}
