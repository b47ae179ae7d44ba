//! Feedback-corrected page-range splitting for documents that are already
//! rendered: no cheap per-page estimate exists, so each candidate range is
//! rendered, measured, and grown or shrunk in fixed steps until it settles
//! near the budget.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::contract::{PageRangeSource, RenderError};

/// Range refinement parameters, in pages.
#[derive(Debug, Clone)]
pub struct RefineParams {
    /// Size of the first candidate range for each part.
    pub initial_pages: usize,
    /// Fixed grow/shrink step.
    pub step_pages: usize,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            initial_pages: 10,
            step_pages: 5,
        }
    }
}

/// One settled part: a contiguous half-open page range and its measured size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRange {
    pub number: usize,
    pub start: usize,
    pub end: usize,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Split a pre-rendered document into parts of at most `budget` bytes each,
/// writing `{output_prefix}_part{N}.{extension}` files.
///
/// Per part the refiner renders an initial candidate range, grows it by the
/// step while the measured size stays below budget and pages remain, then
/// shrinks it by the step while the size exceeds budget and more than a
/// step's worth of pages past the part start remains. A single page larger
/// than the budget is still emitted as its own part. A failed candidate
/// render keeps the last measured good range for that part; if no candidate
/// of a part ever rendered, those pages are skipped with an error logged and
/// refinement continues with the next part.
pub fn split_by_pages(
    source: &dyn PageRangeSource,
    budget: u64,
    output_prefix: &str,
    extension: &str,
    params: &RefineParams,
) -> Vec<PartRange> {
    let total = source.page_count();
    info!(pages = total, budget, prefix = output_prefix, "Splitting document by page ranges");

    let initial_pages = params.initial_pages.max(1);
    let step_pages = params.step_pages.max(1);
    let temp_path = PathBuf::from(format!("{output_prefix}_temp.{extension}"));
    let mut parts: Vec<PartRange> = Vec::new();
    let mut start = 0usize;
    let mut number = 1usize;

    while start < total {
        let initial_end = (start + initial_pages).min(total);

        // Last candidate that rendered successfully, with its measured size,
        // and the range currently sitting in the temp file (if any).
        let mut good: Option<(usize, u64)> = None;
        let mut written: Option<usize> = None;

        match source.render_range(start, initial_end, &temp_path) {
            Ok(size) => {
                good = Some((initial_end, size));
                written = Some(initial_end);
            }
            Err(e) => {
                error!(start, end = initial_end, error = ?e, "Initial candidate render failed")
            }
        }

        // GROWING: extend while below budget and unconsumed pages remain.
        while let Some((end, size)) = good {
            if size >= budget || end >= total {
                break;
            }
            let next = (end + step_pages).min(total);
            match source.render_range(start, next, &temp_path) {
                Ok(new_size) => {
                    good = Some((next, new_size));
                    written = Some(next);
                }
                Err(e) => {
                    warn!(start, end = next, error = ?e, "Grow candidate render failed, keeping previous range");
                    written = None;
                    break;
                }
            }
        }

        // SHRINKING: retract while above budget and the range still holds
        // more than a step's worth of pages past the part start.
        while let Some((end, size)) = good {
            if size <= budget || end <= start + step_pages {
                break;
            }
            let next = end - step_pages;
            match source.render_range(start, next, &temp_path) {
                Ok(new_size) => {
                    good = Some((next, new_size));
                    written = Some(next);
                }
                Err(e) => {
                    warn!(start, end = next, error = ?e, "Shrink candidate render failed, keeping previous range");
                    written = None;
                    break;
                }
            }
        }

        let Some((end, size)) = good else {
            error!(
                start,
                end = initial_end,
                "No candidate for this part could be rendered, skipping its pages"
            );
            start = initial_end;
            continue;
        };

        // SETTLED: move the candidate into place. The temp file already
        // holds the settled range unless a later candidate failed mid-write.
        let part_path = PathBuf::from(format!("{output_prefix}_part{number}.{extension}"));
        let settled = if written == Some(end) {
            std::fs::rename(&temp_path, &part_path)
                .map(|_| size)
                .map_err(RenderError::Io)
        } else {
            source.render_range(start, end, &part_path)
        };

        match settled {
            Ok(bytes) => {
                info!(
                    part = number,
                    first_page = start + 1,
                    last_page = end,
                    bytes,
                    path = %part_path.display(),
                    "Settled part"
                );
                parts.push(PartRange {
                    number,
                    start,
                    end,
                    path: part_path,
                    bytes,
                });
                number += 1;
            }
            Err(e) => {
                error!(part = number, start, end, error = ?e, "Failed to finalise settled part, skipping");
            }
        }

        start = end;
    }

    // Best-effort cleanup of a leftover candidate file.
    let _ = std::fs::remove_file(&temp_path);

    info!(parts = parts.len(), "Page-range splitting complete");
    parts
}
