//! Artifact naming normalisation and delivery bundling.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::contract::{Archiver, Artifact};

/// Final ordered artifact set for one job.
#[derive(Debug, Clone)]
pub struct FinalArtifacts {
    /// All artifacts, extras first, then categories in processing order.
    pub artifacts: Vec<Artifact>,
    /// Present when more than one artifact was bundled for delivery.
    pub bundle: Option<Artifact>,
}

impl FinalArtifacts {
    /// The single file to hand out for download: the bundle when one was
    /// produced, otherwise the sole artifact.
    pub fn delivery_path(&self) -> Option<&Path> {
        self.bundle
            .as_ref()
            .map(|a| a.path.as_path())
            .or_else(|| self.artifacts.first().map(|a| a.path.as_path()))
    }
}

/// Normalise names and assemble the final artifact set.
///
/// A category that produced exactly one part loses its `_partN` suffix, so
/// single-part categories look identical to an unsplit run. If the whole set
/// is one artifact it takes the originally requested output name. Sets with
/// more than one member are bundled into one archive via the [`Archiver`].
/// Rename and bundle failures are logged and non-fatal: whatever artifacts
/// exist are still delivered.
pub async fn finalise(
    requested_output: &Path,
    extras: Vec<Artifact>,
    per_category: Vec<Vec<Artifact>>,
    bundle_dest: &Path,
    archiver: &dyn Archiver,
) -> FinalArtifacts {
    let mut artifacts: Vec<Artifact> = extras;

    for mut category_artifacts in per_category {
        if category_artifacts.len() == 1 {
            let single = &mut category_artifacts[0];
            if let Some(collapsed) = strip_part_suffix(&single.path) {
                match std::fs::rename(&single.path, &collapsed) {
                    Ok(()) => {
                        info!(
                            from = %single.path.display(),
                            to = %collapsed.display(),
                            "Renamed single part to unsuffixed name"
                        );
                        single.path = collapsed;
                        single.part = None;
                    }
                    Err(e) => {
                        warn!(
                            error = ?e,
                            path = %single.path.display(),
                            "Failed to rename single part, keeping suffixed name"
                        );
                    }
                }
            }
        }
        artifacts.extend(category_artifacts);
    }

    // A lone artifact overall takes the originally requested output name.
    if artifacts.len() == 1 && artifacts[0].path != requested_output {
        match std::fs::rename(&artifacts[0].path, requested_output) {
            Ok(()) => {
                info!(to = %requested_output.display(), "Renamed lone artifact to requested output name");
                artifacts[0].path = requested_output.to_path_buf();
                artifacts[0].part = None;
            }
            Err(e) => {
                warn!(error = ?e, "Failed to rename lone artifact, keeping generated name");
            }
        }
    }

    if artifacts.len() > 1 {
        let files: Vec<PathBuf> = artifacts.iter().map(|a| a.path.clone()).collect();
        match archiver.bundle(&files, bundle_dest).await {
            Ok(bytes) => {
                info!(
                    members = files.len(),
                    bytes,
                    path = %bundle_dest.display(),
                    "Bundled artifact set for delivery"
                );
                return FinalArtifacts {
                    artifacts,
                    bundle: Some(Artifact {
                        path: bundle_dest.to_path_buf(),
                        category: None,
                        part: None,
                        bytes,
                    }),
                };
            }
            Err(e) => {
                error!(error = ?e, "Bundling artifacts failed, delivering individually");
            }
        }
    }

    FinalArtifacts {
        artifacts,
        bundle: None,
    }
}

/// `base_part3.pdf` -> `base.pdf`; `None` when the name carries no suffix.
fn strip_part_suffix(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let idx = stem.rfind("_part")?;
    let digits = &stem[idx + "_part".len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(path.with_file_name(format!("{}.{}", &stem[..idx], ext)))
}

#[cfg(test)]
mod tests {
    use super::strip_part_suffix;
    use std::path::{Path, PathBuf};

    #[test]
    fn strips_numeric_part_suffix_only() {
        assert_eq!(
            strip_part_suffix(Path::new("/tmp/out_regular_part1.pdf")),
            Some(PathBuf::from("/tmp/out_regular.pdf"))
        );
        assert_eq!(strip_part_suffix(Path::new("/tmp/out_partial.pdf")), None);
        assert_eq!(strip_part_suffix(Path::new("/tmp/out.pdf")), None);
    }
}
