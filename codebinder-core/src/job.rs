//! Job orchestration: per-job context, structured progress events, the
//! pending-downloads registry, and the extract → collect → pack → render →
//! finalise pipeline run by one background worker task per submitted job.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::archive::ZipArchiver;
use crate::collect::{self, SourceFile};
use crate::config::PipelineConfig;
use crate::contract::{Archiver, Artifact, Category, RenderBatch, RenderFormat, Renderer, Unit};
use crate::estimate;
use crate::finalise;
use crate::pack::{self, PackParams};
use crate::render::{self, PdfRenderer};

/// One structured progress update, as observed on the job's event channel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl ProgressEvent {
    fn empty() -> Self {
        Self {
            timestamp: Local::now().to_rfc3339(),
            progress: None,
            message: None,
            log: None,
            kind: None,
            complete: false,
            download_url: None,
        }
    }
}

/// Best-effort, one-way sender for progress events. Sending never blocks and
/// never fails the pipeline: with no observer the events are simply dropped
/// when the job completes.
#[derive(Clone)]
pub struct Progress {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl Progress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sender that discards everything, for callers without observers.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    fn send(&self, event: ProgressEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::debug!(event = %json, "Progress event"),
            Err(e) => error!(error = ?e, "Failed to serialize progress event"),
        }
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn percent(&self, progress: u8, message: &str, log: &str) {
        let mut ev = ProgressEvent::empty();
        ev.progress = Some(progress);
        ev.message = Some(message.to_string());
        ev.log = Some(log.to_string());
        ev.kind = Some("info".to_string());
        self.send(ev);
    }

    pub fn log(&self, log: &str, kind: &str) {
        let mut ev = ProgressEvent::empty();
        ev.log = Some(log.to_string());
        ev.kind = Some(kind.to_string());
        self.send(ev);
    }

    pub fn complete(&self, message: &str, download_url: Option<String>) {
        let mut ev = ProgressEvent::empty();
        ev.progress = Some(100);
        ev.message = Some(message.to_string());
        ev.complete = true;
        ev.download_url = download_url;
        self.send(ev);
    }
}

/// Process-wide map from job identifier to the produced delivery artifact.
/// Appends are keyed by job id, so concurrent jobs never contend; the owning
/// worker is the only writer for its key.
#[derive(Clone, Default)]
pub struct DownloadRegistry {
    inner: Arc<Mutex<HashMap<Uuid, PathBuf>>>,
}

impl DownloadRegistry {
    pub fn register(&self, id: Uuid, path: PathBuf) {
        self.inner
            .lock()
            .expect("download registry poisoned")
            .insert(id, path);
    }

    pub fn lookup(&self, id: Uuid) -> Option<PathBuf> {
        self.inner
            .lock()
            .expect("download registry poisoned")
            .get(&id)
            .cloned()
    }
}

/// Explicit per-job state passed to every stage, replacing module-level
/// globals: the job id, its event channel, and the shared registry.
pub struct JobContext {
    pub id: Uuid,
    pub progress: Progress,
    pub registry: DownloadRegistry,
}

#[derive(Debug)]
pub enum JobError {
    /// The input archive or directory does not exist (no job is created).
    MissingInput(PathBuf),
    /// The requested output name is empty (no job is created).
    EmptyOutputName,
    Io(std::io::Error),
}

impl From<std::io::Error> for JobError {
    fn from(e: std::io::Error) -> Self {
        JobError::Io(e)
    }
}

/// Everything a submitted job needs.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// A `.zip` archive or a project directory.
    pub input: PathBuf,
    /// Requested output document name, e.g. `myproject_code.pdf`.
    pub output_name: String,
    /// Maximum artifact size in megabytes; zero or negative disables
    /// splitting.
    pub budget_mb: f64,
    pub format: RenderFormat,
    /// Categories to include, in the fixed processing order.
    pub include_categories: Vec<Category>,
    /// Extra directory names to exclude on top of the defaults.
    pub extra_excluded_dirs: Vec<String>,
    /// Whether to produce the structure-only document alongside the code
    /// documents.
    pub include_structure: bool,
    /// Where artifacts are written; defaults to the job's working directory.
    pub output_dir: Option<PathBuf>,
    pub pipeline: PipelineConfig,
}

impl JobRequest {
    pub fn new(input: PathBuf, output_name: impl Into<String>) -> Self {
        Self {
            input,
            output_name: output_name.into(),
            budget_mb: 0.39,
            format: RenderFormat::Human,
            include_categories: Category::ALL.to_vec(),
            extra_excluded_dirs: Vec::new(),
            include_structure: true,
            output_dir: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Handle returned on submission: the job id, the live event stream, and the
/// worker task handle.
pub struct JobHandle {
    pub id: Uuid,
    pub events: UnboundedReceiver<ProgressEvent>,
    pub task: tokio::task::JoinHandle<()>,
}

struct PipelineOutcome {
    message: String,
    download: Option<PathBuf>,
}

/// Submit a job with the default PDF renderer and zip archiver.
pub fn submit_default(request: JobRequest, registry: DownloadRegistry) -> Result<JobHandle, JobError> {
    submit(request, registry, PdfRenderer, ZipArchiver)
}

/// Validate the request and spawn the background worker. Input errors are
/// rejected here, before any job exists. The returned event stream always
/// reaches a terminal `complete` event.
pub fn submit<R, A>(
    request: JobRequest,
    registry: DownloadRegistry,
    renderer: R,
    archiver: A,
) -> Result<JobHandle, JobError>
where
    R: Renderer + 'static,
    A: Archiver + 'static,
{
    if !request.input.exists() {
        return Err(JobError::MissingInput(request.input));
    }
    if request.output_name.trim().is_empty() {
        return Err(JobError::EmptyOutputName);
    }

    let id = Uuid::new_v4();
    let (tx, rx) = unbounded_channel();
    let ctx = JobContext {
        id,
        progress: Progress::new(tx),
        registry,
    };
    info!(job = %id, input = %request.input.display(), "Job accepted");

    let task = tokio::spawn(async move {
        let outcome = run_pipeline(&ctx, &request, &renderer, &archiver).await;
        match outcome {
            Ok(out) => {
                let url = out.download.as_ref().map(|path| {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    ctx.registry.register(ctx.id, path.clone());
                    format!("/download?filename={}&task_id={}", filename, ctx.id)
                });
                info!(job = %ctx.id, message = %out.message, "Job complete");
                ctx.progress.complete(&out.message, url);
            }
            Err(e) => {
                error!(job = %ctx.id, error = %e, "Job failed");
                ctx.progress.log(&format!("Error: {e}"), "error");
                ctx.progress.complete("Process failed", None);
            }
        }
    });

    Ok(JobHandle { id, events: rx, task })
}

async fn run_pipeline<R, A>(
    ctx: &JobContext,
    request: &JobRequest,
    renderer: &R,
    archiver: &A,
) -> Result<PipelineOutcome, String>
where
    R: Renderer,
    A: Archiver,
{
    let progress = &ctx.progress;
    request.pipeline.trace_loaded();

    let workdir = tempfile::Builder::new()
        .prefix("codebinder_")
        .tempdir()
        .map_err(|e| format!("Failed to create working directory: {e}"))?
        .keep();

    // Unpack, or use a directory input as-is.
    let project_root = if request.input.is_file() {
        progress.percent(5, "Extracting archive", "Unpacking project files...");
        let extract_dir = workdir.join("extract");
        archiver
            .extract(&request.input, &extract_dir)
            .await
            .map_err(|e| format!("Extraction failed: {e}"))?;
        progress.percent(10, "Extraction complete", "Archive extracted successfully");
        detect_project_root(&extract_dir, progress)
    } else {
        progress.log("Using directory input as project root", "info");
        request.input.clone()
    };

    let (base_name, extension) = split_output_name(&request.output_name);
    let title = format!("Code Collection: {base_name}");

    // Collect and filter.
    progress.percent(15, "Collecting code files", "Scanning project structure...");
    let mut collect_config = request.pipeline.collect.clone();
    collect_config
        .excluded_dirs
        .extend(request.extra_excluded_dirs.iter().cloned());
    let files = collect::collect_files(&project_root, &collect_config, progress)
        .map_err(|e| format!("File collection failed: {e}"))?;

    let included: Vec<(Category, &[SourceFile])> = Category::ALL
        .iter()
        .filter(|c| request.include_categories.contains(*c))
        .map(|c| (*c, files.get(*c)))
        .filter(|(_, list)| !list.is_empty())
        .collect();
    let total_selected: usize = included.iter().map(|(_, list)| list.len()).sum();
    progress.log(
        &format!("Total files selected for processing: {total_selected}"),
        "info",
    );
    if total_selected == 0 {
        warn!(job = %ctx.id, "No code files found in the project");
        progress.log("No code files found in the project", "warning");
        return Ok(PipelineOutcome {
            message: "No files to process".to_string(),
            download: None,
        });
    }

    let artifacts_dir = request.output_dir.clone().unwrap_or_else(|| workdir.clone());
    std::fs::create_dir_all(&artifacts_dir)
        .map_err(|e| format!("Failed to create output directory: {e}"))?;
    let infix = request.format.infix();

    // Structure-only document (non-fatal on failure).
    let mut extras: Vec<Artifact> = Vec::new();
    if request.include_structure {
        progress.percent(40, "Generating structure document", "Rendering project structure");
        let tree = collect::folder_tree(&project_root, &collect_config);
        let structure_path = artifacts_dir.join(format!("{base_name}_structure{infix}.{extension}"));
        match render::render_structure(&title, &tree, request.format, &structure_path) {
            Ok(bytes) => {
                progress.log(
                    &format!("Structure document generated ({:.2} KB)", bytes as f64 / 1024.0),
                    "info",
                );
                extras.push(Artifact {
                    path: structure_path,
                    category: None,
                    part: None,
                    bytes,
                });
            }
            Err(e) => {
                error!(job = %ctx.id, error = ?e, "Error generating structure document");
                progress.log("Error generating structure document", "error");
            }
        }
    }

    // Pack and render every included category through the same pipeline.
    let budget = if request.budget_mb > 0.0 {
        Some((request.budget_mb * 1_048_576.0) as u64)
    } else {
        None
    };
    let pack_params = PackParams {
        budget,
        header_cost: request.pipeline.header_cost,
    };

    let mut per_category: Vec<Vec<Artifact>> = Vec::new();
    let mut bins_attempted = 0usize;
    let mut bins_rendered = 0usize;
    let band = 45.0 / included.len() as f64;

    for (idx, (category, list)) in included.iter().enumerate() {
        let progress_start = 45.0 + band * idx as f64;
        let units: Vec<Unit> = list
            .iter()
            .map(|f| {
                let content = estimate::read_unit_content(&f.abs_path);
                let cost = estimate::estimate(&content, &request.pipeline.estimate);
                Unit {
                    rel_path: f.rel_path.clone(),
                    content,
                    cost,
                }
            })
            .collect();

        let bins = pack::pack(units, &pack_params);
        let total_bins = bins.len();
        let mut artifacts: Vec<Artifact> = Vec::new();
        for bin in bins {
            bins_attempted += 1;
            let part = bin.number;
            let dest = artifacts_dir.join(format!(
                "{base_name}_{}{infix}_part{part}.{extension}",
                category.file_stem()
            ));
            let batch = RenderBatch {
                title: title.clone(),
                category: *category,
                part,
                format: request.format,
                units: bin.units,
            };
            let pct = (progress_start + band * part as f64 / total_bins as f64).min(90.0) as u8;
            progress.percent(
                pct,
                &format!("Creating {} document part {part}", category.label()),
                &format!("Rendering part {part} of {total_bins}"),
            );
            match renderer.render(batch, &dest).await {
                Ok(bytes) => {
                    bins_rendered += 1;
                    progress.log(
                        &format!("Generated: {} ({:.2} KB)", dest.display(), bytes as f64 / 1024.0),
                        "info",
                    );
                    artifacts.push(Artifact {
                        path: dest,
                        category: Some(*category),
                        part: Some(part),
                        bytes,
                    });
                }
                Err(e) => {
                    error!(job = %ctx.id, part, error = ?e, "Error rendering document part");
                    progress.log(&format!("Error rendering part {part}: {e:?}"), "error");
                }
            }
        }
        per_category.push(artifacts);
    }

    // All parts failed: fall back to a plain text archive so the caller
    // still gets the collected code.
    if bins_rendered == 0 && bins_attempted > 0 {
        progress.percent(60, "Document generation failed", "Falling back to text files");
        let fallback = text_fallback(&workdir, &included, archiver).await?;
        return Ok(PipelineOutcome {
            message: "Text files created".to_string(),
            download: Some(fallback),
        });
    }

    // Finalise: normalise names, bundle when more than one artifact exists.
    progress.percent(90, "Finalising artifacts", "Normalising names and bundling");
    let requested = artifacts_dir.join(&request.output_name);
    let bundle_dest = artifacts_dir.join(format!("{base_name}_pdfs{infix}.zip"));
    let final_set = finalise::finalise(
        &requested,
        extras,
        per_category,
        &bundle_dest,
        archiver,
    )
    .await;

    for artifact in &final_set.artifacts {
        progress.log(
            &format!(
                "Artifact: {} ({:.2} KB)",
                artifact.path.display(),
                artifact.bytes as f64 / 1024.0
            ),
            "info",
        );
    }

    let download = final_set
        .delivery_path()
        .map(Path::to_path_buf)
        .ok_or_else(|| "No artifacts were produced".to_string())?;
    Ok(PipelineOutcome {
        message: "Files ready for download".to_string(),
        download: Some(download),
    })
}

/// A single top-level directory in the extraction root is the project root;
/// anything else means the archive root itself is the project.
fn detect_project_root(extract_dir: &Path, progress: &Progress) -> PathBuf {
    let entries: Vec<PathBuf> = std::fs::read_dir(extract_dir)
        .map(|iter| iter.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    if entries.len() == 1 && entries[0].is_dir() {
        let name = entries[0]
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        progress.log(&format!("Project root identified: {name}"), "info");
        entries[0].clone()
    } else {
        progress.log("Using archive root as project directory", "info");
        extract_dir.to_path_buf()
    }
}

fn split_output_name(output_name: &str) -> (String, String) {
    match output_name.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() => (base.to_string(), ext.to_string()),
        _ => (output_name.to_string(), "pdf".to_string()),
    }
}

/// Write every collected unit as a plain text file, preserving the relative
/// layout under a per-category directory, and bundle the lot.
async fn text_fallback<A>(
    workdir: &Path,
    included: &[(Category, &[SourceFile])],
    archiver: &A,
) -> Result<PathBuf, String>
where
    A: Archiver,
{
    let text_dir = workdir.join("code_files_text");
    for (category, list) in included {
        let category_dir = text_dir.join(category.file_stem());
        for file in *list {
            let dest = category_dir.join(&file.rel_path);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create text fallback directory: {e}"))?;
            }
            let content = estimate::read_unit_content(&file.abs_path);
            std::fs::write(&dest, content)
                .map_err(|e| format!("Failed to write text fallback file: {e}"))?;
        }
    }
    let dest = workdir.join("code_files.zip");
    archiver
        .bundle_dir(&text_dir, &dest)
        .await
        .map_err(|e| format!("Failed to bundle text fallback: {e}"))?;
    Ok(dest)
}
