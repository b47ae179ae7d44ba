/// # codebinder CLI Interface (Module)
///
/// This module implements the full CLI interface for codebinder: command
/// parsing, argument validation, and user-visible invocations.
///
/// All core business logic (collection, packing, rendering, jobs) lives in
/// the `codebinder-core` crate. This module is strictly for CLI glue.
///
/// ## Subcommands
/// - `collect`: run the full pipeline over a project archive or directory,
///   streaming progress events to stdout until the terminal event.
/// - `split`: run the page-range splitter alone over an existing rendered
///   document, writing `<prefix>_part{N}` files.
///
/// For programmatic/integration use, call [`run`] with a constructed
/// [`Cli`].
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use codebinder_core::contract::{Category, RenderFormat};
use codebinder_core::job::{self, DownloadRegistry, JobRequest};
use codebinder_core::refine::{split_by_pages, RefineParams};
use codebinder_core::render::PdfFile;

use crate::load_config::{apply, load_config};

/// CLI for codebinder: turn a code project into size-bounded PDF artifacts.
#[derive(Parser)]
#[clap(
    name = "codebinder",
    version,
    about = "Collect a source project into paginated, size-bounded PDF artifacts"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect a project (zip archive or directory) into PDF artifacts
    Collect {
        /// Project archive (.zip) or directory
        #[clap(long)]
        input: PathBuf,
        /// Requested output document path; derived from the input name when
        /// omitted
        #[clap(long)]
        output: Option<PathBuf>,
        /// Maximum artifact size in megabytes; 0 or less disables splitting
        #[clap(long, default_value_t = 0.39)]
        max_size: f64,
        /// Rendering format: human or machine
        #[clap(long, default_value = "human")]
        format: String,
        /// Comma-separated categories to include (regular,ios,android)
        #[clap(long)]
        include: Option<String>,
        /// Skip the structure-only document
        #[clap(long)]
        no_structure: bool,
        /// Print raw progress events as JSON lines
        #[clap(long)]
        json: bool,
        /// Path to a YAML config file with collection/packing overrides
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Split an existing rendered document into size-bounded parts
    Split {
        /// The rendered PDF document to split
        input_document: PathBuf,
        /// Maximum size of each part in megabytes
        #[clap(long, default_value_t = 0.39)]
        max_size: f64,
        /// Prefix for output part files (default: input name + "_split")
        #[clap(long)]
        output_prefix: Option<String>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Collect {
            input,
            output,
            max_size,
            format,
            include,
            no_structure,
            json,
            config,
        } => collect(input, output, max_size, format, include, no_structure, json, config).await,
        Commands::Split {
            input_document,
            max_size,
            output_prefix,
        } => split(input_document, max_size, output_prefix),
    }
}

#[allow(clippy::too_many_arguments)]
async fn collect(
    input: PathBuf,
    output: Option<PathBuf>,
    max_size: f64,
    format: String,
    include: Option<String>,
    no_structure: bool,
    json: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let output_name = match &output {
        Some(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("--output must name a file"))?,
        None => {
            let stem = input
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string());
            format!("{stem}_code.pdf")
        }
    };
    let output_dir = match &output {
        Some(path) => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
            _ => std::env::current_dir().ok(),
        },
        None => std::env::current_dir().ok(),
    };

    let mut request = JobRequest::new(input, output_name);
    request.budget_mb = max_size;
    request.format = RenderFormat::from(format.as_str());
    request.include_structure = !no_structure;
    request.output_dir = output_dir;
    if let Some(list) = include {
        request.include_categories = list
            .split(',')
            .map(|s| Category::from(s.trim()))
            .collect();
    }
    if let Some(path) = config {
        let overrides = load_config(path)?;
        apply(&overrides, &mut request);
    }

    let registry = DownloadRegistry::default();
    tracing::info!(command = "collect", "Starting collection job");
    let mut handle = job::submit_default(request, registry.clone())
        .map_err(|e| anyhow::anyhow!("Failed to submit job: {e:?}"))?;

    while let Some(event) = handle.events.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            if let (Some(progress), Some(message)) = (event.progress, &event.message) {
                println!("[{progress:>3}%] {message}");
            }
            if let Some(log) = &event.log {
                let kind = event.kind.as_deref().unwrap_or("info");
                println!("  [{kind}] {log}");
            }
        }
        if event.complete {
            break;
        }
    }
    handle.task.await?;

    match registry.lookup(handle.id) {
        Some(path) => {
            println!("Collection complete.\nDelivery: {}", path.display());
            Ok(())
        }
        None => {
            println!("Collection finished with nothing to deliver.");
            Ok(())
        }
    }
}

fn split(input_document: PathBuf, max_size: f64, output_prefix: Option<String>) -> Result<()> {
    if !input_document.exists() {
        anyhow::bail!(
            "Input document does not exist: {}",
            input_document.display()
        );
    }
    if max_size <= 0.0 {
        anyhow::bail!("--max-size must be positive");
    }

    let extension = input_document
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pdf".to_string());
    let prefix = output_prefix.unwrap_or_else(|| {
        format!("{}_split", input_document.with_extension("").display())
    });

    tracing::info!(command = "split", input = %input_document.display(), "Opening document");
    let source = PdfFile::open(&input_document)
        .map_err(|e| anyhow::anyhow!("Failed to read document: {e:?}"))?;
    let budget = (max_size * 1_048_576.0) as u64;
    let parts = split_by_pages(&source, budget, &prefix, &extension, &RefineParams::default());

    if parts.is_empty() {
        anyhow::bail!("Failed to split the document: no parts were produced");
    }
    println!("Split complete! Generated {} files:", parts.len());
    for part in &parts {
        println!(
            "  - {} (pages {}-{}, {:.2} MB)",
            part.path.display(),
            part.start + 1,
            part.end,
            part.bytes as f64 / 1_048_576.0
        );
    }
    Ok(())
}
