use std::fs;
use std::path::{Path, PathBuf};

use codebinder_core::contract::{Category, MockRenderer, RenderError, RenderFormat};
use codebinder_core::job::{
    submit, submit_default, DownloadRegistry, JobError, JobHandle, JobRequest, ProgressEvent,
};
use serial_test::serial;
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    let root = dir.path();
    for i in 0..6 {
        write(root, &format!("src/module_{i}.py"), &"x = 1\n".repeat(200));
    }
    write(root, "ios/App.swift", "import Foundation\n");
    write(root, "node_modules/skip.js", "junk\n");
    dir
}

/// Drain the event stream until the terminal event, which must arrive.
async fn drain(handle: &mut JobHandle) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        let ev = handle
            .events
            .recv()
            .await
            .expect("event stream closed before the terminal event");
        let done = ev.complete;
        events.push(ev);
        if done {
            return events;
        }
    }
}

#[tokio::test]
#[serial]
async fn a_directory_job_runs_to_completion_with_a_download() {
    let dir = project();
    let registry = DownloadRegistry::default();
    let request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    let mut handle = submit_default(request, registry.clone()).unwrap();

    let events = drain(&mut handle).await;
    handle.task.await.unwrap();

    let terminal = events.last().unwrap();
    assert_eq!(terminal.progress, Some(100));
    assert!(terminal.download_url.is_some(), "job must offer a download");

    let delivery = registry.lookup(handle.id).expect("delivery must be registered");
    assert!(delivery.exists());
    assert!(events.iter().any(|e| e.progress == Some(40)), "collection band must be reported");
}

#[tokio::test]
#[serial]
async fn a_small_budget_splits_a_category_into_parts() {
    let dir = project();
    let registry = DownloadRegistry::default();
    let out = tempdir().unwrap();
    let mut request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    // ~0.05 MB budget with 30 KiB unit floors forces one unit per bin.
    request.budget_mb = 0.05;
    request.output_dir = Some(out.path().to_path_buf());
    let mut handle = submit_default(request, registry.clone()).unwrap();
    drain(&mut handle).await;
    handle.task.await.unwrap();

    let parts: Vec<PathBuf> = fs::read_dir(out.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().unwrap().to_string_lossy().contains("_regular"))
        .collect();
    assert!(
        parts.len() > 1,
        "six regular files under a 50 KB budget must split, got {parts:?}"
    );
}

#[tokio::test]
#[serial]
async fn no_budget_and_no_structure_collapses_to_the_requested_name() {
    let dir = project();
    let registry = DownloadRegistry::default();
    let out = tempdir().unwrap();
    let mut request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    request.budget_mb = 0.0;
    request.include_structure = false;
    request.include_categories = vec![Category::Regular];
    request.output_dir = Some(out.path().to_path_buf());
    let mut handle = submit_default(request, registry.clone()).unwrap();
    drain(&mut handle).await;
    handle.task.await.unwrap();

    let delivery = registry.lookup(handle.id).unwrap();
    assert_eq!(delivery, out.path().join("demo_code.pdf"));
    assert!(delivery.exists());
}

#[tokio::test]
#[serial]
async fn machine_format_is_reflected_in_artifact_names() {
    let dir = project();
    let registry = DownloadRegistry::default();
    let out = tempdir().unwrap();
    let mut request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    request.budget_mb = 0.0;
    request.format = RenderFormat::Machine;
    request.include_structure = false;
    request.include_categories = vec![Category::Regular, Category::Ios];
    request.output_dir = Some(out.path().to_path_buf());
    let mut handle = submit_default(request, registry.clone()).unwrap();
    drain(&mut handle).await;
    handle.task.await.unwrap();

    assert!(out.path().join("demo_code_regular_machine.pdf").exists());
    assert!(out.path().join("demo_code_ios_machine.pdf").exists());
}

#[tokio::test]
async fn a_missing_input_is_rejected_before_a_job_exists() {
    let registry = DownloadRegistry::default();
    let request = JobRequest::new(PathBuf::from("/definitely/not/here.zip"), "out.pdf");
    match submit_default(request, registry) {
        Err(JobError::MissingInput(_)) => {}
        Err(other) => panic!("expected MissingInput, got {other:?}"),
        Ok(_) => panic!("expected MissingInput, got a job handle"),
    }
}

#[tokio::test]
async fn an_empty_output_name_is_rejected_before_a_job_exists() {
    let dir = tempdir().unwrap();
    let registry = DownloadRegistry::default();
    let request = JobRequest::new(dir.path().to_path_buf(), "  ");
    match submit_default(request, registry) {
        Err(JobError::EmptyOutputName) => {}
        Err(other) => panic!("expected EmptyOutputName, got {other:?}"),
        Ok(_) => panic!("expected EmptyOutputName, got a job handle"),
    }
}

#[tokio::test]
#[serial]
async fn a_project_without_code_files_completes_without_a_download() {
    let dir = tempdir().unwrap();
    write(dir.path(), "notes.txt", "nothing collectable\n");
    let registry = DownloadRegistry::default();
    let request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    let mut handle = submit_default(request, registry.clone()).unwrap();

    let events = drain(&mut handle).await;
    handle.task.await.unwrap();

    let terminal = events.last().unwrap();
    assert!(terminal.download_url.is_none());
    assert!(registry.lookup(handle.id).is_none());
    assert!(events
        .iter()
        .any(|e| e.kind.as_deref() == Some("warning")));
}

#[tokio::test]
#[serial]
async fn render_failures_fall_back_to_a_text_archive() {
    let dir = project();
    let registry = DownloadRegistry::default();
    let mut request = JobRequest::new(dir.path().to_path_buf(), "demo_code.pdf");
    request.include_structure = false;

    let mut renderer = MockRenderer::new();
    renderer
        .expect_render()
        .returning(|_, _| Err(RenderError::Document("font table corrupt".to_string())));

    let mut handle = submit(
        request,
        registry.clone(),
        renderer,
        codebinder_core::archive::ZipArchiver,
    )
    .unwrap();
    let events = drain(&mut handle).await;
    handle.task.await.unwrap();

    let terminal = events.last().unwrap();
    // With the system zip tool available the fallback archive is delivered;
    // without it the job still terminates, as a failure.
    if terminal.download_url.is_some() {
        let delivery = registry.lookup(handle.id).unwrap();
        assert!(delivery.ends_with("code_files.zip"));
        assert!(delivery.exists());
    } else {
        assert!(registry.lookup(handle.id).is_none());
    }
}
