use std::path::Path;

use codebinder_core::contract::{
    Category, PageRangeSource, RenderBatch, RenderError, RenderFormat, Renderer, Unit,
};
use codebinder_core::render::{render_structure, PdfFile, PdfRenderer};
use tempfile::tempdir;

fn batch(format: RenderFormat, lines: usize) -> RenderBatch {
    let content = "let value = compute_something_interesting(input);\n".repeat(lines);
    RenderBatch {
        title: "Code Collection: demo".to_string(),
        category: Category::Regular,
        part: 1,
        format,
        units: vec![
            Unit {
                rel_path: "src/lib.rs".to_string(),
                content: content.clone(),
                cost: 0,
            },
            Unit {
                rel_path: "src/main.rs".to_string(),
                content,
                cost: 0,
            },
        ],
    }
}

fn assert_pdf_magic(path: &Path) {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.len() > 100, "document is implausibly small");
    assert_eq!(&bytes[0..4], b"%PDF", "missing PDF magic header");
}

#[tokio::test]
async fn renders_a_batch_to_a_valid_document() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out_regular_part1.pdf");
    let bytes = PdfRenderer
        .render(batch(RenderFormat::Human, 50), &dest)
        .await
        .expect("rendering failed");

    assert_pdf_magic(&dest);
    assert_eq!(bytes, std::fs::metadata(&dest).unwrap().len());
}

#[tokio::test]
async fn an_empty_batch_is_rejected() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("empty.pdf");
    let mut empty = batch(RenderFormat::Human, 1);
    empty.units.clear();

    match PdfRenderer.render(empty, &dest).await {
        Err(RenderError::EmptyBatch) => {}
        other => panic!("expected EmptyBatch, got {other:?}"),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn machine_format_paginates_more_compactly_than_human() {
    let dir = tempdir().unwrap();
    let human_path = dir.path().join("human.pdf");
    let machine_path = dir.path().join("machine.pdf");

    PdfRenderer
        .render(batch(RenderFormat::Human, 400), &human_path)
        .await
        .unwrap();
    PdfRenderer
        .render(batch(RenderFormat::Machine, 400), &machine_path)
        .await
        .unwrap();

    let human_pages = PdfFile::open(&human_path).unwrap().page_count();
    let machine_pages = PdfFile::open(&machine_path).unwrap().page_count();
    assert!(
        machine_pages < human_pages,
        "machine format ({machine_pages} pages) should undercut human format ({human_pages} pages)"
    );
}

#[tokio::test]
async fn rendered_documents_reopen_with_their_pages() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("doc.pdf");
    PdfRenderer
        .render(batch(RenderFormat::Human, 300), &dest)
        .await
        .unwrap();

    let file = PdfFile::open(&dest).expect("reopening our own output failed");
    assert!(file.page_count() > 1, "300 lines must paginate");

    let range_path = dir.path().join("slice.pdf");
    let bytes = file.render_range(0, 1, &range_path).expect("range render failed");
    assert_pdf_magic(&range_path);
    assert_eq!(bytes, std::fs::metadata(&range_path).unwrap().len());

    let slice = PdfFile::open(&range_path).unwrap();
    assert_eq!(slice.page_count(), 1);
}

#[tokio::test]
async fn invalid_page_ranges_are_rejected() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("doc.pdf");
    PdfRenderer
        .render(batch(RenderFormat::Human, 10), &dest)
        .await
        .unwrap();

    let file = PdfFile::open(&dest).unwrap();
    let pages = file.page_count();
    let out = dir.path().join("slice.pdf");
    assert!(file.render_range(0, pages + 1, &out).is_err());
    assert!(file.render_range(3, 3, &out).is_err());
}

#[test]
fn structure_document_renders_the_tree() {
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out_structure.pdf");
    let tree = "demo/\n+-- src/\n|   +-- main.rs\n+-- README.md\n";
    let bytes = render_structure("Code Collection: demo", tree, RenderFormat::Human, &dest)
        .expect("structure render failed");

    assert_pdf_magic(&dest);
    assert_eq!(bytes, std::fs::metadata(&dest).unwrap().len());
}
