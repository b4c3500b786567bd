//! End-to-end loading through the lopdf engine.

#![cfg(feature = "pdf")]

mod helpers;

use helpers::{sample_encrypted_pdf, sample_pdf};
use std::sync::Arc;
use tempfile::TempDir;
use vellum::{
    DocumentLoader, FileSource, LoadRequest, LoaderConfig, LoaderView, LopdfEngine, Renderers, StatusKind,
};

fn pdf_loader() -> DocumentLoader<LopdfEngine> {
    DocumentLoader::new(Arc::new(LopdfEngine::new()))
}

#[tokio::test]
async fn test_load_from_memory() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(sample_pdf(3, Some("Quarterly")))));

    let status = loader.settle().await;
    let document = status.document().expect("document should load");
    assert_eq!(document.page_count(), 3);
    assert_eq!(document.info().title.as_deref(), Some("Quarterly"));
    assert!(!document.info().encrypted);
    assert_eq!(loader.percentages(), 100.0);
}

#[tokio::test]
async fn test_load_from_path_reports_chunked_progress() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sample.pdf");
    let bytes = sample_pdf(2, None);
    std::fs::write(&path, &bytes).unwrap();

    let config = LoaderConfig {
        read_chunk_size: 64,
        ..Default::default()
    };
    let mut loader = DocumentLoader::with_config(Arc::new(LopdfEngine::with_config(&config)), config);
    loader.load(LoadRequest::new(path));

    let mut progress_steps = 0;
    while loader.step().await {
        if loader.status().is_terminal() {
            break;
        }
        progress_steps += 1;
    }

    assert!(progress_steps > 1, "expected several progress ticks, got {}", progress_steps);
    let document = loader.document().expect("document should load");
    assert_eq!(document.page_count(), 2);
    assert_eq!(document.info().byte_length, bytes.len());
}

#[tokio::test]
async fn test_session_names_use_worker_prefix() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(sample_pdf(1, None))));

    let name = loader.session_name().unwrap().to_string();
    assert!(name.starts_with("PDFWorker_"), "unexpected session name {}", name);

    loader.load(LoadRequest::new(FileSource::data(sample_pdf(1, None))));
    assert_ne!(loader.session_name().unwrap(), name);
}

#[tokio::test]
async fn test_invalid_bytes_fail() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(b"definitely not a pdf".to_vec())));

    let status = loader.settle().await;
    assert_eq!(status.kind(), StatusKind::Failed);
    assert_eq!(status.error().unwrap().name, "InvalidPDFException");
}

#[tokio::test]
async fn test_missing_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nope.pdf");

    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(path.clone()));

    let status = loader.settle().await;
    let error = status.error().expect("status should be failed");
    assert_eq!(error.name, "MissingPDFException");
    assert!(error.message.contains("nope.pdf"));
}

#[tokio::test]
async fn test_render_loaded_document() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(sample_pdf(4, None))));
    loader.settle().await;

    let renderers = Renderers::new(|doc: &vellum::PdfDocument| format!("{} pages", doc.page_count()));
    match loader.render(&renderers) {
        LoaderView::Document(text) => assert_eq!(text, "4 pages"),
        other => panic!("expected document view, got {:?}", other),
    }
}

#[tokio::test]
async fn test_superseded_pdf_load_never_completes() {
    let mut loader = pdf_loader();
    let first = loader.load(LoadRequest::new(FileSource::data(sample_pdf(1, Some("First")))));
    let second = loader.load(LoadRequest::new(FileSource::data(sample_pdf(2, Some("Second")))));
    assert_ne!(first, second);

    let status = loader.settle().await;
    assert_eq!(status.document().unwrap().info().title.as_deref(), Some("Second"));
}

#[tokio::test]
async fn test_user_password_unlocks_encrypted_document() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(sample_encrypted_pdf(2, Some("Secret"), "right"))));

    let status = loader.settle().await;
    assert_eq!(status.kind(), StatusKind::AskingForPassword);
    status.verifier().unwrap().verify("wrong").unwrap();

    let status = loader.settle().await;
    assert_eq!(status.kind(), StatusKind::WrongPassword);
    status.verifier().unwrap().verify("right").unwrap();

    let status = loader.settle().await;
    let document = status.document().expect("document should unlock");
    assert_eq!(document.page_count(), 2);
    assert_eq!(document.info().title.as_deref(), Some("Secret"));
    assert!(document.info().encrypted);
}

#[tokio::test]
async fn test_empty_user_password_opens_without_prompt() {
    let mut loader = pdf_loader();
    loader.load(LoadRequest::new(FileSource::data(sample_encrypted_pdf(4, Some("Open Secret"), ""))));

    let mut prompted = false;
    while loader.step().await {
        prompted |= loader.status().is_password_prompt();
        if loader.status().is_terminal() {
            break;
        }
    }

    assert!(!prompted);
    let document = loader.document().expect("document should load");
    assert_eq!(document.page_count(), 4);
    assert_eq!(document.info().title.as_deref(), Some("Open Secret"));
    assert!(document.info().encrypted);
}
