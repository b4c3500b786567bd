//! Shared helpers for integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use vellum::plugins::Plugin;
use vellum::{DocumentEngine, DocumentLoader, EngineSession, LoadRequest, Result, SessionHandle, VellumError};

/// Engine whose sessions are driven by hand from the test body.
///
/// Every `create_session` call stores the engine half, so tests can emit
/// progress, challenges and outcomes in any order they like.
#[derive(Default)]
pub struct ManualEngine {
    handles: Mutex<Vec<SessionHandle<String>>>,
    requests: Mutex<Vec<LoadRequest>>,
    refuse: Mutex<bool>,
}

impl ManualEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Engine half of the `index`-th session ever created.
    pub fn session(&self, index: usize) -> SessionHandle<String> {
        self.handles.lock()[index].clone()
    }

    pub fn latest(&self) -> SessionHandle<String> {
        self.handles
            .lock()
            .last()
            .cloned()
            .expect("no session has been created yet")
    }

    pub fn sessions_created(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn requests(&self) -> Vec<LoadRequest> {
        self.requests.lock().clone()
    }

    /// Make the next `create_session` calls fail.
    pub fn refuse_sessions(&self, refuse: bool) {
        *self.refuse.lock() = refuse;
    }
}

impl Plugin for ManualEngine {
    fn name(&self) -> &str {
        "manual"
    }

    fn version(&self) -> String {
        "0.0.0".to_string()
    }
}

impl DocumentEngine for ManualEngine {
    type Document = String;

    fn create_session(&self, request: &LoadRequest) -> Result<EngineSession<String>> {
        if *self.refuse.lock() {
            return Err(VellumError::engine("worker pool exhausted"));
        }

        let mut handles = self.handles.lock();
        let (session, handle) = EngineSession::channel(format!("manual_{}", handles.len()));
        handles.push(handle);
        self.requests.lock().push(request.clone());
        Ok(session)
    }
}

pub fn manual_loader() -> (DocumentLoader<ManualEngine>, Arc<ManualEngine>) {
    let engine = ManualEngine::new();
    (DocumentLoader::new(Arc::clone(&engine)), engine)
}

/// Minimal PDF with `pages` empty pages, built with lopdf.
#[cfg(feature = "pdf")]
pub fn sample_pdf(pages: u32, title: Option<&str>) -> Vec<u8> {
    let mut doc = sample_document(pages, title);
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("failed to serialize sample PDF");
    buffer
}

/// RC4 128-bit encrypted sample.
#[cfg(feature = "pdf")]
pub fn sample_encrypted_pdf(pages: u32, title: Option<&str>, user_password: &str) -> Vec<u8> {
    use lopdf::{EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};

    let mut doc = sample_document(pages, title);
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(b"vellum-sample-01".to_vec(), StringFormat::Literal),
            Object::String(b"vellum-sample-02".to_vec(), StringFormat::Literal),
        ]),
    );

    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    })
    .expect("failed to derive encryption state");
    doc.encrypt(&state).expect("failed to encrypt sample PDF");

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("failed to serialize encrypted sample PDF");
    buffer
}

#[cfg(feature = "pdf")]
fn sample_document(pages: u32, title: Option<&str>) -> lopdf::Document {
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    doc
}
