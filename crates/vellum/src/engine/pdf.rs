//! Built-in engine backed by `lopdf`.
//!
//! Each session gets its own worker task that fetches the bytes (reporting
//! progress as they arrive), parses them on a blocking thread and, for
//! encrypted files, runs the password challenge loop:
//!
//! 1. try the empty user password silently;
//! 2. ask with `NEED_PASSWORD`;
//! 3. ask again with `INCORRECT_PASSWORD` after every rejected answer.
//!
//! Errors are reported with the exception names PDF viewers conventionally
//! use (`InvalidPDFException`, `MissingPDFException`,
//! `UnexpectedResponseException`).

use super::{DocumentEngine, EngineSession, SessionHandle};
use crate::core::config::LoaderConfig;
use crate::error::LoadError;
use crate::loader::password::{INCORRECT_PASSWORD, NEED_PASSWORD};
use crate::plugins::Plugin;
use crate::types::{FileSource, LoadRequest};
use crate::{Result, VellumError};
use lopdf::encryption::PasswordAlgorithm;
use lopdf::xref::XrefEntry;
use lopdf::{Document, EncryptionState, Object, ObjectId, ObjectStream, Reader, encryption};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

const INVALID_PDF: &str = "InvalidPDFException";
const MISSING_PDF: &str = "MissingPDFException";
const UNEXPECTED_RESPONSE: &str = "UnexpectedResponseException";
const UNKNOWN_ERROR: &str = "UnknownErrorException";

/// Summary of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// PDF version from the header (e.g. "1.7")
    pub version: String,
    pub page_count: usize,
    /// Whether the file carried an encryption dictionary
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub byte_length: usize,
}

/// Handle to a parsed (and, if needed, decrypted) document.
#[derive(Clone)]
pub struct PdfDocument {
    inner: Arc<Document>,
    info: DocumentInfo,
}

impl PdfDocument {
    fn new(document: Document, encrypted: bool, byte_length: usize) -> Self {
        let info = DocumentInfo {
            version: document.version.clone(),
            page_count: document.get_pages().len(),
            encrypted,
            title: document_title(&document),
            byte_length,
        };
        Self {
            inner: Arc::new(document),
            info,
        }
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn page_count(&self) -> usize {
        self.info.page_count
    }

    /// The underlying `lopdf` document.
    pub fn document(&self) -> &Document {
        &self.inner
    }
}

impl fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfDocument").field("info", &self.info).finish()
    }
}

impl PartialEq for PdfDocument {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Document engine using `lopdf` for parsing and decryption.
pub struct LopdfEngine {
    worker_name_prefix: String,
    read_chunk_size: usize,
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::with_config(&LoaderConfig::default())
    }

    pub fn with_config(config: &LoaderConfig) -> Self {
        Self {
            worker_name_prefix: config.worker_name_prefix.clone(),
            read_chunk_size: config.read_chunk_size.max(1),
            #[cfg(feature = "http")]
            client: reqwest::Client::new(),
        }
    }
}

impl Default for LopdfEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for LopdfEngine {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn description(&self) -> &str {
        "Pure-Rust PDF loading with lopdf"
    }
}

impl DocumentEngine for LopdfEngine {
    type Document = PdfDocument;

    fn create_session(&self, request: &LoadRequest) -> Result<EngineSession<PdfDocument>> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| VellumError::engine_with_source("The lopdf engine needs a running tokio runtime", e))?;

        let name = format!("{}_{}", self.worker_name_prefix, uuid::Uuid::new_v4().simple());
        let (session, handle) = EngineSession::channel(name);

        if let Some(cmap) = &request.character_map {
            tracing::debug!(
                url = %cmap.url,
                compressed = cmap.is_compressed,
                "Character maps are not used by the lopdf engine"
            );
        }

        tracing::info!(session = %session.name(), source = %request.source.describe(), "Starting load");

        let job = LoadJob {
            request: request.clone(),
            read_chunk_size: self.read_chunk_size,
            #[cfg(feature = "http")]
            client: self.client.clone(),
        };
        let worker = runtime.spawn(run(job, handle));

        Ok(session.with_worker(worker))
    }
}

async fn run(job: LoadJob, handle: SessionHandle<PdfDocument>) {
    match job.load(&handle).await {
        Ok(Some(document)) => {
            tracing::info!(
                session = %handle.name(),
                pages = document.page_count(),
                encrypted = document.info().encrypted,
                "Document loaded"
            );
            handle.resolve(document);
        }
        Ok(None) => tracing::debug!(session = %handle.name(), "Load cancelled"),
        Err(error) => {
            tracing::debug!(session = %handle.name(), %error, "Load failed");
            handle.reject(error);
        }
    }
}

enum Opened {
    Ready { document: Document, encrypted: bool },
    Locked,
}

struct LoadJob {
    request: LoadRequest,
    read_chunk_size: usize,
    #[cfg(feature = "http")]
    client: reqwest::Client,
}

impl LoadJob {
    /// `Ok(None)` means the session was destroyed before the document was ready.
    async fn load(&self, handle: &SessionHandle<PdfDocument>) -> std::result::Result<Option<PdfDocument>, LoadError> {
        let Some(bytes) = self.fetch(handle).await? else {
            return Ok(None);
        };

        let mut password: Option<String> = None;
        let mut reason = NEED_PASSWORD;

        loop {
            if handle.is_destroyed() {
                return Ok(None);
            }

            match open(Arc::clone(&bytes), password.take()).await? {
                Opened::Ready { document, encrypted } => {
                    return Ok(Some(PdfDocument::new(document, encrypted, bytes.len())));
                }
                Opened::Locked => match handle.request_password(reason).await {
                    Some(answer) => {
                        password = Some(answer);
                        reason = INCORRECT_PASSWORD;
                    }
                    None => return Ok(None),
                },
            }
        }
    }

    async fn fetch(&self, handle: &SessionHandle<PdfDocument>) -> std::result::Result<Option<Arc<[u8]>>, LoadError> {
        match &self.request.source {
            FileSource::Data(bytes) => {
                let length = bytes.len() as u64;
                handle.report_progress(length, length);
                Ok(Some(Arc::clone(bytes)))
            }
            FileSource::Path(path) => self.read_file(path, handle).await,
            FileSource::Url(url) => self.download(url, handle).await,
        }
    }

    async fn read_file(
        &self,
        path: &Path,
        handle: &SessionHandle<PdfDocument>,
    ) -> std::result::Result<Option<Arc<[u8]>>, LoadError> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| io_load_error(path, e))?;
        let total = file.metadata().await.map(|meta| meta.len()).unwrap_or(0);

        let mut buffer = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
        let mut chunk = vec![0u8; self.read_chunk_size];

        loop {
            if handle.is_destroyed() {
                return Ok(None);
            }

            let read = file.read(&mut chunk).await.map_err(|e| io_load_error(path, e))?;
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            handle.report_progress(buffer.len() as u64, total);
        }

        Ok(Some(Arc::from(buffer)))
    }

    #[cfg(feature = "http")]
    async fn download(
        &self,
        url: &str,
        handle: &SessionHandle<PdfDocument>,
    ) -> std::result::Result<Option<Arc<[u8]>>, LoadError> {
        let mut request = self.client.get(url);
        for (name, value) in &self.request.http_headers {
            for value in value.values() {
                request = request.header(name.as_str(), value);
            }
        }
        if self.request.with_credentials {
            tracing::debug!("with_credentials is a browser fetch option; sending configured headers only");
        }

        let mut response = request
            .send()
            .await
            .map_err(|e| LoadError::new(UNEXPECTED_RESPONSE, format!("Failed to fetch PDF \"{}\": {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::new(MISSING_PDF, format!("Missing PDF \"{}\".", url)));
        }
        if !status.is_success() {
            return Err(LoadError::new(
                UNEXPECTED_RESPONSE,
                format!(
                    "Unexpected server response ({}) while retrieving PDF \"{}\".",
                    status.as_u16(),
                    url
                ),
            ));
        }

        let total = response.content_length().unwrap_or(0);
        let mut buffer = Vec::with_capacity(usize::try_from(total).unwrap_or_default());

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| LoadError::new(UNEXPECTED_RESPONSE, format!("Failed to read PDF \"{}\": {}", url, e)))?
        {
            if handle.is_destroyed() {
                return Ok(None);
            }
            buffer.extend_from_slice(&chunk);
            handle.report_progress(buffer.len() as u64, total);
        }

        Ok(Some(Arc::from(buffer)))
    }

    #[cfg(not(feature = "http"))]
    async fn download(
        &self,
        url: &str,
        _handle: &SessionHandle<PdfDocument>,
    ) -> std::result::Result<Option<Arc<[u8]>>, LoadError> {
        Err(LoadError::new(
            UNEXPECTED_RESPONSE,
            format!("Cannot fetch \"{}\": remote documents require the `http` feature", url),
        ))
    }
}

/// Parse and, when encrypted, try to unlock.
///
/// `load_mem` already decrypts files whose user password is empty; those come
/// back with an encryption state and must not be decrypted again. Otherwise it
/// only keeps the `/Encrypt` dictionary, so the objects are re-read from
/// `bytes` once `password` authenticates.
async fn open(bytes: Arc<[u8]>, password: Option<String>) -> std::result::Result<Opened, LoadError> {
    tokio::task::spawn_blocking(move || {
        let document = Document::load_mem(&bytes).map_err(|e| LoadError::new(INVALID_PDF, e.to_string()))?;
        if !document.is_encrypted() {
            return Ok(Opened::Ready {
                document,
                encrypted: false,
            });
        }
        if document.encryption_state.is_some() {
            return Ok(Opened::Ready {
                document,
                encrypted: true,
            });
        }

        let Some(password) = password else {
            return Ok(Opened::Locked);
        };
        if let Err(e) = document.authenticate_user_password(&password) {
            tracing::debug!(error = %e, "Password rejected");
            return Ok(Opened::Locked);
        }

        let document = unlock(&bytes, document, &password)?;
        Ok(Opened::Ready {
            document,
            encrypted: true,
        })
    })
    .await
    .map_err(|e| LoadError::new(UNKNOWN_ERROR, format!("PDF parser task failed: {}", e)))?
}

/// Re-read every object of an authenticated but still locked document and
/// decrypt it with the key derived from `password`.
fn unlock(bytes: &[u8], document: Document, password: &str) -> std::result::Result<Document, LoadError> {
    let invalid = |e: lopdf::Error| LoadError::new(INVALID_PDF, e.to_string());
    let password = PasswordAlgorithm::try_from(&document)
        .and_then(|algorithm| algorithm.sanitize_password(password).map_err(lopdf::Error::from))
        .map_err(invalid)?;
    let state = EncryptionState::decode(&document, &password).map_err(invalid)?;
    let encrypt_id = document
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .map_err(invalid)?;

    let ids: Vec<ObjectId> = document
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .collect();

    let reader = Reader {
        buffer: bytes,
        document,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };

    let mut objects = BTreeMap::new();
    for id in ids {
        if id == encrypt_id {
            continue;
        }
        let mut object = match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => object,
            Err(e) => {
                tracing::debug!(object = ?id, error = %e, "Skipping unreadable object");
                continue;
            }
        };
        if let Err(e) = encryption::decrypt_object(&state, id, &mut object) {
            tracing::debug!(object = ?id, error = ?e, "Object could not be decrypted");
        }
        objects.insert(id, object);
    }

    let mut compressed = BTreeMap::new();
    for object in objects.values_mut() {
        if let Ok(stream) = object.as_stream_mut()
            && stream.dict.has_type(b"ObjStm")
            && let Ok(object_stream) = ObjectStream::new(stream)
        {
            compressed.extend(object_stream.objects);
        }
    }
    for (id, object) in compressed {
        objects.entry(id).or_insert(object);
    }

    let mut document = reader.document;
    document.objects = objects;
    document.trailer.remove(b"Encrypt");
    document.encryption_state = Some(state);
    Ok(document)
}

fn io_load_error(path: &Path, err: std::io::Error) -> LoadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        LoadError::new(MISSING_PDF, format!("Missing PDF \"{}\".", path.display()))
    } else {
        LoadError::new(UNKNOWN_ERROR, format!("Failed to read \"{}\": {}", path.display(), err))
    }
}

fn document_title(document: &Document) -> Option<String> {
    let info = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let raw = info.get(b"Title").ok()?.as_str().ok()?;
    let title = decode_text_string(raw);
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding (close enough to Latin-1).
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter().map(|&byte| byte as char).collect()
    }
}
