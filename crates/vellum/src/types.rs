//! Request types handed from the viewer to the loader.

use crate::core::config::LoaderConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A single HTTP header value, or several values for a repeated header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Iterate the individual values in order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            HeaderValue::Single(value) => std::slice::from_ref(value),
            HeaderValue::Multiple(values) => values,
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multiple(values)
    }
}

/// Extra HTTP headers sent with remote document requests, in insertion order.
pub type HttpHeaders = IndexMap<String, HeaderValue>;

/// Location of the character maps (CMaps) the engine may need for CJK fonts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterMap {
    pub url: String,
    /// Whether the maps are stored in the packed binary format.
    #[serde(default)]
    pub is_compressed: bool,
}

/// Where the document bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Remote document fetched by the engine.
    Url(String),
    /// Local file read by the engine.
    Path(PathBuf),
    /// Bytes already in memory.
    Data(Arc<[u8]>),
}

impl FileSource {
    /// Interpret a command-line style argument: `http(s)://` is a URL, anything else a path.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            FileSource::Url(raw.to_string())
        } else {
            FileSource::Path(PathBuf::from(raw))
        }
    }

    pub fn data(bytes: impl Into<Vec<u8>>) -> Self {
        FileSource::Data(Arc::from(bytes.into()))
    }

    /// Short human-readable description used in logs.
    pub fn describe(&self) -> String {
        match self {
            FileSource::Url(url) => url.clone(),
            FileSource::Path(path) => path.display().to_string(),
            FileSource::Data(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileSource::Url(url) => f.debug_tuple("Url").field(url).finish(),
            FileSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FileSource::Data(bytes) => f.debug_tuple("Data").field(&bytes.len()).finish(),
        }
    }
}

impl From<&str> for FileSource {
    fn from(raw: &str) -> Self {
        FileSource::parse(raw)
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        FileSource::Path(path)
    }
}

impl From<Vec<u8>> for FileSource {
    fn from(bytes: Vec<u8>) -> Self {
        FileSource::data(bytes)
    }
}

/// Everything the engine needs to start one load attempt.
///
/// Only [`source`](Self::source) identifies the document: see
/// [`DocumentLoader::update_request`](crate::loader::DocumentLoader::update_request).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub source: FileSource,
    pub http_headers: HttpHeaders,
    pub with_credentials: bool,
    pub character_map: Option<CharacterMap>,
}

impl LoadRequest {
    pub fn new(source: impl Into<FileSource>) -> Self {
        Self {
            source: source.into(),
            http_headers: HttpHeaders::new(),
            with_credentials: false,
            character_map: None,
        }
    }

    /// Build a request carrying the configured headers, credentials flag and character map.
    pub fn from_config(source: impl Into<FileSource>, config: &LoaderConfig) -> Self {
        Self {
            source: source.into(),
            http_headers: config.http_headers.clone(),
            with_credentials: config.with_credentials,
            character_map: config.character_map.clone(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.http_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_credentials(mut self, with_credentials: bool) -> Self {
        self.with_credentials = with_credentials;
        self
    }

    pub fn with_character_map(mut self, character_map: CharacterMap) -> Self {
        self.character_map = Some(character_map);
        self
    }
}
