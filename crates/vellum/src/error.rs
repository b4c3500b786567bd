//! Error types for Vellum.
//!
//! Two kinds of failure live in this crate and they are kept apart on purpose:
//!
//! - [`VellumError`] is returned by fallible library calls (reading a config
//!   file, creating an engine session, submitting a password twice).
//! - [`LoadError`] is the `{ name, message }` pair an engine reports when a
//!   document cannot be loaded. It never propagates as an `Err`; the loader
//!   turns it into a `Failed` status that the view layer renders.
//!
//! # Error Handling Philosophy
//!
//! **System errors MUST always bubble up unchanged:**
//! - `VellumError::Io` (from `std::io::Error`) is never wrapped or suppressed.
//!
//! **Application errors are wrapped with context:**
//! - `Validation` - invalid configuration files or parameters
//! - `Serialization` - JSON/TOML/YAML encoding failures
//! - `Engine` - the document engine could not start a session
//!
//! # Example
//!
//! ```rust
//! use vellum::{Result, VellumError};
//!
//! fn read_chunk_size(raw: &str) -> Result<usize> {
//!     raw.parse::<usize>()
//!         .map_err(|e| VellumError::validation_with_source(format!("Invalid chunk size: {}", raw), e))
//! }
//!
//! assert!(read_chunk_size("65536").is_ok());
//! assert!(read_chunk_size("lots").is_err());
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when an engine rejects a load without saying why.
pub const DEFAULT_LOAD_ERROR_MESSAGE: &str = "Cannot load document";

/// Result type alias using `VellumError`.
pub type Result<T> = std::result::Result<T, VellumError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all fallible Vellum operations.
#[derive(Debug, Error)]
pub enum VellumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Engine error: {message}")]
    Engine {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Password for challenge round {round} was already submitted")]
    PasswordAlreadySubmitted { round: u32 },

    #[error("Engine session is closed")]
    SessionClosed,

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl From<serde_json::Error> for VellumError {
    fn from(err: serde_json::Error) -> Self {
        VellumError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl VellumError {
    /// Create a Validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Validation error with source
    pub fn validation_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Validation {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an Engine error
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Self::Engine {
            message: message.into(),
            source: None,
        }
    }

    /// Create an Engine error with source
    pub fn engine_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Engine {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Failure reported by a document engine for one load attempt.
///
/// The name is the engine's exception class (e.g. `InvalidPDFException`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{name}: {message}")]
pub struct LoadError {
    pub name: String,
    pub message: String,
}

impl LoadError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Replace an empty (or whitespace-only) message with `fallback`.
    pub fn or_default_message(mut self, fallback: &str) -> Self {
        if self.message.trim().is_empty() {
            self.message = fallback.to_string();
        }
        self
    }
}

impl From<&VellumError> for LoadError {
    fn from(err: &VellumError) -> Self {
        let name = match err {
            VellumError::Io(_) => "IOError",
            VellumError::Validation { .. } => "ValidationError",
            VellumError::Serialization { .. } => "SerializationError",
            VellumError::Engine { .. } => "EngineError",
            VellumError::PasswordAlreadySubmitted { .. } => "PasswordError",
            VellumError::SessionClosed => "SessionClosed",
            VellumError::Load(load) => return load.clone(),
        };
        LoadError::new(name, err.to_string())
    }
}
