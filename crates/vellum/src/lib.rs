//! Vellum - Document Loading State Machine
//!
//! Vellum drives a document engine (a PDF parser, usually) through one load
//! attempt at a time and exposes a single, UI-friendly status: loading with a
//! percentage, asking for a password, wrong password, completed or failed.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vellum::{DocumentLoader, LoadRequest, LoadingStatus, LopdfEngine};
//!
//! # async fn example() -> vellum::Result<()> {
//! let mut loader = DocumentLoader::new(Arc::new(LopdfEngine::new()));
//! loader.load(LoadRequest::new("https://example.com/report.pdf").with_header("Authorization", "Bearer t0k3n"));
//!
//! match loader.settle().await {
//!     LoadingStatus::Completed { document } => println!("{} pages", document.page_count()),
//!     LoadingStatus::Failed { error } => eprintln!("{}", error.message),
//!     other => println!("still {}", other.kind()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Loader** (`loader`): status machine, progress reconciliation, password
//!   rounds and render dispatch
//! - **Engine** (`engine`): the engine seam, per-attempt sessions and the
//!   `lopdf` backed PDF engine
//! - **Core** (`core`): configuration loading and discovery
//! - **Plugins** (`plugins`): base trait shared by engines

#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod error;
pub mod loader;
pub mod plugins;
pub mod types;

pub use error::{DEFAULT_LOAD_ERROR_MESSAGE, LoadError, Result, VellumError};
pub use types::{CharacterMap, FileSource, HeaderValue, HttpHeaders, LoadRequest};

pub use core::config::{CONFIG_FILE_NAME, LoaderConfig};

pub use engine::{DocumentEngine, EngineSession, SessionEvent, SessionHandle};

#[cfg(feature = "pdf")]
pub use engine::{DocumentInfo, LopdfEngine, PdfDocument};

pub use loader::{
    DocumentLoader, INCORRECT_PASSWORD, LoaderView, LoadingStatus, NEED_PASSWORD, PasswordVerifier, ProgressData,
    Renderers, SessionToken, StatusKind,
};

pub use plugins::Plugin;
