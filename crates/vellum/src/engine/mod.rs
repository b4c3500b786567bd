//! Document engine adapter.
//!
//! The loader treats the engine as a black box: it asks for a session per
//! [`LoadRequest`] and consumes the session's events. Parsing, decryption and
//! fetching all happen behind this seam.
//!
//! # Implementing an engine
//!
//! ```rust
//! use vellum::engine::{DocumentEngine, EngineSession};
//! use vellum::plugins::Plugin;
//! use vellum::{LoadRequest, Result};
//!
//! /// Resolves every request with the number of header entries it carried.
//! struct HeaderCounter;
//!
//! impl Plugin for HeaderCounter {
//!     fn name(&self) -> &str { "header-counter" }
//!     fn version(&self) -> String { "1.0.0".to_string() }
//! }
//!
//! impl DocumentEngine for HeaderCounter {
//!     type Document = usize;
//!
//!     fn create_session(&self, request: &LoadRequest) -> Result<EngineSession<usize>> {
//!         let (session, handle) = EngineSession::channel("header-counter");
//!         handle.report_progress(1, 1);
//!         handle.resolve(request.http_headers.len());
//!         Ok(session)
//!     }
//! }
//! ```

pub mod session;

#[cfg(feature = "pdf")]
pub mod pdf;

use crate::Result;
use crate::plugins::Plugin;
use crate::types::LoadRequest;

pub use session::{EngineSession, SessionEvent, SessionHandle};

#[cfg(feature = "pdf")]
pub use pdf::{DocumentInfo, LopdfEngine, PdfDocument};

/// A backend that can load documents.
///
/// `create_session` must return quickly: the actual work runs asynchronously
/// (typically in a task attached with [`EngineSession::with_worker`]) and is
/// reported through the session's [`SessionHandle`].
pub trait DocumentEngine: Plugin {
    /// Opaque handle for a successfully loaded document.
    type Document: Clone + Send + Sync + 'static;

    /// Start loading `request`.
    ///
    /// # Errors
    ///
    /// `VellumError::Engine` when the session cannot be started at all (for
    /// example no async runtime). Problems with the document itself are reported
    /// through [`SessionHandle::reject`] instead.
    fn create_session(&self, request: &LoadRequest) -> Result<EngineSession<Self::Document>>;
}
