//! Plugin seam.
//!
//! [`Plugin`] is the base trait; [`DocumentEngine`](crate::engine::DocumentEngine)
//! extends it for document loading backends.

pub mod traits;

pub use traits::Plugin;
