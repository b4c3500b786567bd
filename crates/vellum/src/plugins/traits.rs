//! Base plugin trait definition.
//!
//! Document engines are plugins: they carry a name and version for logging and
//! get a chance to acquire and release process-wide resources.

use crate::Result;

/// Base trait that all plugins must implement.
///
/// # Thread Safety
///
/// All plugins must be `Send + Sync`; a loader keeps its engine in an `Arc`.
///
/// # Example
///
/// ```rust
/// use vellum::plugins::Plugin;
/// use vellum::Result;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct MyEngine {
///     initialized: AtomicBool,
/// }
///
/// impl Plugin for MyEngine {
///     fn name(&self) -> &str {
///         "my-engine"
///     }
///
///     fn version(&self) -> String {
///         "1.0.0".to_string()
///     }
///
///     fn initialize(&self) -> Result<()> {
///         self.initialized.store(true, Ordering::Release);
///         Ok(())
///     }
///
///     fn shutdown(&self) -> Result<()> {
///         self.initialized.store(false, Ordering::Release);
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Unique lowercase, hyphenated identifier (e.g. `"lopdf"`).
    fn name(&self) -> &str;

    /// Semantic version of this plugin.
    fn version(&self) -> String;

    /// Acquire resources. Called once before first use.
    ///
    /// Takes `&self` so it works behind `Arc<dyn Plugin>`; use interior
    /// mutability for any state.
    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources. Called once when the owner is done with the plugin.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Optional human-readable description.
    fn description(&self) -> &str {
        ""
    }
}
