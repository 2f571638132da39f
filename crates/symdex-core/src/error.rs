//! # Error Types
//!
//! Errors raised by the symbol backend and the image loader.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most of the resolution surface never returns these: a missing label, module,
//! symbol source or line entry is a degraded result (`None` or an empty
//! string), not an error. `SymdexError` is reserved for backend calls and for
//! parsing images from disk, where the caller has to decide what to do next.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Address;

/// Main error type for symbol operations
///
/// ## Error Categories
///
/// 1. **Lookup errors**: ModuleNotFound, SymbolNotFound
/// 2. **Backend errors**: Backend (a native backend call reported failure)
/// 3. **Input errors**: InvalidArgument, Parse
/// 4. **I/O errors**: Io
#[derive(Error, Debug)]
pub enum SymdexError
{
    /// No loaded module owns the given address
    #[error("No module at address {0}")]
    ModuleNotFound(Address),

    /// The backend has no symbol with the given name
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A backend operation reported failure
    ///
    /// `operation` names the backend call (e.g. `load_module`) so log lines
    /// read the same way regardless of which backend produced them.
    #[error("{operation} failed: {details}")]
    Backend
    {
        /// Backend call that failed
        operation: &'static str,
        /// Additional error details
        details: String,
    },

    /// Invalid argument passed to a symbol function
    ///
    /// Examples:
    /// - A malformed `SRV*cache*store` search path entry
    /// - An address that cannot be parsed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An image or debug file could not be parsed
    #[error("Failed to parse {}: {details}", path.display())]
    Parse
    {
        /// File that failed to parse
        path: PathBuf,
        /// Parser error message
        details: String,
    },

    /// I/O error (for reading images and debug files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SymdexError
{
    /// Shorthand for [`SymdexError::Backend`].
    pub fn backend(operation: &'static str, details: impl Into<String>) -> Self
    {
        Self::Backend {
            operation,
            details: details.into(),
        }
    }
}

/// Convenience type alias for `Result<T, SymdexError>`
///
/// ```rust
/// use symdex_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, SymdexError>;
