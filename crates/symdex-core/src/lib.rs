//! # symdex-core
//!
//! Symbolic information for addresses inside a debuggee's loaded modules.
//!
//! This crate annotates every address a debugger shows with the best name
//! available, including:
//! - Unified symbol enumeration per module (cached symbols, entry point, imports)
//! - Address to name resolution with user labels taking priority
//! - Address to source file/line resolution
//! - Reloading debug information from a symbol store, with search path fallback
//!
//! ## Collaborators
//!
//! The crate orchestrates rather than owns the heavy lifting. Each outside
//! dependency is a trait with an in-process implementation:
//!
//! - [`modules::ModuleRegistry`] / [`modules::ImportTable`]: loaded modules and their import slots
//! - [`symbols::SymbolSource`]: per-module cached symbols and line tables
//! - [`labels::LabelStore`]: user-assigned labels
//! - [`backend::SymbolBackend`]: the engine that loads debug data ([`backend::LocalBackend`])
//! - [`modules::ModuleListSink`]: module list notifications ([`events`])

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod info;
pub mod labels;
pub mod modules;
pub mod symbols;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::SymbolConfig;
pub use error::{Result, SymdexError};
pub use info::{addr_from_name, SymbolInfo};
pub use sync::{SymbolStoreSync, SyncOutcome, SyncSummary};
pub use types::{Address, SymbolRecord};
