//! # Types
//!
//! Plain data shared by the resolver, the enumerator and the sync pass.
//!
//! None of these types carry behaviour beyond formatting; the collaborators
//! that produce them live in [`crate::modules`], [`crate::symbols`] and
//! [`crate::backend`].

pub mod address;
pub mod symbols;

// Re-export all public types
pub use address::Address;
pub use symbols::{DebugDataKind, LineInfo, Segment, SourceLine, SymbolModuleInfo, SymbolRecord};
