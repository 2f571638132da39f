//! Symbol name decoration utilities.
//!
//! Compilers "decorate" (mangle) names to encode namespaces, types and calling
//! conventions. This module recovers the readable form and decides how the
//! two forms are presented:
//!
//! - **Rust**: legacy (`_ZN...E`) and v0 (`_R...`) mangling via `rustc_demangle`
//! - **C++**: Itanium ABI mangling (`_Z...`) via `cpp_demangle`
//! - Anything else fails undecoration
//!
//! When both forms are textually identical only one is kept, so callers never
//! print the same name twice.

use rustc_demangle::try_demangle;

use crate::config::{truncate_to, MAX_SYM_NAME};
use crate::symbols::CachedSymbol;
use crate::types::{Address, SymbolRecord};

/// Prefix the linker gives import address table thunks.
pub const IMPORT_PREFIX: &str = "__imp_";

/// Decorated name of the synthetic image entry point record.
pub const ENTRY_POINT_LABEL: &str = "OptionalHeader.AddressOfEntryPoint";

/// Marker some backends use for exports that only have an ordinal.
pub const ORDINAL_MARKER: &str = "Ordinal";

/// Decorates, undecorates and deduplicates symbol names.
#[derive(Debug, Clone, Copy)]
pub struct NameFormatter
{
    max_len: usize,
}

impl Default for NameFormatter
{
    fn default() -> Self
    {
        Self { max_len: MAX_SYM_NAME }
    }
}

impl NameFormatter
{
    /// Formatter that bounds every copied name to `max_len - 1` bytes.
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self
    {
        Self { max_len }
    }

    /// Readable form of a decorated name, or `None` if it is not mangled in a
    /// scheme we understand.
    pub fn undecorate(&self, decorated: &str) -> Option<String>
    {
        let undecorated = if decorated.starts_with("_R") || decorated.starts_with("_ZN") {
            try_demangle(decorated)
                .ok()
                .map(|name| name.to_string())
                .or_else(|| demangle_cpp(decorated))
        } else if decorated.starts_with("_Z") {
            demangle_cpp(decorated)
        } else {
            None
        }?;
        Some(self.bounded(&undecorated))
    }

    /// Build the stream record for one cached symbol of the module at `base`.
    ///
    /// Returns `None` for entries that must not be shown: placeholder ordinal
    /// exports (see [`is_unresolved_ordinal`]) and entries without a name.
    pub fn cached_record(&self, base: Address, symbol: &CachedSymbol) -> Option<SymbolRecord>
    {
        let address = base + symbol.offset;
        let mut decorated = self.bounded(&symbol.decorated);
        let mut undecorated = Some(self.bounded(&symbol.undecorated)).filter(|name| !name.is_empty());

        if is_unresolved_ordinal(&decorated, address, base) {
            return None;
        }

        // Identical forms collapse onto the undecorated text
        if symbol.decorated == symbol.undecorated {
            if let Some(name) = undecorated.take() {
                decorated = name;
            }
        }

        if decorated.is_empty() {
            return None;
        }

        let is_imported = is_import_thunk(&decorated);
        Some(SymbolRecord {
            address,
            decorated,
            undecorated,
            is_imported,
        })
    }

    /// Build the stream record for one live import address table slot.
    ///
    /// Import slots are always flagged as imports.
    pub fn import_record(&self, address: Address, name: &str) -> Option<SymbolRecord>
    {
        let decorated = self.bounded(name);
        if decorated.is_empty() {
            return None;
        }
        let undecorated = self.undecorate(name).filter(|undecorated| *undecorated != decorated);
        Some(SymbolRecord {
            address,
            decorated,
            undecorated,
            is_imported: true,
        })
    }

    /// Synthetic record marking the image entry point.
    pub fn entry_point_record(&self, address: Address) -> SymbolRecord
    {
        SymbolRecord {
            address,
            decorated: ENTRY_POINT_LABEL.to_string(),
            undecorated: None,
            is_imported: false,
        }
    }

    fn bounded(&self, name: &str) -> String
    {
        truncate_to(name, self.max_len)
    }
}

/// `true` for import address table thunk names (`__imp_` prefix).
pub fn is_import_thunk(decorated: &str) -> bool
{
    decorated.starts_with(IMPORT_PREFIX)
}

/// Placeholder ordinal export that never resolved to a real address.
///
/// Some backends name ordinal-only exports `Ordinal<N>` and leave them at
/// offset zero. Only that exact combination is dropped; ordinal-named
/// entries anywhere else in the module are genuine and pass through.
pub fn is_unresolved_ordinal(decorated: &str, address: Address, base: Address) -> bool
{
    decorated.contains(ORDINAL_MARKER) && address == base
}

fn demangle_cpp(decorated: &str) -> Option<String>
{
    cpp_demangle::Symbol::new(decorated)
        .ok()
        .and_then(|symbol| symbol.demangle(&cpp_demangle::DemangleOptions::default()).ok())
}
