//! Address to display name resolution.

use super::SymbolInfo;
use crate::backend::SymbolBackend;
use crate::symbols::names::ORDINAL_MARKER;
use crate::types::{Address, Segment};

impl SymbolInfo
{
    /// Best display name for `address`.
    ///
    /// User labels win over everything discovered from debug data:
    ///
    /// | label | owning module | result                  |
    /// |-------|---------------|-------------------------|
    /// | yes   | yes           | `<module.label>`        |
    /// | yes   | no            | `<label>`               |
    /// | no    | yes           | `module.0x00000000...`  |
    /// | no    | no            | empty string            |
    ///
    /// The module name is shown without its extension.
    pub fn resolve_symbolic_name(&self, address: Address) -> String
    {
        let module = self.registry.module_name(address);
        match (self.labels.label_at(address, Segment::Default), module) {
            (Some(label), Some(module)) => format!("<{module}.{label}>"),
            (Some(label), None) => format!("<{label}>"),
            (None, Some(module)) => format!("{module}.{address}"),
            (None, None) => String::new(),
        }
    }
}

/// Look a symbol up by name through the backend.
///
/// Empty names and names starting with `Ordinal` (any case) are rejected
/// without asking the backend; backend failures are reported as `None`.
pub fn addr_from_name<B>(backend: &B, name: &str) -> Option<Address>
where
    B: SymbolBackend + ?Sized,
{
    if name.is_empty() {
        return None;
    }
    let marker = ORDINAL_MARKER.len();
    if name
        .get(..marker)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ORDINAL_MARKER))
    {
        return None;
    }

    match backend.symbol_from_name(name) {
        Ok(address) => Some(address),
        Err(err) => {
            tracing::debug!(name, %err, "symbol lookup by name failed");
            None
        }
    }
}
