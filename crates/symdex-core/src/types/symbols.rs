//! Symbol, line and module snapshot types.

use std::fmt;

use super::Address;

/// One entry of the unified symbol stream produced by
/// [`SymbolInfo::enumerate`](crate::SymbolInfo::enumerate).
///
/// Records are built per visited entry and handed to the visitor by
/// reference; clone one if it has to outlive the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord
{
    /// Absolute address of the symbol.
    pub address: Address,
    /// Decorated (mangled) name. Never empty.
    pub decorated: String,
    /// Undecorated name, absent when undecoration failed or produced the
    /// same text as `decorated`.
    pub undecorated: Option<String>,
    /// Import address table entry rather than code or data of the module.
    pub is_imported: bool,
}

impl SymbolRecord
{
    /// Preferred presentation (undecorated fallback to decorated).
    pub fn display_name(&self) -> &str
    {
        self.undecorated.as_deref().unwrap_or(&self.decorated)
    }
}

impl fmt::Display for SymbolRecord
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{} {}", self.address, self.display_name())
    }
}

/// Line table entry returned by a [`SymbolSource`](crate::symbols::SymbolSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInfo
{
    pub source_file: String,
    pub line_number: u32,
}

/// Source location of an absolute address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine
{
    /// Source file path, bounded by [`MAX_STRING_SIZE`](crate::config::MAX_STRING_SIZE).
    pub file: String,
    pub line: u32,
    /// Distance from the start of the line entry. Lookups are exact, so this
    /// is always zero.
    pub displacement: u32,
}

/// Flattened `{ base, name+extension }` snapshot of a loaded module.
///
/// Point-in-time copy used to publish the module list and to drive a symbol
/// store sync; it does not track later registry changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolModuleInfo
{
    pub base: Address,
    /// Name and extension concatenated, capped at
    /// [`MAX_MODULE_SIZE`](crate::config::MAX_MODULE_SIZE) - 1 bytes.
    pub name: String,
}

/// Kind of debug information a backend obtained for a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugDataKind
{
    /// Nothing usable was found.
    None,
    /// Names recovered from the export / dynamic symbol table only.
    Export,
    /// Full symbolic data (names and line tables).
    Full,
}

impl DebugDataKind
{
    /// Only full symbolic data counts as a successful download.
    pub fn is_full(self) -> bool
    {
        matches!(self, DebugDataKind::Full)
    }
}

impl fmt::Display for DebugDataKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let label = match self {
            DebugDataKind::None => "none",
            DebugDataKind::Export => "export",
            DebugDataKind::Full => "full",
        };
        write!(f, "{label}")
    }
}

/// Label segment selector.
///
/// Labels are scoped per segment; this core only ever queries the default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Segment
{
    #[default]
    Default,
}
