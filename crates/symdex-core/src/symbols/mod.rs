//! # Symbol Sources
//!
//! Per-module access to cached symbols and line tables.
//!
//! A module's symbols are reached through the [`SymbolSource`] capability
//! rather than a concrete table format. [`ModuleSymbols`] wraps the source
//! attached to a module and makes the "no symbols" case a variant instead of
//! a null check:
//!
//! - [`ModuleSymbols::Empty`]: nothing was ever loaded for the module
//! - [`ModuleSymbols::Loaded`]: a source is attached (it may still report
//!   itself as not open)
//!
//! [`SymbolTable`] is the in-memory source built once when an image is
//! parsed (see [`image`]), and is what tests construct directly.

pub mod image;
pub mod names;

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;

pub use names::NameFormatter;

use crate::types::LineInfo;

/// One symbol as stored in a module's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSymbol
{
    /// Offset from the module base.
    pub offset: u64,
    pub decorated: String,
    /// Undecorated form. Caches store the decorated text again when the name
    /// does not undecorate, and may store an empty string.
    pub undecorated: String,
}

impl CachedSymbol
{
    pub fn new(offset: u64, decorated: impl Into<String>, undecorated: impl Into<String>) -> Self
    {
        Self {
            offset,
            decorated: decorated.into(),
            undecorated: undecorated.into(),
        }
    }
}

/// Symbol enumeration and line lookup for one module.
pub trait SymbolSource: Send + Sync
{
    /// Whether the backing data is available. Closed sources are skipped by
    /// enumeration.
    fn is_open(&self) -> bool
    {
        true
    }

    /// Visit every cached symbol until `visit` breaks.
    fn enum_symbols(&self, visit: &mut dyn FnMut(&CachedSymbol) -> ControlFlow<()>);

    /// Line entry covering the module-relative `offset`, if any.
    fn find_source_line_info(&self, offset: u64) -> Option<LineInfo>;
}

/// Symbol source attached to a module record.
#[derive(Clone, Default)]
pub enum ModuleSymbols
{
    /// The "no symbols" sentinel.
    #[default]
    Empty,
    /// A source is attached.
    Loaded(Arc<dyn SymbolSource>),
}

impl ModuleSymbols
{
    /// Attach `source`.
    pub fn loaded(source: impl SymbolSource + 'static) -> Self
    {
        ModuleSymbols::Loaded(Arc::new(source))
    }

    /// The attached source, unless this is the sentinel.
    pub fn source(&self) -> Option<&dyn SymbolSource>
    {
        match self {
            ModuleSymbols::Empty => None,
            ModuleSymbols::Loaded(source) => Some(source.as_ref()),
        }
    }

    /// The attached source if it reports itself open.
    pub fn open_source(&self) -> Option<&dyn SymbolSource>
    {
        self.source().filter(|source| source.is_open())
    }
}

impl std::fmt::Debug for ModuleSymbols
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self {
            ModuleSymbols::Empty => write!(f, "Empty"),
            ModuleSymbols::Loaded(source) => write!(f, "Loaded(open: {})", source.is_open()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LineRange
{
    len: u64,
    info: LineInfo,
}

/// In-memory symbol cache and line table of one module.
///
/// Symbols keep insertion order. Line ranges are keyed by start offset; a
/// lookup hits only a range that contains the offset, there is no
/// nearest-line fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable
{
    symbols: Vec<CachedSymbol>,
    lines: BTreeMap<u64, LineRange>,
}

impl SymbolTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Append a cached symbol.
    pub fn push_symbol(&mut self, symbol: CachedSymbol)
    {
        self.symbols.push(symbol);
    }

    /// Record that `[offset, offset + len)` maps to `file:line`.
    ///
    /// Zero-length ranges still match their start offset.
    pub fn push_line(&mut self, offset: u64, len: u64, file: impl Into<String>, line: u32)
    {
        self.lines.insert(
            offset,
            LineRange {
                len: len.max(1),
                info: LineInfo {
                    source_file: file.into(),
                    line_number: line,
                },
            },
        );
    }

    /// Builder form of [`push_symbol`](Self::push_symbol).
    #[must_use]
    pub fn with_symbol(mut self, offset: u64, decorated: &str, undecorated: &str) -> Self
    {
        self.push_symbol(CachedSymbol::new(offset, decorated, undecorated));
        self
    }

    /// Builder form of [`push_line`](Self::push_line).
    #[must_use]
    pub fn with_line(mut self, offset: u64, len: u64, file: &str, line: u32) -> Self
    {
        self.push_line(offset, len, file, line);
        self
    }

    pub fn symbols(&self) -> &[CachedSymbol]
    {
        &self.symbols
    }

    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }

    /// `true` if the table carries any line information.
    pub fn has_lines(&self) -> bool
    {
        !self.lines.is_empty()
    }

    /// Offset of the first symbol whose decorated or undecorated name is `name`.
    pub fn find_by_name(&self, name: &str) -> Option<u64>
    {
        self.symbols
            .iter()
            .find(|symbol| symbol.decorated == name || symbol.undecorated == name)
            .map(|symbol| symbol.offset)
    }
}

impl SymbolSource for SymbolTable
{
    fn enum_symbols(&self, visit: &mut dyn FnMut(&CachedSymbol) -> ControlFlow<()>)
    {
        for symbol in &self.symbols {
            if visit(symbol).is_break() {
                return;
            }
        }
    }

    fn find_source_line_info(&self, offset: u64) -> Option<LineInfo>
    {
        let (start, range) = self.lines.range(..=offset).next_back()?;
        (offset - start < range.len).then(|| range.info.clone())
    }
}
