//! # Image Loader
//!
//! Builds module records and symbol tables from executable images on disk.
//!
//! Parsing happens once per image. The result holds everything the resolver
//! needs later, so no file handle or DWARF context outlives the call:
//!
//! - cached symbols from the static and dynamic symbol tables, each stored
//!   with its undecorated form (or the decorated text again if it does not
//!   undecorate)
//! - line ranges from DWARF `.debug_line`, via `addr2line`
//! - import slots: dynamic relocations that bind an undefined symbol
//! - image size and entry point, relative to the preferred image base
//!
//! ## Usage
//!
//! ```rust,no_run
//! use symdex_core::modules::ModuleRegistry;
//! use symdex_core::symbols::image;
//! use symdex_core::types::Address;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let registry = ModuleRegistry::new();
//!     let module = image::load_module("/usr/bin/ls".as_ref(), Some(Address::new(0x5555_5555_0000)))?;
//!     registry.insert(module);
//!     Ok(())
//! }
//! ```

use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use addr2line::Context;
use gimli::{Dwarf, EndianArcSlice, RunTimeEndian, SectionId};
use object::{Object, ObjectSection, ObjectSegment, ObjectSymbol, ObjectSymbolTable, RelocationTarget, SymbolKind};

use super::{CachedSymbol, ModuleSymbols, NameFormatter, SymbolTable};
use crate::error::{Result, SymdexError};
use crate::modules::{ImportEntry, ModuleRecord};
use crate::types::{Address, DebugDataKind};

type OwnedReader = EndianArcSlice<RunTimeEndian>;

/// Everything extracted from one image file.
#[derive(Debug, Clone)]
pub struct ParsedImage
{
    pub path: PathBuf,
    /// Address the image is linked at.
    pub preferred_base: Address,
    pub size: u64,
    pub entry_point_offset: Option<u64>,
    pub table: SymbolTable,
    pub imports: Vec<ImportEntry>,
    /// `Full` when line tables were found, `Export` when only symbol tables were.
    pub kind: DebugDataKind,
}

impl ParsedImage
{
    /// Parse the image at `path`.
    ///
    /// ## Errors
    ///
    /// - `Io`: the file cannot be read
    /// - `Parse`: the file is not a supported object format
    pub fn parse(path: &Path) -> Result<Self>
    {
        let bytes = fs::read(path)?;
        let file = object::File::parse(&*bytes).map_err(|err| SymdexError::Parse {
            path: path.to_path_buf(),
            details: err.to_string(),
        })?;

        let image_base = image_base(&file);
        let size = file
            .segments()
            .map(|segment| segment.address().saturating_add(segment.size()))
            .max()
            .unwrap_or(image_base)
            .saturating_sub(image_base);
        let entry_point_offset = match file.entry() {
            0 => None,
            entry => entry.checked_sub(image_base),
        };

        let mut table = cached_symbols(&file, image_base);
        if file.section_by_name(".debug_info").is_some_and(|section| section.size() > 0) {
            if let Err(err) = load_lines(&file, image_base, &mut table) {
                tracing::warn!(path = %path.display(), %err, "failed to read DWARF line tables");
            }
        }

        let kind = if table.has_lines() {
            DebugDataKind::Full
        } else if table.is_empty() {
            DebugDataKind::None
        } else {
            DebugDataKind::Export
        };

        let imports = import_slots(&file, image_base);
        tracing::debug!(
            path = %path.display(),
            symbols = table.len(),
            imports = imports.len(),
            %kind,
            "parsed image"
        );

        Ok(Self {
            path: path.to_path_buf(),
            preferred_base: Address::new(image_base),
            size,
            entry_point_offset,
            table,
            imports,
            kind,
        })
    }

    /// Module record for this image loaded at `base`.
    pub fn into_module(self, base: Address) -> ModuleRecord
    {
        let (name, extension) = split_file_name(&self.path);
        let mut module = ModuleRecord::new(base, self.size, name, extension)
            .with_path(self.path)
            .with_imports(self.imports)
            .with_symbols(ModuleSymbols::loaded(self.table));
        module.entry_point_offset = self.entry_point_offset;
        module
    }
}

/// Parse `path` and build its module record at `base` (the preferred base
/// if `None`).
pub fn load_module(path: &Path, base: Option<Address>) -> Result<ModuleRecord>
{
    let image = ParsedImage::parse(path)?;
    let base = base.unwrap_or(image.preferred_base);
    Ok(image.into_module(base))
}

/// Split `dir/kernel32.dll` into `("kernel32", ".dll")`.
pub fn split_file_name(path: &Path) -> (String, String)
{
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (name, extension)
}

fn image_base(file: &object::File<'_>) -> u64
{
    match file.relative_address_base() {
        // Segments without file data (Mach-O __PAGEZERO) are not part of the image
        0 => file
            .segments()
            .filter(|segment| segment.file_range().1 > 0)
            .map(|segment| segment.address())
            .min()
            .unwrap_or(0),
        base => base,
    }
}

fn cached_symbols(file: &object::File<'_>, image_base: u64) -> SymbolTable
{
    let names = NameFormatter::default();
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    // Dynamic symbols first so exported names win over local duplicates
    for symbol in file.dynamic_symbols().chain(file.symbols()) {
        if !matches!(symbol.kind(), SymbolKind::Text | SymbolKind::Data) || !symbol.is_definition() {
            continue;
        }
        let Ok(name) = symbol.name() else {
            continue;
        };
        let Some(offset) = symbol.address().checked_sub(image_base) else {
            continue;
        };
        if name.is_empty() || !seen.insert((offset, name)) {
            continue;
        }
        let undecorated = names.undecorate(name).unwrap_or_else(|| name.to_string());
        symbols.push(CachedSymbol::new(offset, name, undecorated));
    }

    symbols.sort_by_key(|symbol| symbol.offset);
    let mut table = SymbolTable::new();
    for symbol in symbols {
        table.push_symbol(symbol);
    }
    table
}

fn load_lines(file: &object::File<'_>, image_base: u64, table: &mut SymbolTable) -> std::result::Result<(), gimli::Error>
{
    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };

    let dwarf = Dwarf::load(|id: SectionId| -> std::result::Result<OwnedReader, gimli::Error> {
        let data = file
            .section_by_name(id.name())
            .and_then(|section| section.uncompressed_data().ok())
            .unwrap_or(Cow::Borrowed(&[][..]));
        Ok(EndianArcSlice::new(Arc::<[u8]>::from(&*data), endian))
    })?;
    let context = Context::from_dwarf(dwarf)?;

    for (address, len, location) in context.find_location_range(0, u64::MAX)? {
        let (Some(source), Some(line)) = (location.file, location.line) else {
            continue;
        };
        if let Some(offset) = address.checked_sub(image_base) {
            table.push_line(offset, len, source, line);
        }
    }
    Ok(())
}

fn import_slots(file: &object::File<'_>, image_base: u64) -> Vec<ImportEntry>
{
    let (Some(relocations), Some(dynamic_symbols)) = (file.dynamic_relocations(), file.dynamic_symbol_table()) else {
        return Vec::new();
    };

    let mut imports = Vec::new();
    for (address, relocation) in relocations {
        let RelocationTarget::Symbol(index) = relocation.target() else {
            continue;
        };
        let Ok(symbol) = dynamic_symbols.symbol_by_index(index) else {
            continue;
        };
        if !symbol.is_undefined() {
            continue;
        }
        let (Ok(name), Some(offset)) = (symbol.name(), address.checked_sub(image_base)) else {
            continue;
        };
        if !name.is_empty() {
            imports.push(ImportEntry::new(offset, name));
        }
    }
    imports.sort_by_key(|import| import.offset);
    imports
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::symbols::SymbolSource;

    #[test]
    fn test_split_file_name()
    {
        assert_eq!(
            split_file_name(Path::new("C:/Windows/kernel32.dll")),
            ("kernel32".to_string(), ".dll".to_string())
        );
        assert_eq!(split_file_name(Path::new("/usr/bin/ls")), ("ls".to_string(), String::new()));
    }

    #[test]
    fn test_parse_rejects_non_images()
    {
        let path = std::env::temp_dir().join(format!("symdex-not-an-image-{}.txt", std::process::id()));
        fs::write(&path, b"definitely not an object file").unwrap();
        let result = ParsedImage::parse(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SymdexError::Parse { .. })));
    }

    #[test]
    fn test_parse_own_test_binary()
    {
        let exe = std::env::current_exe().unwrap();
        let image = ParsedImage::parse(&exe).unwrap();

        assert!(image.size > 0);
        assert!(!image.table.is_empty());
        assert_ne!(image.kind, DebugDataKind::None);
        assert!(image.table.find_by_name("main").is_some() || image.table.find_by_name("_main").is_some());

        let base = Address::new(0x7000_0000_0000);
        let module = image.into_module(base);
        if let Some(entry) = module.entry_point() {
            assert!(module.contains(entry));
        }

        let mut offsets = Vec::new();
        if let Some(source) = module.symbols.source() {
            source.enum_symbols(&mut |symbol| {
                offsets.push(symbol.offset);
                std::ops::ControlFlow::Continue(())
            });
        }
        assert!(offsets.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
