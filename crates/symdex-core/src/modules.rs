//! # Module Registry
//!
//! Loaded modules of the debuggee, keyed by base address.
//!
//! The registry is written by whoever tracks module load/unload events and
//! read by the resolution code in this crate. Reads take a shared lock for
//! the duration of a single lookup or iteration; no lock is held across
//! calls.
//!
//! ## Collaborator traits
//!
//! - [`ImportTable`]: walks a module's live import address table
//! - [`ModuleListSink`]: receives flattened module list snapshots

use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::{truncate_to, MAX_MODULE_SIZE};
use crate::symbols::ModuleSymbols;
use crate::types::{Address, SymbolModuleInfo};

/// One imported function slot of a module's import address table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry
{
    /// Offset of the slot from the module base.
    pub offset: u64,
    /// Imported function name.
    pub name: String,
}

impl ImportEntry
{
    pub fn new(offset: u64, name: impl Into<String>) -> Self
    {
        Self {
            offset,
            name: name.into(),
        }
    }
}

/// A module mapped into the debuggee.
#[derive(Debug, Clone)]
pub struct ModuleRecord
{
    pub base: Address,
    /// Size of the mapped image in bytes.
    pub size: u64,
    /// File name without extension, e.g. `kernel32`.
    pub name: String,
    /// Extension including the dot, e.g. `.dll`. Empty if the file has none.
    pub extension: String,
    /// Path of the image on disk, if known.
    pub path: PathBuf,
    /// Entry point as an offset from `base`.
    pub entry_point_offset: Option<u64>,
    pub symbols: ModuleSymbols,
    /// Import address table slots.
    pub imports: Vec<ImportEntry>,
}

impl ModuleRecord
{
    pub fn new(base: Address, size: u64, name: impl Into<String>, extension: impl Into<String>) -> Self
    {
        Self {
            base,
            size,
            name: name.into(),
            extension: extension.into(),
            path: PathBuf::new(),
            entry_point_offset: None,
            symbols: ModuleSymbols::Empty,
            imports: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self
    {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_entry_point(mut self, offset: u64) -> Self
    {
        self.entry_point_offset = Some(offset);
        self
    }

    #[must_use]
    pub fn with_symbols(mut self, symbols: ModuleSymbols) -> Self
    {
        self.symbols = symbols;
        self
    }

    #[must_use]
    pub fn with_imports(mut self, imports: Vec<ImportEntry>) -> Self
    {
        self.imports = imports;
        self
    }

    /// `true` if `address` lies in `[base, base + size)`.
    pub fn contains(&self, address: Address) -> bool
    {
        address
            .offset_from(self.base)
            .is_some_and(|offset| offset < self.size)
    }

    /// Absolute entry point, if the module has one and it is not null.
    pub fn entry_point(&self) -> Option<Address>
    {
        let offset = self.entry_point_offset?;
        self.base.checked_add(offset).filter(|entry| !entry.is_zero())
    }

    /// Name and extension concatenated.
    pub fn full_name(&self) -> String
    {
        format!("{}{}", self.name, self.extension)
    }

    /// Snapshot entry for this module.
    pub fn snapshot(&self) -> SymbolModuleInfo
    {
        SymbolModuleInfo {
            base: self.base,
            name: truncate_to(&self.full_name(), MAX_MODULE_SIZE),
        }
    }
}

/// Walks the live import address table of a module.
pub trait ImportTable: Send + Sync
{
    /// Visit every import slot of the module containing `base` with the
    /// slot's absolute address and the imported name, until `visit` breaks.
    fn for_each_import(&self, base: Address, visit: &mut dyn FnMut(Address, &str) -> ControlFlow<()>);
}

/// Receiver of module list snapshots (typically a UI).
pub trait ModuleListSink
{
    fn update_module_list(&self, modules: &[SymbolModuleInfo]);
}

/// Loaded modules keyed by base address.
#[derive(Debug, Default)]
pub struct ModuleRegistry
{
    modules: RwLock<BTreeMap<Address, ModuleRecord>>,
}

impl ModuleRegistry
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<Address, ModuleRecord>>
    {
        self.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<Address, ModuleRecord>>
    {
        self.modules.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a loaded module, replacing any module at the same base.
    pub fn insert(&self, module: ModuleRecord) -> Option<ModuleRecord>
    {
        self.write().insert(module.base, module)
    }

    /// Forget the module loaded at `base`.
    pub fn remove(&self, base: Address) -> Option<ModuleRecord>
    {
        self.write().remove(&base)
    }

    pub fn len(&self) -> usize
    {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.read().is_empty()
    }

    /// Run `f` on the module containing `address` while holding the shared lock.
    pub fn with_module<R>(&self, address: Address, f: impl FnOnce(&ModuleRecord) -> R) -> Option<R>
    {
        let modules = self.read();
        let (_, module) = modules.range(..=address).next_back()?;
        module.contains(address).then(|| f(module))
    }

    /// Run `f` on every module in base address order while holding the shared lock.
    pub fn for_each_module(&self, mut f: impl FnMut(&ModuleRecord))
    {
        for module in self.read().values() {
            f(module);
        }
    }

    /// Base address of the module containing `address`.
    pub fn module_base(&self, address: Address) -> Option<Address>
    {
        self.with_module(address, |module| module.base)
    }

    /// Name (without extension) of the module containing `address`.
    pub fn module_name(&self, address: Address) -> Option<String>
    {
        self.with_module(address, |module| module.name.clone())
    }

    /// Absolute entry point of the module containing `address`.
    pub fn entry_point(&self, address: Address) -> Option<Address>
    {
        self.with_module(address, ModuleRecord::entry_point).flatten()
    }

    /// Replace the symbol source of the module loaded at exactly `base`.
    ///
    /// Returns `false` if no module is loaded there.
    pub fn set_symbols(&self, base: Address, symbols: ModuleSymbols) -> bool
    {
        match self.write().get_mut(&base) {
            Some(module) => {
                module.symbols = symbols;
                true
            }
            None => false,
        }
    }

    /// Flattened `{ base, name+extension }` copy of every module.
    pub fn snapshot(&self) -> Vec<SymbolModuleInfo>
    {
        let mut modules = Vec::new();
        self.for_each_module(|module| modules.push(module.snapshot()));
        modules
    }
}

impl ImportTable for ModuleRegistry
{
    fn for_each_import(&self, base: Address, visit: &mut dyn FnMut(Address, &str) -> ControlFlow<()>)
    {
        // Copy out so the visitor never runs under the registry lock
        let Some(imports) = self.with_module(base, |module| {
            module
                .imports
                .iter()
                .map(|import| (module.base + import.offset, import.name.clone()))
                .collect::<Vec<_>>()
        }) else {
            return;
        };

        for (address, name) in &imports {
            if visit(*address, name).is_break() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn registry() -> ModuleRegistry
    {
        let registry = ModuleRegistry::new();
        registry.insert(ModuleRecord::new(Address::new(0x400000), 0x10000, "app", ".exe").with_entry_point(0x1000));
        registry.insert(ModuleRecord::new(Address::new(0x7ff0_0000), 0x2000, "kernel32", ".dll"));
        registry
    }

    #[test]
    fn test_lookup_by_contained_address()
    {
        let registry = registry();
        assert_eq!(registry.module_name(Address::new(0x400000)).as_deref(), Some("app"));
        assert_eq!(registry.module_name(Address::new(0x40ffff)).as_deref(), Some("app"));
        assert_eq!(registry.module_name(Address::new(0x410000)), None);
        assert_eq!(registry.module_name(Address::new(0x3fffff)), None);
        assert_eq!(
            registry.module_base(Address::new(0x7ff0_1000)),
            Some(Address::new(0x7ff0_0000))
        );
    }

    #[test]
    fn test_entry_point()
    {
        let registry = registry();
        assert_eq!(registry.entry_point(Address::new(0x400000)), Some(Address::new(0x401000)));
        assert_eq!(registry.entry_point(Address::new(0x7ff0_0000)), None);
    }

    #[test]
    fn test_snapshot_concatenates_extension()
    {
        let registry = registry();
        let names: Vec<_> = registry.snapshot().into_iter().map(|info| info.name).collect();
        assert_eq!(names, ["app.exe", "kernel32.dll"]);
    }

    #[test]
    fn test_snapshot_name_is_capped()
    {
        let long = "m".repeat(400);
        let module = ModuleRecord::new(Address::new(0x1000), 0x1000, long, ".so");
        assert_eq!(module.snapshot().name.len(), MAX_MODULE_SIZE - 1);
    }

    #[test]
    fn test_imports_are_rebased()
    {
        let registry = ModuleRegistry::new();
        registry.insert(
            ModuleRecord::new(Address::new(0x400000), 0x10000, "app", ".exe")
                .with_imports(vec![ImportEntry::new(0x2000, "GetProcAddress")]),
        );

        let mut seen = Vec::new();
        registry.for_each_import(Address::new(0x400000), &mut |address, name| {
            seen.push((address, name.to_string()));
            ControlFlow::Continue(())
        });
        assert_eq!(seen, [(Address::new(0x402000), "GetProcAddress".to_string())]);
    }
}
