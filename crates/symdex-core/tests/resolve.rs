//! Tests for address to name and address to source line resolution

use std::path::{Path, PathBuf};
use std::sync::Arc;

use symdex_core::backend::{BackendModuleInfo, SymOptions, SymbolBackend};
use symdex_core::config::MAX_STRING_SIZE;
use symdex_core::events::{event_channel, SymbolEvent};
use symdex_core::labels::LabelMap;
use symdex_core::modules::{ModuleRecord, ModuleRegistry};
use symdex_core::symbols::{ModuleSymbols, SymbolTable};
use symdex_core::types::Address;
use symdex_core::{addr_from_name, Result, SymbolInfo, SymdexError};

fn fixture() -> (SymbolInfo, Arc<LabelMap>)
{
    let registry = Arc::new(ModuleRegistry::new());
    let table = SymbolTable::new()
        .with_symbol(0x1000, "main", "main")
        .with_line(0x1000, 0x20, "src/main.c", 10)
        .with_line(0x1020, 0x10, "src/main.c", 11);
    registry.insert(
        ModuleRecord::new(Address::new(0x400000), 0x10000, "app", ".exe")
            .with_entry_point(0x1000)
            .with_symbols(ModuleSymbols::loaded(table)),
    );
    registry.insert(ModuleRecord::new(Address::new(0x7ff0_0000), 0x10000, "ntdll", ".dll"));

    let labels = Arc::new(LabelMap::new());
    let info = SymbolInfo::new(registry, labels.clone());
    (info, labels)
}

#[test]
fn test_label_inside_module()
{
    let (info, labels) = fixture();
    labels.set_label(Address::new(0x401000), "entry");
    assert_eq!(info.resolve_symbolic_name(Address::new(0x401000)), "<app.entry>");
}

#[test]
fn test_label_outside_modules()
{
    let (info, labels) = fixture();
    labels.set_label(Address::new(0x1234), "scratch");
    assert_eq!(info.resolve_symbolic_name(Address::new(0x1234)), "<scratch>");
}

#[test]
fn test_module_without_label()
{
    let (info, _labels) = fixture();
    assert_eq!(
        info.resolve_symbolic_name(Address::new(0x7ff0_0010)),
        "ntdll.0x000000007ff00010"
    );
}

#[test]
fn test_unresolved_is_empty()
{
    let (info, _labels) = fixture();
    assert_eq!(info.resolve_symbolic_name(Address::new(0x10)), "");
}

#[test]
fn test_label_is_exact_address_only()
{
    let (info, labels) = fixture();
    labels.set_label(Address::new(0x401000), "entry");
    assert_eq!(info.resolve_symbolic_name(Address::new(0x401001)), "app.0x0000000000401001");

    labels.remove_label(Address::new(0x401000));
    assert_eq!(info.resolve_symbolic_name(Address::new(0x401000)), "app.0x0000000000401000");
}

#[test]
fn test_source_line_found()
{
    let (info, _labels) = fixture();
    let line = info.find_source_line(Address::new(0x401024)).unwrap();
    assert_eq!(line.file, "src/main.c");
    assert_eq!(line.line, 11);
    assert_eq!(line.displacement, 0);
}

#[test]
fn test_source_line_absent_outside_modules()
{
    let (info, _labels) = fixture();
    assert!(info.find_source_line(Address::new(0x10)).is_none());
}

#[test]
fn test_source_line_absent_without_symbols()
{
    let (info, _labels) = fixture();
    assert!(info.find_source_line(Address::new(0x7ff0_0010)).is_none());
}

#[test]
fn test_source_line_absent_without_line_entry()
{
    let (info, _labels) = fixture();
    assert!(info.find_source_line(Address::new(0x402000)).is_none());
}

#[test]
fn test_source_line_file_is_bounded()
{
    let registry = Arc::new(ModuleRegistry::new());
    let long_path = format!("/{}", "d".repeat(MAX_STRING_SIZE * 2));
    registry.insert(
        ModuleRecord::new(Address::new(0x400000), 0x10000, "app", "")
            .with_symbols(ModuleSymbols::loaded(SymbolTable::new().with_line(0x10, 4, &long_path, 3))),
    );
    let info = SymbolInfo::new(registry, Arc::new(LabelMap::new()));

    let line = info.find_source_line(Address::new(0x400010)).unwrap();
    assert_eq!(line.file.len(), MAX_STRING_SIZE - 1);
    assert!(long_path.starts_with(&line.file));
}

#[test]
fn test_module_list_published()
{
    let (info, _labels) = fixture();
    let (sender, receiver) = event_channel();
    info.update_module_list(&sender);

    match receiver.try_recv().unwrap() {
        SymbolEvent::ModuleListUpdated(modules) => {
            let names: Vec<_> = modules.iter().map(|module| module.name.as_str()).collect();
            assert_eq!(names, ["app.exe", "ntdll.dll"]);
            assert_eq!(modules[0].base, Address::new(0x400000));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_empty_module_list_published()
{
    let info = SymbolInfo::new(Arc::new(ModuleRegistry::new()), Arc::new(LabelMap::new()));
    let (sender, receiver) = event_channel();
    info.update_module_list(&sender);
    assert_eq!(receiver.try_recv().unwrap(), SymbolEvent::ModuleListUpdated(Vec::new()));
}

/// Backend that only answers name lookups.
struct NameLookup;

impl SymbolBackend for NameLookup
{
    fn search_path(&self) -> Result<String>
    {
        Ok(String::new())
    }

    fn set_search_path(&self, _path: &str) -> Result<()>
    {
        Ok(())
    }

    fn options(&self) -> SymOptions
    {
        SymOptions::default()
    }

    fn set_options(&self, _options: SymOptions) {}

    fn module_file_path(&self, base: Address) -> Result<PathBuf>
    {
        Err(SymdexError::ModuleNotFound(base))
    }

    fn unload_module(&self, base: Address) -> Result<()>
    {
        Err(SymdexError::ModuleNotFound(base))
    }

    fn load_module(&self, _image: &Path, base: Address) -> Result<()>
    {
        Err(SymdexError::ModuleNotFound(base))
    }

    fn module_info(&self, base: Address) -> Result<BackendModuleInfo>
    {
        Err(SymdexError::ModuleNotFound(base))
    }

    fn symbol_from_name(&self, name: &str) -> Result<Address>
    {
        match name {
            "CreateFileW" => Ok(Address::new(0x7ff0_1230)),
            _ => Err(SymdexError::SymbolNotFound(name.to_string())),
        }
    }
}

#[test]
fn test_addr_from_name()
{
    assert_eq!(addr_from_name(&NameLookup, "CreateFileW"), Some(Address::new(0x7ff0_1230)));
    assert_eq!(addr_from_name(&NameLookup, "Missing"), None);
    assert_eq!(addr_from_name(&NameLookup, ""), None);
}

#[test]
fn test_addr_from_name_rejects_ordinals()
{
    assert_eq!(addr_from_name(&NameLookup, "Ordinal12"), None);
    assert_eq!(addr_from_name(&NameLookup, "ordinal12"), None);
    assert_eq!(addr_from_name(&NameLookup, "ORDINAL"), None);
}
