//! Tests for unified symbol enumeration

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use symdex_core::labels::LabelMap;
use symdex_core::modules::{ImportEntry, ImportTable, ModuleRecord, ModuleRegistry};
use symdex_core::symbols::names::ENTRY_POINT_LABEL;
use symdex_core::symbols::{CachedSymbol, ModuleSymbols, SymbolSource, SymbolTable};
use symdex_core::types::{Address, LineInfo, SymbolRecord};
use symdex_core::SymbolInfo;

const APP_BASE: Address = Address::new(0x400000);

fn symbol_info(module: ModuleRecord) -> SymbolInfo
{
    let registry = Arc::new(ModuleRegistry::new());
    registry.insert(module);
    SymbolInfo::new(registry, Arc::new(LabelMap::new()))
}

fn collect(info: &SymbolInfo, base: Address) -> Vec<SymbolRecord>
{
    let mut records = Vec::new();
    let visited = info.enumerate(base, |record| {
        records.push(record.clone());
        ControlFlow::Continue(())
    });
    assert_eq!(visited, records.len());
    records
}

fn app() -> ModuleRecord
{
    ModuleRecord::new(APP_BASE, 0x10000, "app", ".exe").with_entry_point(0x1000)
}

#[test]
fn test_entry_point_then_imports_without_cache()
{
    let info = symbol_info(app().with_imports(vec![
        ImportEntry::new(0x2000, "GetProcAddress"),
        ImportEntry::new(0x2008, "__imp_GetProcAddress"),
    ]));

    let records = collect(&info, APP_BASE);
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].address, Address::new(0x401000));
    assert_eq!(records[0].decorated, ENTRY_POINT_LABEL);
    assert_eq!(records[0].undecorated, None);
    assert!(!records[0].is_imported);

    assert_eq!(records[1].address, Address::new(0x402000));
    assert_eq!(records[1].decorated, "GetProcAddress");
    assert!(records[1].is_imported);

    assert_eq!(records[2].decorated, "__imp_GetProcAddress");
    assert!(records[2].is_imported);
    assert_eq!(records[2].undecorated, None);
}

#[test]
fn test_phase_order_is_cache_entry_imports()
{
    let table = SymbolTable::new()
        .with_symbol(0x1500, "_Z3fooi", "foo(int)")
        .with_symbol(0x1600, "bar", "bar");
    let info = symbol_info(
        app()
            .with_symbols(ModuleSymbols::loaded(table))
            .with_imports(vec![ImportEntry::new(0x2000, "ExitProcess")]),
    );

    let names: Vec<_> = collect(&info, APP_BASE)
        .into_iter()
        .map(|record| record.decorated)
        .collect();
    assert_eq!(names, ["_Z3fooi", "bar", ENTRY_POINT_LABEL, "ExitProcess"]);
}

#[test]
fn test_cached_names_collapse_and_keep_distinct_forms()
{
    let table = SymbolTable::new()
        .with_symbol(0x1500, "_Z3fooi", "foo(int)")
        .with_symbol(0x1600, "WinMain", "WinMain");
    let info = symbol_info(ModuleRecord::new(APP_BASE, 0x10000, "app", ".exe").with_symbols(ModuleSymbols::loaded(table)));

    let records = collect(&info, APP_BASE);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].address, Address::new(0x401500));
    assert_eq!(records[0].undecorated.as_deref(), Some("foo(int)"));
    assert_eq!(records[1].decorated, "WinMain");
    assert_eq!(records[1].undecorated, None);
}

#[test]
fn test_ordinal_at_module_base_is_suppressed()
{
    let table = SymbolTable::new()
        .with_symbol(0, "Ordinal5", "Ordinal5")
        .with_symbol(0x1200, "Ordinal6", "Ordinal6")
        .with_symbol(0, "DllMainOrdinalShim", "DllMainOrdinalShim")
        .with_symbol(0, "__ImageBase", "__ImageBase");
    let info = symbol_info(ModuleRecord::new(APP_BASE, 0x10000, "lib", ".dll").with_symbols(ModuleSymbols::loaded(table)));

    let names: Vec<_> = collect(&info, APP_BASE)
        .into_iter()
        .map(|record| record.decorated)
        .collect();
    assert_eq!(names, ["Ordinal6", "__ImageBase"]);
}

#[test]
fn test_cached_import_thunks_are_flagged()
{
    let table = SymbolTable::new()
        .with_symbol(0x3000, "__imp_CreateFileW", "__imp_CreateFileW")
        .with_symbol(0x1000, "start", "start");
    let info = symbol_info(ModuleRecord::new(APP_BASE, 0x10000, "app", ".exe").with_symbols(ModuleSymbols::loaded(table)));

    let records = collect(&info, APP_BASE);
    assert!(records[0].is_imported);
    assert!(!records[1].is_imported);
}

#[test]
fn test_empty_cached_undecorated_is_absent()
{
    let table = SymbolTable::new().with_symbol(0x1000, "?Run@App@@QEAAXXZ", "");
    let info = symbol_info(ModuleRecord::new(APP_BASE, 0x10000, "app", ".exe").with_symbols(ModuleSymbols::loaded(table)));

    let records = collect(&info, APP_BASE);
    assert_eq!(records[0].decorated, "?Run@App@@QEAAXXZ");
    assert_eq!(records[0].undecorated, None);
}

struct ClosedSource
{
    enumerated: AtomicUsize,
}

impl SymbolSource for ClosedSource
{
    fn is_open(&self) -> bool
    {
        false
    }

    fn enum_symbols(&self, visit: &mut dyn FnMut(&CachedSymbol) -> ControlFlow<()>)
    {
        self.enumerated.fetch_add(1, Ordering::SeqCst);
        let _ = visit(&CachedSymbol::new(0x10, "hidden", "hidden"));
    }

    fn find_source_line_info(&self, _offset: u64) -> Option<LineInfo>
    {
        None
    }
}

#[test]
fn test_closed_source_skips_cache_phase_only()
{
    let source = Arc::new(ClosedSource {
        enumerated: AtomicUsize::new(0),
    });
    let info = symbol_info(app().with_symbols(ModuleSymbols::Loaded(source.clone())));

    let records = collect(&info, APP_BASE);
    assert_eq!(source.enumerated.load(Ordering::SeqCst), 0);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].decorated, ENTRY_POINT_LABEL);
}

#[test]
fn test_stop_ends_all_phases()
{
    let table = SymbolTable::new()
        .with_symbol(0x1500, "first", "first")
        .with_symbol(0x1600, "second", "second");
    let info = symbol_info(
        app()
            .with_symbols(ModuleSymbols::loaded(table))
            .with_imports(vec![ImportEntry::new(0x2000, "ExitProcess")]),
    );

    let mut seen = Vec::new();
    let visited = info.enumerate(APP_BASE, |record| {
        seen.push(record.decorated.clone());
        ControlFlow::Break(())
    });
    assert_eq!(visited, 1);
    assert_eq!(seen, ["first"]);
}

#[test]
fn test_stop_at_entry_point_skips_imports()
{
    let info = symbol_info(app().with_imports(vec![ImportEntry::new(0x2000, "ExitProcess")]));

    let visited = info.enumerate(APP_BASE, |record| {
        if record.decorated == ENTRY_POINT_LABEL {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(visited, 1);
}

#[test]
fn test_unmapped_base_visits_nothing()
{
    let info = symbol_info(app().with_imports(vec![ImportEntry::new(0x2000, "ExitProcess")]));
    assert!(collect(&info, Address::new(0x900000)).is_empty());
}

#[test]
fn test_enumerate_from_cache_matches_enumerate()
{
    let table = SymbolTable::new().with_symbol(0x1500, "main", "main");
    let info = symbol_info(app().with_symbols(ModuleSymbols::loaded(table)));

    let mut via_cache = Vec::new();
    info.enumerate_from_cache(APP_BASE, |record| {
        via_cache.push(record.clone());
        ControlFlow::Continue(())
    });
    assert_eq!(via_cache, collect(&info, APP_BASE));
}

/// Import table standing in for a live process image.
struct LiveImports;

impl ImportTable for LiveImports
{
    fn for_each_import(&self, base: Address, visit: &mut dyn FnMut(Address, &str) -> ControlFlow<()>)
    {
        let _ = visit(base + 0x3000, "VirtualAlloc");
    }
}

#[test]
fn test_imports_come_from_supplied_table()
{
    let registry = Arc::new(ModuleRegistry::new());
    registry.insert(app().with_imports(vec![ImportEntry::new(0x2000, "FromDisk")]));
    let info = SymbolInfo::new(registry, Arc::new(LabelMap::new())).with_imports(Arc::new(LiveImports));

    let records = collect(&info, APP_BASE);
    let imports: Vec<_> = records
        .iter()
        .filter(|record| record.is_imported)
        .map(|record| (record.address, record.decorated.as_str()))
        .collect();
    assert_eq!(imports, [(Address::new(0x403000), "VirtualAlloc")]);
}
