//! # Symbol Information
//!
//! Read-side entry point used by disassembly, call-stack and breakpoint views:
//! every address they show goes through [`SymbolInfo`] to get the best
//! available name.
//!
//! - [`SymbolInfo::enumerate`]: unified symbol stream of a module
//! - [`SymbolInfo::resolve_symbolic_name`]: label / module display name of an address
//! - [`SymbolInfo::find_source_line`]: file and line of an address
//! - [`SymbolInfo::module_list`] / [`SymbolInfo::update_module_list`]: module snapshots
//!
//! None of these write to the registry or the label store, and none of them
//! fail: missing data produces an empty result.
//!
//! ## Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use std::sync::Arc;
//!
//! use symdex_core::labels::LabelMap;
//! use symdex_core::modules::{ModuleRecord, ModuleRegistry};
//! use symdex_core::types::Address;
//! use symdex_core::SymbolInfo;
//!
//! let registry = Arc::new(ModuleRegistry::new());
//! registry.insert(ModuleRecord::new(Address::new(0x400000), 0x10000, "app", ".exe").with_entry_point(0x1000));
//! let info = SymbolInfo::new(registry, Arc::new(LabelMap::new()));
//!
//! let mut names = Vec::new();
//! info.enumerate(Address::new(0x400000), |record| {
//!     names.push(record.decorated.clone());
//!     ControlFlow::Continue(())
//! });
//! assert_eq!(names, ["OptionalHeader.AddressOfEntryPoint"]);
//! assert_eq!(info.resolve_symbolic_name(Address::new(0x401000)), "app.0x0000000000401000");
//! ```

mod enumerate;
mod resolve;
mod source_line;

use std::sync::Arc;

pub use resolve::addr_from_name;

use crate::labels::LabelStore;
use crate::modules::{ImportTable, ModuleListSink, ModuleRegistry};
use crate::symbols::NameFormatter;
use crate::types::SymbolModuleInfo;

/// Symbol lookups over the loaded modules of one debuggee.
#[derive(Clone)]
pub struct SymbolInfo
{
    registry: Arc<ModuleRegistry>,
    imports: Arc<dyn ImportTable>,
    labels: Arc<dyn LabelStore>,
    names: NameFormatter,
}

impl SymbolInfo
{
    /// Resolver over `registry`, reading live imports from the registry itself.
    pub fn new(registry: Arc<ModuleRegistry>, labels: Arc<dyn LabelStore>) -> Self
    {
        Self {
            imports: registry.clone(),
            registry,
            labels,
            names: NameFormatter::default(),
        }
    }

    /// Read live import address tables from `imports` instead of the registry.
    #[must_use]
    pub fn with_imports(mut self, imports: Arc<dyn ImportTable>) -> Self
    {
        self.imports = imports;
        self
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry>
    {
        &self.registry
    }

    /// Point-in-time `{ base, name+extension }` list of every loaded module.
    pub fn module_list(&self) -> Vec<SymbolModuleInfo>
    {
        self.registry.snapshot()
    }

    /// Publish the current module list to `sink`.
    pub fn update_module_list(&self, sink: &dyn ModuleListSink)
    {
        let modules = self.module_list();
        tracing::debug!(count = modules.len(), "publishing module list");
        sink.update_module_list(&modules);
    }
}
