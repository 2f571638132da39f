//! Unified symbol enumeration.

use std::ops::ControlFlow;

use super::SymbolInfo;
use crate::types::{Address, SymbolRecord};

impl SymbolInfo
{
    /// Stream every known symbol of the module containing `base` to `visit`.
    ///
    /// Records arrive in a fixed order:
    ///
    /// 1. Cached symbols from the module's symbol source, read under the
    ///    registry's shared lock. Skipped if the module has no open source.
    /// 2. One synthetic entry point record, if the module has an entry point.
    /// 3. Every slot of the module's live import address table.
    ///
    /// Cached symbols whose name contains `Ordinal` and whose address is the
    /// module base are dropped. Returning [`ControlFlow::Break`] from `visit`
    /// ends enumeration immediately, later phases included.
    ///
    /// An address outside every module visits nothing. Returns the number of
    /// records visited.
    pub fn enumerate<F>(&self, base: Address, mut visit: F) -> usize
    where
        F: FnMut(&SymbolRecord) -> ControlFlow<()>,
    {
        let mut visited = 0;
        let mut emit = |record: &SymbolRecord| {
            visited += 1;
            visit(record)
        };

        if self.enum_cached(base, &mut emit).is_break() {
            return visited;
        }

        // Outside the registry lock
        if let Some(entry) = self.registry.entry_point(base) {
            if emit(&self.names.entry_point_record(entry)).is_break() {
                return visited;
            }
        }

        self.imports.for_each_import(base, &mut |address, name| match self.names.import_record(address, name) {
            Some(record) => emit(&record),
            None => ControlFlow::Continue(()),
        });
        visited
    }

    /// Same stream as [`enumerate`](Self::enumerate); the cached table is
    /// always the first phase.
    pub fn enumerate_from_cache<F>(&self, base: Address, visit: F) -> usize
    where
        F: FnMut(&SymbolRecord) -> ControlFlow<()>,
    {
        self.enumerate(base, visit)
    }

    fn enum_cached(&self, base: Address, emit: &mut dyn FnMut(&SymbolRecord) -> ControlFlow<()>) -> ControlFlow<()>
    {
        self.registry
            .with_module(base, |module| {
                let Some(source) = module.symbols.open_source() else {
                    tracing::trace!(module = %module.name, "no open symbol source");
                    return ControlFlow::Continue(());
                };

                let mut flow = ControlFlow::Continue(());
                source.enum_symbols(&mut |symbol| {
                    let Some(record) = self.names.cached_record(module.base, symbol) else {
                        return ControlFlow::Continue(());
                    };
                    flow = emit(&record);
                    flow
                });
                flow
            })
            .unwrap_or(ControlFlow::Continue(()))
    }
}
