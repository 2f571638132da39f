//! # Symbol Store Sync
//!
//! Reloads the debug information of every loaded module from a symbol store.
//!
//! A pass works on a snapshot of the module list taken when it starts, so
//! modules loaded or unloaded meanwhile are not picked up. For each module
//! it tries these search paths in order and stops at the first one that
//! yields full symbolic data:
//!
//! 1. the backend's default search path (no override)
//! 2. `SRV*<cache_dir>*<store>`, the explicit symbol server override
//!
//! Export-only data counts as a failed attempt. A module that never reaches
//! full data keeps whatever the last attempt left loaded.
//!
//! The backend's global search path and options are held by a
//! [`BackendStateGuard`] for the whole pass and restored when it ends.

mod guard;

use smallvec::{smallvec, SmallVec};

pub use guard::BackendStateGuard;

use crate::backend::{SymOptions, SymbolBackend};
use crate::config::SymbolConfig;
use crate::error::Result;
use crate::modules::ModuleRegistry;
use crate::types::{DebugDataKind, SymbolModuleInfo};

/// How a module fared in a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome
{
    /// Full symbolic data was obtained.
    Full,
    /// The last attempt loaded something, but not full symbolic data.
    Incomplete(DebugDataKind),
    /// The last attempt failed with this error.
    Failed(String),
}

/// Result of syncing one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSyncResult
{
    pub module: SymbolModuleInfo,
    pub outcome: SyncOutcome,
    /// Number of search paths tried.
    pub attempts: usize,
}

/// Result of a whole sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary
{
    /// Store URL the pass used.
    pub store: String,
    pub modules: Vec<ModuleSyncResult>,
}

impl SyncSummary
{
    /// Modules that ended with full symbolic data.
    pub fn succeeded(&self) -> usize
    {
        self.modules
            .iter()
            .filter(|result| result.outcome == SyncOutcome::Full)
            .count()
    }

    /// Modules that did not.
    pub fn failed(&self) -> usize
    {
        self.modules.len() - self.succeeded()
    }
}

/// Symbol store sync over the modules of one registry.
pub struct SymbolStoreSync<'a, B>
where
    B: SymbolBackend + ?Sized,
{
    backend: &'a B,
    registry: &'a ModuleRegistry,
    config: &'a SymbolConfig,
}

impl<'a, B> SymbolStoreSync<'a, B>
where
    B: SymbolBackend + ?Sized,
{
    pub fn new(backend: &'a B, registry: &'a ModuleRegistry, config: &'a SymbolConfig) -> Self
    {
        Self {
            backend,
            registry,
            config,
        }
    }

    /// Reload every loaded module from `store_url` (the configured default
    /// store if `None`).
    ///
    /// Per-module failures are logged and reported in the summary; they never
    /// stop the pass. The backend's search path and options are the same
    /// afterwards as before, unless restoring the search path fails, which is
    /// logged.
    ///
    /// ## Errors
    ///
    /// Fails without touching anything if the backend's current search path
    /// cannot be read, since it could not be restored afterwards.
    pub fn sync_all(&self, store_url: Option<&str>) -> Result<SyncSummary>
    {
        let store = store_url.unwrap_or(&self.config.default_store).to_string();
        let modules = self.registry.snapshot();
        if modules.is_empty() {
            tracing::debug!("no modules loaded, nothing to sync");
            return Ok(SyncSummary {
                store,
                modules: Vec::new(),
            });
        }

        let guard = BackendStateGuard::acquire(self.backend, SymOptions::IGNORE_CVREC)
            .inspect_err(|err| tracing::error!(%err, "failed to read symbol search path"))?;
        tracing::debug!(saved = guard.saved_search_path(), %store, "starting symbol sync");

        let candidates: SmallVec<[String; 2]> = smallvec![String::new(), self.config.server_search_path(&store)];
        let results: Vec<_> = modules
            .into_iter()
            .map(|module| self.sync_module(module, &candidates))
            .collect();

        if let Err(err) = guard.restore() {
            tracing::error!(%err, "failed to restore symbol search path");
        }

        let summary = SyncSummary { store, modules: results };
        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "symbol sync finished"
        );
        Ok(summary)
    }

    fn sync_module(&self, module: SymbolModuleInfo, candidates: &[String]) -> ModuleSyncResult
    {
        let mut outcome = SyncOutcome::Failed("no search path candidates".to_string());
        let mut attempts = 0;

        for search_path in candidates {
            attempts += 1;
            match self.try_search_path(&module, search_path) {
                Ok(kind) if kind.is_full() => {
                    tracing::info!(module = %module.name, base = %module.base, "symbols loaded");
                    outcome = SyncOutcome::Full;
                    break;
                }
                Ok(kind) => {
                    tracing::warn!(module = %module.name, base = %module.base, %kind, "no full symbolic data");
                    outcome = SyncOutcome::Incomplete(kind);
                }
                Err(err) => {
                    tracing::warn!(module = %module.name, base = %module.base, %err, "symbol download attempt failed");
                    outcome = SyncOutcome::Failed(err.to_string());
                }
            }
        }

        ModuleSyncResult {
            module,
            outcome,
            attempts,
        }
    }

    fn try_search_path(&self, module: &SymbolModuleInfo, search_path: &str) -> Result<DebugDataKind>
    {
        self.backend.set_search_path(search_path)?;
        tracing::info!(module = %module.name, search_path, "downloading symbols for {}", module.name);

        let image = self.backend.module_file_path(module.base)?;
        self.backend.unload_module(module.base)?;
        self.backend.load_module(&image, module.base)?;

        // Loads are lazy; querying materialises them and reports the real kind
        Ok(self.backend.module_info(module.base)?.kind)
    }
}
