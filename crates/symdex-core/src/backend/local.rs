//! # Local Symbol Backend
//!
//! [`SymbolBackend`] over the module registry and debug files on local disk.
//!
//! ## Search paths
//!
//! A search path is a `;`-separated list of entries:
//!
//! - a plain directory, searched for `<image>.debug` and then `<image>`
//! - `SRV*<cache>*<store>`: the local cache directory of a symbol server,
//!   searched the same way under `<cache>/<image>/`. Fetching from the
//!   remote store itself is left to a networked backend; nothing is
//!   downloaded here.
//!
//! The empty search path means "the image's own directory".
//!
//! ## Loading
//!
//! [`load_module`](SymbolBackend::load_module) only records the request.
//! The debug file is located and parsed the first time the module is
//! queried through [`module_info`](SymbolBackend::module_info), and the
//! resulting symbol table replaces the module's symbol source in the
//! registry. If no debug file is found on the search path, the image itself
//! is parsed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use once_cell::sync::OnceCell;

use super::{BackendModuleInfo, SymOptions, SymbolBackend};
use crate::config::{is_server_entry, ServerPath};
use crate::error::{Result, SymdexError};
use crate::modules::ModuleRegistry;
use crate::symbols::image::ParsedImage;
use crate::symbols::{ModuleSymbols, SymbolTable};
use crate::types::{Address, DebugDataKind};

/// Debug data requested for one module.
struct LoadedModule
{
    image: PathBuf,
    /// Search path in effect when the load was requested.
    search_path: String,
    /// Shared so parsing can run with the state lock released.
    data: Arc<OnceCell<Materialized>>,
}

struct Materialized
{
    kind: DebugDataKind,
    debug_file: PathBuf,
    table: Arc<SymbolTable>,
}

#[derive(Default)]
struct BackendState
{
    search_path: String,
    options: SymOptions,
    /// Keyed by base; name lookups walk it in base order.
    loaded: BTreeMap<Address, LoadedModule>,
}

/// Symbol backend reading debug files from local directories.
pub struct LocalBackend
{
    registry: Arc<ModuleRegistry>,
    state: RwLock<BackendState>,
}

impl LocalBackend
{
    pub fn new(registry: Arc<ModuleRegistry>) -> Self
    {
        Self {
            registry,
            state: RwLock::new(BackendState {
                options: SymOptions::UNDNAME | SymOptions::DEFERRED_LOADS | SymOptions::LOAD_LINES,
                ..BackendState::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BackendState>
    {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BackendState>
    {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Candidate debug files for `image` under `search_path`, in search order.
    fn debug_file_candidates(image: &Path, search_path: &str) -> Vec<PathBuf>
    {
        let Some(file_name) = image.file_name() else {
            return Vec::new();
        };
        let debug_name = {
            let mut name = file_name.to_os_string();
            name.push(".debug");
            name
        };

        let mut directories = Vec::new();
        if search_path.trim().is_empty() {
            if let Some(parent) = image.parent() {
                directories.push(parent.to_path_buf());
            }
        }
        for entry in search_path.split(';').map(str::trim).filter(|entry| !entry.is_empty()) {
            match ServerPath::parse(entry) {
                Some(server) => directories.push(server.cache_dir.join(file_name)),
                None => directories.push(PathBuf::from(entry)),
            }
        }

        directories
            .into_iter()
            .flat_map(|dir| [dir.join(&debug_name), dir.join(file_name)])
            .filter(|candidate| candidate != image)
            .collect()
    }

    fn materialize(image: &Path, search_path: &str) -> Result<Materialized>
    {
        let debug_file = Self::debug_file_candidates(image, search_path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| image.to_path_buf());

        let parsed = ParsedImage::parse(&debug_file)?;
        tracing::debug!(
            image = %image.display(),
            debug_file = %debug_file.display(),
            kind = %parsed.kind,
            "materialized debug data"
        );
        Ok(Materialized {
            kind: parsed.kind,
            debug_file,
            table: Arc::new(parsed.table),
        })
    }
}

impl SymbolBackend for LocalBackend
{
    fn search_path(&self) -> Result<String>
    {
        Ok(self.read().search_path.clone())
    }

    fn set_search_path(&self, path: &str) -> Result<()>
    {
        for entry in path.split(';').map(str::trim) {
            if is_server_entry(entry) && ServerPath::parse(entry).is_none() {
                return Err(SymdexError::InvalidArgument(format!(
                    "malformed symbol server entry `{entry}`, expected SRV*cache*store"
                )));
            }
        }
        self.write().search_path = path.to_string();
        Ok(())
    }

    fn options(&self) -> SymOptions
    {
        self.read().options
    }

    fn set_options(&self, options: SymOptions)
    {
        self.write().options = options;
    }

    fn module_file_path(&self, base: Address) -> Result<PathBuf>
    {
        self.registry
            .with_module(base, |module| module.path.clone())
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(SymdexError::ModuleNotFound(base))
    }

    fn unload_module(&self, base: Address) -> Result<()>
    {
        if !self.registry.set_symbols(base, ModuleSymbols::Empty) {
            return Err(SymdexError::ModuleNotFound(base));
        }
        self.write().loaded.remove(&base);
        Ok(())
    }

    fn load_module(&self, image: &Path, base: Address) -> Result<()>
    {
        if !image.is_file() {
            return Err(SymdexError::backend(
                "load_module",
                format!("{} is not a file", image.display()),
            ));
        }
        let mut state = self.write();
        let search_path = state.search_path.clone();
        state.loaded.insert(
            base,
            LoadedModule {
                image: image.to_path_buf(),
                search_path,
                data: Arc::new(OnceCell::new()),
            },
        );
        Ok(())
    }

    fn module_info(&self, base: Address) -> Result<BackendModuleInfo>
    {
        let (image, search_path, cell) = {
            let state = self.read();
            let loaded = state
                .loaded
                .get(&base)
                .ok_or_else(|| SymdexError::backend("module_info", format!("nothing loaded at {base}")))?;
            (loaded.image.clone(), loaded.search_path.clone(), Arc::clone(&loaded.data))
        };

        let data = cell.get_or_try_init(|| Self::materialize(&image, &search_path))?;
        self.registry
            .set_symbols(base, ModuleSymbols::Loaded(Arc::clone(&data.table) as Arc<dyn crate::symbols::SymbolSource>));
        Ok(BackendModuleInfo {
            base,
            kind: data.kind,
            debug_file: Some(data.debug_file.clone()),
        })
    }

    fn symbol_from_name(&self, name: &str) -> Result<Address>
    {
        let state = self.read();
        state
            .loaded
            .iter()
            .find_map(|(base, loaded)| {
                let offset = loaded.data.get()?.table.find_by_name(name)?;
                Some(*base + offset)
            })
            .ok_or_else(|| SymdexError::SymbolNotFound(name.to_string()))
    }
}
