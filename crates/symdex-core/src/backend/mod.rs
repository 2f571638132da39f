//! # Symbol Backend
//!
//! Interface to the engine that actually loads debug information.
//!
//! The backend owns process-wide state that the sync pass borrows
//! temporarily: the symbol search path and the engine option flags. Its
//! module operations work on base addresses, mirroring a native symbol
//! engine's load/unload/query calls. Each call reports failure through
//! [`Result`](crate::error::Result); callers decide whether a failure is fatal.
//!
//! [`LocalBackend`] implements the trait over on-disk images and local
//! debug files.

pub mod local;

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::path::{Path, PathBuf};

pub use local::LocalBackend;

use crate::error::Result;
use crate::types::{Address, DebugDataKind};

/// Symbol engine option flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymOptions(u32);

impl SymOptions
{
    /// Undecorate names as they are loaded.
    pub const UNDNAME: Self = SymOptions(0x0000_0002);
    /// Load debug information lazily, on first query.
    pub const DEFERRED_LOADS: Self = SymOptions(0x0000_0004);
    /// Load line number information.
    pub const LOAD_LINES: Self = SymOptions(0x0000_0010);
    /// Skip debug record validation when locating debug files.
    pub const IGNORE_CVREC: Self = SymOptions(0x0000_0080);

    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// These options with every flag of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self
    {
        SymOptions(self.0 & !other.0)
    }
}

impl BitOr for SymOptions
{
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self
    {
        SymOptions(self.0 | rhs.0)
    }
}

impl BitAnd for SymOptions
{
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self
    {
        SymOptions(self.0 & rhs.0)
    }
}

impl Not for SymOptions
{
    type Output = Self;

    fn not(self) -> Self
    {
        SymOptions(!self.0)
    }
}

impl fmt::Display for SymOptions
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08x}", self.0)
    }
}

/// What the backend knows about a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendModuleInfo
{
    pub base: Address,
    /// Kind of debug data actually obtained.
    pub kind: DebugDataKind,
    /// File the debug data was read from, if any.
    pub debug_file: Option<PathBuf>,
}

/// Native symbol engine operations used by this crate.
///
/// Methods take `&self`; implementations guard their own state.
pub trait SymbolBackend
{
    /// Current global search path.
    fn search_path(&self) -> Result<String>;

    /// Replace the global search path. An empty path selects the default.
    fn set_search_path(&self, path: &str) -> Result<()>;

    fn options(&self) -> SymOptions;

    fn set_options(&self, options: SymOptions);

    /// On-disk image of the module loaded at `base`.
    fn module_file_path(&self, base: Address) -> Result<PathBuf>;

    /// Drop the debug data loaded for the module at `base`.
    fn unload_module(&self, base: Address) -> Result<()>;

    /// Load debug data for `image` at `base`. May be deferred until the
    /// module is queried.
    fn load_module(&self, image: &Path, base: Address) -> Result<()>;

    /// Query the module at `base`, materialising deferred loads.
    fn module_info(&self, base: Address) -> Result<BackendModuleInfo>;

    /// Absolute address of the symbol called `name`.
    fn symbol_from_name(&self, name: &str) -> Result<Address>;
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_without_clears_only_named_flags()
    {
        let options = SymOptions::UNDNAME | SymOptions::IGNORE_CVREC | SymOptions::LOAD_LINES;
        let cleared = options.without(SymOptions::IGNORE_CVREC);
        assert!(!cleared.contains(SymOptions::IGNORE_CVREC));
        assert!(cleared.contains(SymOptions::UNDNAME | SymOptions::LOAD_LINES));
        assert_eq!(options & !SymOptions::IGNORE_CVREC, cleared);
    }
}
