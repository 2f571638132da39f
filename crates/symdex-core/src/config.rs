//! # Configuration
//!
//! Symbol store settings and the fixed buffer bounds used when copying names.
//!
//! ## Environment Variables
//!
//! - `SYMDEX_SYMBOL_CACHE`: Local directory downloaded debug files are cached in
//! - `SYMDEX_SYMBOL_STORE`: Remote symbol store URL used when a sync does not name one

use std::env;
use std::path::{Path, PathBuf};

/// Symbol store used when neither the caller nor the environment names one.
pub const DEFAULT_SYMBOL_STORE: &str = "https://msdl.microsoft.com/download/symbols";

/// Upper bound on a copied symbol name, in bytes.
pub const MAX_SYM_NAME: usize = 2000;

/// Size of a module snapshot name field, terminator included.
pub const MAX_MODULE_SIZE: usize = 256;

/// Size of a source file path buffer, terminator included.
pub const MAX_STRING_SIZE: usize = 512;

const CACHE_ENV: &str = "SYMDEX_SYMBOL_CACHE";
const STORE_ENV: &str = "SYMDEX_SYMBOL_STORE";

/// Where debug information is downloaded from and cached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolConfig
{
    /// Local cache directory for downloaded debug files.
    pub cache_dir: PathBuf,
    /// Store URL used when a sync is started without one.
    pub default_store: String,
}

impl Default for SymbolConfig
{
    fn default() -> Self
    {
        Self {
            cache_dir: env::temp_dir().join("symdex").join("symbols"),
            default_store: DEFAULT_SYMBOL_STORE.to_string(),
        }
    }
}

impl SymbolConfig
{
    /// Defaults overridden by `SYMDEX_SYMBOL_CACHE` / `SYMDEX_SYMBOL_STORE`.
    ///
    /// Empty variables are ignored.
    #[must_use]
    pub fn from_env() -> Self
    {
        let mut config = Self::default();
        if let Some(cache) = env::var_os(CACHE_ENV).filter(|value| !value.is_empty()) {
            config.cache_dir = PathBuf::from(cache);
        }
        if let Some(store) = env::var(STORE_ENV).ok().filter(|value| !value.is_empty()) {
            config.default_store = store;
        }
        config
    }

    /// Explicit symbol server search path: `SRV*<cache_dir>*<store>`.
    #[must_use]
    pub fn server_search_path(&self, store: &str) -> String
    {
        format!("SRV*{}*{store}", self.cache_dir.display())
    }
}

/// Search path entry naming a symbol server with a local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPath<'a>
{
    pub cache_dir: &'a Path,
    pub store: &'a str,
}

impl<'a> ServerPath<'a>
{
    /// Parse a `SRV*cache*store` entry (prefix matched case-insensitively).
    ///
    /// Returns `None` for plain directory entries and for malformed server
    /// entries; use [`is_server_entry`] to tell the two apart.
    pub fn parse(entry: &'a str) -> Option<Self>
    {
        if !is_server_entry(entry) {
            return None;
        }
        let mut parts = entry[4..].splitn(2, '*');
        let cache = parts.next().filter(|part| !part.is_empty())?;
        let store = parts.next().filter(|part| !part.is_empty())?;
        Some(Self {
            cache_dir: Path::new(cache),
            store,
        })
    }
}

/// `true` if `entry` starts with the `SRV*` symbol server marker.
pub fn is_server_entry(entry: &str) -> bool
{
    entry.get(..4).is_some_and(|prefix| prefix.eq_ignore_ascii_case("srv*"))
}

/// Copy at most `max - 1` bytes of `text`, cutting on a char boundary.
///
/// Mirrors a bounded copy into a fixed, terminated buffer of `max` bytes.
pub fn truncate_to(text: &str, max: usize) -> String
{
    let limit = max.saturating_sub(1);
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
