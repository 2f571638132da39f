//! # Backend State Guard
//!
//! RAII guard that borrows the backend's global search path and options for
//! the duration of a sync pass and puts them back when dropped.
//!
//! The guard is restored on every exit path: the normal end of a pass calls
//! [`BackendStateGuard::restore`] to learn whether the search path came back,
//! and an early return or panic restores through `Drop`.

use crate::backend::{SymOptions, SymbolBackend};
use crate::error::Result;

/// Saves the backend's search path and options, restores them on drop.
pub struct BackendStateGuard<'a, B>
where
    B: SymbolBackend + ?Sized,
{
    backend: &'a B,
    search_path: String,
    options: SymOptions,
    active: bool,
}

impl<'a, B> BackendStateGuard<'a, B>
where
    B: SymbolBackend + ?Sized,
{
    /// Save the current state and clear `cleared` from the active options.
    ///
    /// ## Errors
    ///
    /// Fails if the current search path cannot be read. Nothing has been
    /// changed at that point.
    pub fn acquire(backend: &'a B, cleared: SymOptions) -> Result<Self>
    {
        let search_path = backend.search_path()?;
        let options = backend.options();
        backend.set_options(options.without(cleared));

        Ok(Self {
            backend,
            search_path,
            options,
            active: true,
        })
    }

    /// Search path that will be restored.
    pub fn saved_search_path(&self) -> &str
    {
        &self.search_path
    }

    /// Restore options, then the search path.
    ///
    /// Options are always restored. A failure to restore the search path is
    /// returned; after this call dropping the guard is a no-op.
    pub fn restore(mut self) -> Result<()>
    {
        self.restore_state()
    }

    fn restore_state(&mut self) -> Result<()>
    {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.backend.set_options(self.options);
        self.backend.set_search_path(&self.search_path)
    }
}

impl<B> Drop for BackendStateGuard<'_, B>
where
    B: SymbolBackend + ?Sized,
{
    fn drop(&mut self)
    {
        if let Err(err) = self.restore_state() {
            tracing::error!(%err, "failed to restore symbol search path");
        }
    }
}
