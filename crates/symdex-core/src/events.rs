//! Symbol event types and helpers.
//!
//! Higher layers (CLI, UI, future protocol clients) consume these events to
//! refresh their module views without polling the registry. The core only
//! produces events; a [`SymbolEventSender`] can be handed to
//! [`SymbolInfo::update_module_list`](crate::SymbolInfo::update_module_list)
//! as a [`ModuleListSink`].

use std::sync::mpsc;

use crate::modules::ModuleListSink;
use crate::sync::SyncSummary;
use crate::types::SymbolModuleInfo;

/// Event emitted by the symbol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolEvent
{
    /// The set of loaded modules changed.
    ModuleListUpdated(Vec<SymbolModuleInfo>),
    /// A symbol store sync pass finished.
    SyncFinished(SyncSummary),
}

impl SymbolEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String
    {
        match self {
            Self::ModuleListUpdated(modules) => format!("{} modules loaded", modules.len()),
            Self::SyncFinished(summary) => format!(
                "Symbol sync finished: {} of {} modules with full symbols",
                summary.succeeded(),
                summary.modules.len()
            ),
        }
    }
}

/// Sender side of the symbol event channel.
pub type SymbolEventSender = mpsc::Sender<SymbolEvent>;
/// Receiver side of the symbol event channel.
pub type SymbolEventReceiver = mpsc::Receiver<SymbolEvent>;

/// Create a new symbol event channel.
#[must_use]
pub fn event_channel() -> (SymbolEventSender, SymbolEventReceiver)
{
    mpsc::channel()
}

impl ModuleListSink for SymbolEventSender
{
    fn update_module_list(&self, modules: &[SymbolModuleInfo])
    {
        // A dropped receiver just means nobody is listening
        if self.send(SymbolEvent::ModuleListUpdated(modules.to_vec())).is_err() {
            tracing::trace!("module list update dropped, no receiver");
        }
    }
}
