//! User-assigned labels.
//!
//! Labels are names a user gave to an address. They take priority over
//! anything discovered from debug information when an address is resolved.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::types::{Address, Segment};

/// Lookup of user labels by exact address.
pub trait LabelStore: Send + Sync
{
    fn label_at(&self, address: Address, segment: Segment) -> Option<String>;
}

/// In-memory label store.
#[derive(Debug, Default)]
pub struct LabelMap
{
    labels: RwLock<HashMap<(Address, Segment), String>>,
}

impl LabelMap
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Label `address` in the default segment, replacing any previous label.
    pub fn set_label(&self, address: Address, label: impl Into<String>)
    {
        self.labels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((address, Segment::Default), label.into());
    }

    /// Remove the default-segment label at `address`.
    pub fn remove_label(&self, address: Address) -> Option<String>
    {
        self.labels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(address, Segment::Default))
    }
}

impl LabelStore for LabelMap
{
    fn label_at(&self, address: Address, segment: Segment) -> Option<String>
    {
        self.labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(address, segment))
            .cloned()
    }
}
