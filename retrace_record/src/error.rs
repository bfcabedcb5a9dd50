// Copyright 2025 the Retrace Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural errors raised by record tree mutation.

use core::fmt;

/// Why a record tree mutation was refused.
///
/// These are recoverable and surface to the immediate caller; the tree is
/// unchanged when one is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordError {
    /// The record already has a parent. Detach it from the old parent
    /// first to reparent.
    AlreadyParented,
    /// The target of an add is a leaf; leaves are sealed and hold no
    /// children.
    NotAContainer,
    /// The record being removed is not a child of the given container.
    NotAChild,
    /// Adding the record would make it its own ancestor.
    WouldCycle,
    /// The id refers to a record that has been deleted (or never existed).
    StaleId,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::AlreadyParented => "record already has a parent",
            Self::NotAContainer => "record is a leaf and cannot hold children",
            Self::NotAChild => "record is not a child of the given container",
            Self::WouldCycle => "adding the record would create a cycle",
            Self::StaleId => "record id is stale",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for RecordError {}
