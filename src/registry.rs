// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::{Arc, PoisonError, RwLock};

use crate::board::{BoardDescriptor, PINS_MAX};
use crate::numbering::NumberingScheme;

/// A valid pin in the registry's scheme together with its native number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PinEntry {
    pub pin: u32,
    pub native: u32,
}

/// Ordered view of the usable pins of a board in one numbering scheme.
///
/// Entries are sorted by pin number and deduplicated; in the logical and
/// physical schemes, reserved pins (power, ground, not connected) are left
/// out even though they still take up a slot of the raw table, so
/// [`count`](Self::count) can be smaller than [`capacity`](Self::capacity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRegistry {
    scheme: NumberingScheme,
    entries: heapless::Vec<PinEntry, PINS_MAX>,
    capacity: usize,
    generation: u64,
}

impl PinRegistry {
    /// Build the registry of `board` in `scheme`.
    ///
    /// Deterministic: the same inputs always produce an equal registry.
    pub fn build(board: &BoardDescriptor, scheme: NumberingScheme) -> Self {
        Self::build_generation(board, scheme, 0)
    }

    pub(crate) fn build_generation(
        board: &BoardDescriptor,
        scheme: NumberingScheme,
        generation: u64,
    ) -> Self {
        // A descriptor never holds more than PINS_MAX pins, so every push fits.
        let mut entries: heapless::Vec<PinEntry, PINS_MAX> = board
            .pins()
            .iter()
            .filter_map(|p| {
                p.number(scheme).map(|pin| PinEntry {
                    pin,
                    native: p.native(),
                })
            })
            .collect();
        entries.sort_unstable();

        Self {
            scheme,
            entries,
            capacity: board.raw_capacity(scheme),
            generation,
        }
    }

    pub const fn scheme(&self) -> NumberingScheme {
        self.scheme
    }

    /// Number of valid pins.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the raw pin table, reserved slots included.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// First and last valid pin numbers, `None` on a board without usable
    /// pins in this scheme.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        Some((self.entries.first()?.pin, self.entries.last()?.pin))
    }

    pub fn contains(&self, pin: u32) -> bool {
        self.index_of(pin).is_some()
    }

    /// Position of `pin` in iteration order.
    pub fn index_of(&self, pin: u32) -> Option<usize> {
        self.entries.binary_search_by_key(&pin, |e| e.pin).ok()
    }

    pub fn get(&self, index: usize) -> Option<PinEntry> {
        self.entries.get(index).copied()
    }

    /// Native number of `pin`.
    pub fn native_of(&self, pin: u32) -> Option<u32> {
        self.index_of(pin).map(|i| self.entries[i].native)
    }

    pub fn entries(&self) -> &[PinEntry] {
        &self.entries
    }

    /// Valid pin numbers in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = u32> + ExactSizeIterator + '_ {
        self.entries.iter().map(|e| e.pin)
    }

    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }
}

/// The registry currently published by a context, shared with its cursors.
///
/// Holds `None` once the context is closed.
#[derive(Debug, Default)]
pub(crate) struct RegistrySlot(RwLock<Option<Arc<PinRegistry>>>);

impl RegistrySlot {
    pub(crate) fn new(registry: Arc<PinRegistry>) -> Self {
        Self(RwLock::new(Some(registry)))
    }

    pub(crate) fn load(&self) -> Option<Arc<PinRegistry>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn generation(&self) -> Option<u64> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.generation())
    }

    pub(crate) fn store(&self, registry: Option<Arc<PinRegistry>>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = registry;
    }
}
