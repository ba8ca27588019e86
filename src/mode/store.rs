// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use tracing::{debug, warn};

use super::PinMode;
use crate::board::{BoardDescriptor, PINS_MAX};
use crate::errors::RestoreFailure;
use crate::regs::{Fault, FaultResult, RegisterAccess};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ModeEntry {
    current: Option<PinMode>,
    original: Option<PinMode>,
    dirty: bool,
}

/// Per-pin cache of the current and original mode of every native pin.
///
/// Nothing is read from the hardware when the store is opened. The first
/// [`get`](Self::get) or [`set`](Self::set) of a pin reads its mode once and
/// keeps it as the pin's original mode for the rest of the session, so
/// [`close`](Self::close) can put back exactly what was there before.
#[derive(Debug)]
pub struct ModeStore {
    natives: heapless::Vec<u32, PINS_MAX>,
    entries: heapless::Vec<ModeEntry, PINS_MAX>,
    release_on_close: bool,
}

impl ModeStore {
    pub fn open(board: &BoardDescriptor, release_on_close: bool) -> Self {
        let natives = board.pins().iter().map(|p| p.native()).collect();
        let entries = board.pins().iter().map(|_| ModeEntry::default()).collect();
        Self {
            natives,
            entries,
            release_on_close,
        }
    }

    pub fn release_on_close(&self) -> bool {
        self.release_on_close
    }

    pub fn set_release_on_close(&mut self, enable: bool) {
        self.release_on_close = enable;
    }

    /// Mode of a native pin.
    ///
    /// Only the first call per session reaches the hardware; a fault is
    /// returned as is and not cached, so a later call retries the read.
    pub fn get<R>(&mut self, regs: &mut R, native: u32) -> FaultResult<PinMode>
    where
        R: RegisterAccess + ?Sized,
    {
        let idx = self.slot(native)?;
        if let Some(mode) = self.entries[idx].current {
            return Ok(mode);
        }

        let mode = regs.read_mode(native).map_err(|fault| {
            warn!(native, %fault, "Failed to read pin mode");
            fault
        })?;
        debug!(native, %mode, "Captured original pin mode");

        let entry = &mut self.entries[idx];
        entry.current = Some(mode);
        entry.original = Some(mode);
        Ok(mode)
    }

    /// Program the mode of a native pin.
    ///
    /// If the pin was never read this session, its original mode is captured
    /// first; when that read fails nothing is written. A failed write leaves
    /// the cached state untouched.
    pub fn set<R>(&mut self, regs: &mut R, native: u32, mode: PinMode) -> FaultResult<()>
    where
        R: RegisterAccess + ?Sized,
    {
        let idx = self.slot(native)?;
        if self.entries[idx].original.is_none() {
            self.get(regs, native)?;
        }

        regs.write_mode(native, mode).map_err(|fault| {
            warn!(native, %mode, %fault, "Failed to set pin mode");
            fault
        })?;
        debug!(native, %mode, "Pin mode set");

        let entry = &mut self.entries[idx];
        entry.current = Some(mode);
        entry.dirty = true;
        Ok(())
    }

    /// Put one pin back into its original mode now.
    ///
    /// A pin that was never changed is left alone.
    pub fn release<R>(&mut self, regs: &mut R, native: u32) -> FaultResult<()>
    where
        R: RegisterAccess + ?Sized,
    {
        let idx = self.slot(native)?;
        let entry = self.entries[idx];
        if !entry.dirty {
            return Ok(());
        }

        if let Some(original) = entry.original.filter(|m| Some(*m) != entry.current) {
            regs.write_mode(native, original)?;
            debug!(native, mode = %original, "Pin mode restored");
        }

        let entry = &mut self.entries[idx];
        entry.current = entry.original;
        entry.dirty = false;
        Ok(())
    }

    /// Cached mode, without touching the hardware.
    pub fn cached(&self, native: u32) -> Option<PinMode> {
        self.slot(native).ok().and_then(|i| self.entries[i].current)
    }

    /// Mode captured on first access this session.
    pub fn original(&self, native: u32) -> Option<PinMode> {
        self.slot(native).ok().and_then(|i| self.entries[i].original)
    }

    /// True if the pin's mode was changed since the session began.
    pub fn is_dirty(&self, native: u32) -> bool {
        self.slot(native).map_or(false, |i| self.entries[i].dirty)
    }

    /// Native pins whose mode was changed this session.
    pub fn dirty_pins(&self) -> impl Iterator<Item = u32> + '_ {
        self.natives
            .iter()
            .zip(self.entries.iter())
            .filter(|(_, e)| e.dirty)
            .map(|(native, _)| *native)
    }

    /// End the session.
    ///
    /// With release-on-close enabled, every changed pin whose mode differs
    /// from its original is written back. A failing pin does not stop the
    /// others; all failures are returned together.
    pub fn close<R>(self, regs: &mut R) -> Result<(), Vec<RestoreFailure>>
    where
        R: RegisterAccess + ?Sized,
    {
        if !self.release_on_close {
            return Ok(());
        }

        let mut failures = Vec::new();
        for (native, entry) in self.natives.iter().copied().zip(self.entries) {
            let (Some(original), Some(current)) = (entry.original, entry.current) else {
                continue;
            };
            if !entry.dirty || original == current {
                continue;
            }

            match regs.write_mode(native, original) {
                Ok(()) => debug!(native, mode = %original, "Pin mode restored"),
                Err(fault) => {
                    warn!(native, mode = %original, %fault, "Failed to restore pin mode");
                    failures.push(RestoreFailure {
                        native,
                        mode: original,
                        fault,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }

    fn slot(&self, native: u32) -> FaultResult<usize> {
        self.natives
            .binary_search(&native)
            .map_err(|_| Fault::Unsupported { pin: native })
    }
}
