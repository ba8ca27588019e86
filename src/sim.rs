// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! In-memory register bank.
//!
//! [`SimRegisters`] stands in for a chip family's register layer when no
//! hardware is present: it keeps a mode, level and pull per native pin,
//! counts every access and can be told to fail on chosen pins. Clones share
//! the same bank, so a test can keep one clone to observe the pins while a
//! context owns another.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::mode::{PinMode, Pull};
use crate::regs::{Fault, FaultResult, RegisterAccess, WindowId};

#[derive(Debug, Clone, Copy, Default)]
struct SimPin {
    mode: Option<PinMode>,
    level: bool,
    pull: Pull,
    mode_reads: usize,
}

#[derive(Debug, Default)]
struct SimBank {
    pins: BTreeMap<u32, SimPin>,
    failing_reads: BTreeSet<u32>,
    failing_writes: BTreeSet<u32>,
    mode_reads: usize,
    mode_writes: usize,
    level_writes: usize,
}

/// Simulated register window.
#[derive(Debug, Clone)]
pub struct SimRegisters {
    window: WindowId,
    bank: Arc<Mutex<SimBank>>,
}

impl SimRegisters {
    /// A bank with native pins `0..pins`, all inputs driven low.
    pub fn new(window: WindowId, pins: u32) -> Self {
        Self::with_pins(window, 0..pins)
    }

    /// A bank holding exactly the given native pins.
    pub fn with_pins(window: WindowId, natives: impl IntoIterator<Item = u32>) -> Self {
        let pins = natives
            .into_iter()
            .map(|n| {
                let pin = SimPin {
                    mode: Some(PinMode::Input),
                    ..SimPin::default()
                };
                (n, pin)
            })
            .collect();
        Self {
            window,
            bank: Arc::new(Mutex::new(SimBank {
                pins,
                ..SimBank::default()
            })),
        }
    }

    /// Preset the mode of a pin, as firmware or a previous program left it.
    pub fn with_mode(self, native: u32, mode: PinMode) -> Self {
        self.bank().pins.entry(native).or_default().mode = Some(mode);
        self
    }

    /// Make mode and level reads of `native` fail with `Fault::Busy`.
    pub fn fail_reads(&self, native: u32) {
        self.bank().failing_reads.insert(native);
    }

    /// Make mode, level and pull writes of `native` fail with `Fault::Busy`.
    pub fn fail_writes(&self, native: u32) {
        self.bank().failing_writes.insert(native);
    }

    pub fn clear_faults(&self) {
        let mut bank = self.bank();
        bank.failing_reads.clear();
        bank.failing_writes.clear();
    }

    /// Current mode of a pin, bypassing the access counters.
    ///
    /// # Panics
    ///
    /// Panics if the bank has no such pin.
    pub fn mode(&self, native: u32) -> PinMode {
        self.bank()
            .pins
            .get(&native)
            .and_then(|p| p.mode)
            .unwrap_or_else(|| panic!("native pin {native} is not simulated"))
    }

    pub fn level(&self, native: u32) -> bool {
        self.bank().pins.get(&native).map_or(false, |p| p.level)
    }

    /// Drive the level seen on an input pin.
    pub fn set_input_level(&self, native: u32, high: bool) {
        self.bank().pins.entry(native).or_default().level = high;
    }

    pub fn pull(&self, native: u32) -> Pull {
        self.bank().pins.get(&native).map_or(Pull::Off, |p| p.pull)
    }

    /// Total number of mode reads.
    pub fn mode_reads(&self) -> usize {
        self.bank().mode_reads
    }

    pub fn mode_reads_of(&self, native: u32) -> usize {
        self.bank().pins.get(&native).map_or(0, |p| p.mode_reads)
    }

    /// Total number of successful mode writes.
    pub fn mode_writes(&self) -> usize {
        self.bank().mode_writes
    }

    pub fn level_writes(&self) -> usize {
        self.bank().level_writes
    }

    fn bank(&self) -> MutexGuard<'_, SimBank> {
        self.bank.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SimBank {
    fn readable(&mut self, pin: u32) -> FaultResult<&mut SimPin> {
        if self.failing_reads.contains(&pin) {
            return Err(Fault::Busy { pin });
        }
        self.pins.get_mut(&pin).ok_or(Fault::Unsupported { pin })
    }

    fn writable(&mut self, pin: u32) -> FaultResult<&mut SimPin> {
        if self.failing_writes.contains(&pin) {
            return Err(Fault::Busy { pin });
        }
        self.pins.get_mut(&pin).ok_or(Fault::Unsupported { pin })
    }
}

impl RegisterAccess for SimRegisters {
    fn window(&self) -> WindowId {
        self.window
    }

    fn read_mode(&mut self, pin: u32) -> FaultResult<PinMode> {
        let mut bank = self.bank();
        bank.mode_reads += 1;
        let sim = bank.readable(pin)?;
        sim.mode_reads += 1;
        let mode = sim.mode.ok_or(Fault::Unsupported { pin })?;
        trace!(pin, %mode, "sim: read mode");
        Ok(mode)
    }

    fn write_mode(&mut self, pin: u32, mode: PinMode) -> FaultResult<()> {
        let mut bank = self.bank();
        bank.writable(pin)?.mode = Some(mode);
        bank.mode_writes += 1;
        trace!(pin, %mode, "sim: write mode");
        Ok(())
    }

    fn read_level(&mut self, pin: u32) -> FaultResult<bool> {
        Ok(self.bank().readable(pin)?.level)
    }

    fn write_level(&mut self, pin: u32, high: bool) -> FaultResult<()> {
        let mut bank = self.bank();
        bank.writable(pin)?.level = high;
        bank.level_writes += 1;
        trace!(pin, high, "sim: write level");
        Ok(())
    }

    fn read_pull(&mut self, pin: u32) -> FaultResult<Pull> {
        Ok(self.bank().readable(pin)?.pull)
    }

    fn write_pull(&mut self, pin: u32, pull: Pull) -> FaultResult<()> {
        self.bank().writable(pin)?.pull = pull;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_bank() {
        let bank = SimRegisters::new(WindowId::from_base(0x2000), 2);
        let mut regs = bank.clone();

        regs.write_mode(1, PinMode::Alt2).unwrap();
        assert_eq!(bank.mode(1), PinMode::Alt2);
        assert_eq!(bank.mode_writes(), 1);
    }

    #[test]
    fn unknown_pins_are_unsupported() {
        let mut regs = SimRegisters::with_pins(WindowId::from_base(0x2000), [4, 17]);
        assert!(matches!(regs.read_mode(5), Err(Fault::Unsupported { pin: 5 })));
        assert!(regs.read_mode(17).is_ok());
    }

    #[test]
    fn injected_faults() {
        let mut regs = SimRegisters::new(WindowId::from_base(0x2000), 2);
        regs.fail_reads(0);
        regs.fail_writes(1);

        assert!(matches!(regs.read_mode(0), Err(Fault::Busy { pin: 0 })));
        assert!(matches!(regs.write_level(1, true), Err(Fault::Busy { pin: 1 })));
        assert!(regs.write_level(0, true).is_ok());

        regs.clear_faults();
        assert!(regs.read_mode(0).is_ok());
    }
}
