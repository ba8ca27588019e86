// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The seam between this crate and the per-SoC register layer.
//!
//! Each chip family implements [`RegisterAccess`] once; everything above it
//! (numbering, registry, mode tracking) only ever talks to the trait. All pin
//! numbers crossing this seam are native (SoC) identifiers.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use crate::errors::{ErrorKind, Result};
use crate::mode::{PinMode, Pull};

/// Result of a single register operation.
pub type FaultResult<T> = std::result::Result<T, Fault>;

/// A per-pin condition reported by the register layer.
///
/// Faults are expected at runtime (a pin may be claimed by a kernel driver,
/// or a function may not exist on that pin) and are always surfaced to the
/// caller as values.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Fault {
    #[error("native pin {pin} does not support this operation")]
    Unsupported { pin: u32 },
    #[error("native pin {pin} is busy")]
    Busy { pin: u32 },
    #[error("register access failed on native pin {pin}: {source}")]
    Io {
        pin: u32,
        #[source]
        source: std::io::Error,
    },
}

impl Fault {
    /// The native pin the fault was reported for.
    pub fn pin(&self) -> u32 {
        match self {
            Fault::Unsupported { pin } | Fault::Busy { pin } | Fault::Io { pin, .. } => *pin,
        }
    }
}

/// Identity of a memory-mapped register window, usually its physical base
/// address.
///
/// Two handles reporting the same `WindowId` drive the same hardware and can
/// never be bound by two contexts at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn from_base(base: u64) -> Self {
        Self(base)
    }

    pub const fn base(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Primitive register operations for one chip family.
pub trait RegisterAccess {
    /// The register window this handle drives.
    fn window(&self) -> WindowId;

    /// Read the function-select (mode) of a native pin.
    fn read_mode(&mut self, pin: u32) -> FaultResult<PinMode>;

    /// Program the function-select (mode) of a native pin.
    fn write_mode(&mut self, pin: u32, mode: PinMode) -> FaultResult<()>;

    /// Read the input level of a native pin.
    fn read_level(&mut self, pin: u32) -> FaultResult<bool>;

    /// Drive the output level of a native pin.
    fn write_level(&mut self, pin: u32, high: bool) -> FaultResult<()>;

    /// Read back the pull resistor configuration.
    ///
    /// Many controllers (the BCM283x among them) cannot report this.
    fn read_pull(&mut self, pin: u32) -> FaultResult<Pull> {
        Err(Fault::Unsupported { pin })
    }

    /// Configure the pull resistor of a native pin.
    fn write_pull(&mut self, pin: u32, pull: Pull) -> FaultResult<()> {
        let _ = pull;
        Err(Fault::Unsupported { pin })
    }
}

// Windows currently held by a live context in this process.
static BOUND_WINDOWS: Mutex<BTreeSet<WindowId>> = Mutex::new(BTreeSet::new());

/// Exclusive claim on a register window, released on drop.
#[derive(Debug)]
pub(crate) struct WindowLease {
    window: WindowId,
}

impl WindowLease {
    pub(crate) fn acquire(window: WindowId) -> Result<Self> {
        let mut bound = BOUND_WINDOWS.lock().unwrap_or_else(PoisonError::into_inner);
        if !bound.insert(window) {
            return Err(ErrorKind::AlreadyBound(window).into());
        }
        Ok(Self { window })
    }

    pub(crate) fn window(&self) -> WindowId {
        self.window
    }
}

impl Drop for WindowLease {
    fn drop(&mut self) {
        BOUND_WINDOWS
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.window);
    }
}
