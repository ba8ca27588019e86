// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::board::{BoardDescriptor, PinDescriptor};
use crate::config::GpioConfig;
use crate::cursor::PinCursor;
use crate::errors::{Error, ErrorKind, Result};
use crate::mode::{ModeStore, PinMode, Pull};
use crate::numbering::{self, NumberingScheme};
use crate::registry::{PinRegistry, RegistrySlot};
use crate::regs::{RegisterAccess, WindowId, WindowLease};

/// Everything that only exists while the context is open.
#[derive(Debug)]
struct Session<R> {
    regs: R,
    modes: ModeStore,
    lease: WindowLease,
}

/// An open session on one board's GPIO block.
///
/// The context holds an exclusive lease on the register window of `regs`:
/// a second context on the same window fails with `AlreadyBound` until this
/// one is closed or dropped. Pin numbers passed to and returned by the
/// context are in the active [`numbering`](Self::numbering) scheme.
///
/// On [`close`](Self::close), or drop, every pin whose mode was changed is put
/// back into the mode it had when first touched, unless release-on-close was
/// disabled.
#[derive(Debug)]
pub struct GpioContext<R: RegisterAccess> {
    board: Arc<BoardDescriptor>,
    session: Option<Session<R>>,
    registry: Arc<PinRegistry>,
    slot: Arc<RegistrySlot>,
    generation: u64,
}

impl<R: RegisterAccess> GpioContext<R> {
    /// Open with logical numbering and release-on-close enabled.
    pub fn open(board: impl Into<Arc<BoardDescriptor>>, regs: R) -> Result<Self> {
        Self::open_with(board, regs, &GpioConfig::default())
    }

    pub fn open_with(
        board: impl Into<Arc<BoardDescriptor>>,
        regs: R,
        config: &GpioConfig,
    ) -> Result<Self> {
        let board = board.into();
        let lease = WindowLease::acquire(regs.window())?;
        let modes = ModeStore::open(&board, config.release_on_close);
        let registry = Arc::new(PinRegistry::build(&board, config.numbering));

        info!(
            board = board.name(),
            window = %lease.window(),
            numbering = %config.numbering,
            pins = registry.count(),
            "GPIO context opened"
        );

        Ok(Self {
            slot: Arc::new(RegistrySlot::new(registry.clone())),
            registry,
            board,
            session: Some(Session {
                regs,
                modes,
                lease,
            }),
            generation: 0,
        })
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn board(&self) -> &BoardDescriptor {
        &self.board
    }

    /// Register window held by this context.
    pub fn window(&self) -> Result<WindowId> {
        Ok(self.session()?.lease.window())
    }

    pub fn numbering(&self) -> Result<NumberingScheme> {
        Ok(self.registry()?.scheme())
    }

    /// Switch the numbering scheme.
    ///
    /// Switching to the active scheme does nothing. Otherwise the registry is
    /// rebuilt and every outstanding cursor fails with `StaleCursor` until it
    /// is reset.
    pub fn set_numbering(&mut self, scheme: NumberingScheme) -> Result<()> {
        let current = self.numbering()?;
        if current == scheme {
            return Ok(());
        }

        self.generation += 1;
        self.registry = Arc::new(PinRegistry::build_generation(
            &self.board,
            scheme,
            self.generation,
        ));
        self.slot.store(Some(self.registry.clone()));
        debug!(from = %current, to = %scheme, pins = self.registry.count(), "Numbering changed");
        Ok(())
    }

    /// Switch the numbering scheme by name, as parsed by [`NumberingScheme`].
    pub fn set_numbering_name(&mut self, name: &str) -> Result<()> {
        self.set_numbering(name.parse()?)
    }

    pub fn release_on_close(&self) -> Result<bool> {
        Ok(self.session()?.modes.release_on_close())
    }

    pub fn set_release_on_close(&mut self, enable: bool) -> Result<()> {
        self.session_mut()?.modes.set_release_on_close(enable);
        Ok(())
    }

    /// Usable pins in the active scheme.
    pub fn registry(&self) -> Result<&PinRegistry> {
        self.session()?;
        Ok(&*self.registry)
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.registry()?.count())
    }

    /// First and last usable pin, `None` if the board has none in the active
    /// scheme.
    pub fn bounds(&self) -> Result<Option<(u32, u32)>> {
        Ok(self.registry()?.bounds())
    }

    pub fn contains(&self, pin: u32) -> Result<bool> {
        Ok(self.registry()?.contains(pin))
    }

    /// A new cursor, positioned before the first pin.
    pub fn cursor(&self) -> Result<PinCursor> {
        self.session()?;
        Ok(PinCursor::new(self.slot.clone()))
    }

    /// Number of `pin` in another scheme.
    pub fn translate(&self, pin: u32, to: NumberingScheme) -> Result<u32> {
        let from = self.numbering()?;
        numbering::translate(pin, from, to, &self.board)
    }

    /// Native number of `pin`.
    pub fn native(&self, pin: u32) -> Result<u32> {
        let registry = self.registry()?;
        registry
            .native_of(pin)
            .ok_or_else(|| Error::out_of_range(pin, registry.scheme()))
    }

    pub fn pin_info(&self, pin: u32) -> Result<&PinDescriptor> {
        let native = self.native(pin)?;
        self.board
            .find(native, NumberingScheme::SocNative)
            .ok_or_else(|| Error::out_of_range(native, NumberingScheme::SocNative))
    }

    pub fn pin_name(&self, pin: u32) -> Result<&str> {
        Ok(self.pin_info(pin)?.name())
    }

    /// Number, in the active scheme, of the pin at `row`, `column` of
    /// `connector`.
    ///
    /// Fails `NoPinAt` for an empty or unknown slot, and `OutOfRange` for a
    /// slot the active scheme does not number (reserved pins, or pins off the
    /// main header in physical numbering).
    pub fn pin_at(&self, connector: u32, row: u32, column: u32) -> Result<u32> {
        let scheme = self.numbering()?;
        let pin = self
            .board
            .find_at(connector, row, column)
            .ok_or(ErrorKind::NoPinAt {
                connector,
                row,
                column,
            })?;
        pin.number(scheme)
            .ok_or_else(|| Error::out_of_range(pin.native(), NumberingScheme::SocNative))
    }

    pub fn mode(&mut self, pin: u32) -> Result<PinMode> {
        let native = self.native(pin)?;
        let Session { regs, modes, .. } = self.session_mut()?;
        Ok(modes.get(regs, native)?)
    }

    pub fn set_mode(&mut self, pin: u32, mode: PinMode) -> Result<()> {
        let native = self.native(pin)?;
        let Session { regs, modes, .. } = self.session_mut()?;
        Ok(modes.set(regs, native, mode)?)
    }

    /// Put `pin` back into its original mode now.
    pub fn release(&mut self, pin: u32) -> Result<()> {
        let native = self.native(pin)?;
        let Session { regs, modes, .. } = self.session_mut()?;
        Ok(modes.release(regs, native)?)
    }

    pub fn pull(&mut self, pin: u32) -> Result<Pull> {
        let native = self.native(pin)?;
        Ok(self.session_mut()?.regs.read_pull(native)?)
    }

    pub fn set_pull(&mut self, pin: u32, pull: Pull) -> Result<()> {
        let native = self.native(pin)?;
        self.session_mut()?.regs.write_pull(native, pull)?;
        debug!(native, %pull, "Pull set");
        Ok(())
    }

    pub fn read(&mut self, pin: u32) -> Result<bool> {
        let native = self.native(pin)?;
        Ok(self.session_mut()?.regs.read_level(native)?)
    }

    pub fn write(&mut self, pin: u32, high: bool) -> Result<()> {
        let native = self.native(pin)?;
        Ok(self.session_mut()?.regs.write_level(native, high)?)
    }

    /// Invert the level of `pin` and return the new level.
    pub fn toggle(&mut self, pin: u32) -> Result<bool> {
        let native = self.native(pin)?;
        let regs = &mut self.session_mut()?.regs;
        let high = !regs.read_level(native)?;
        regs.write_level(native, high)?;
        Ok(high)
    }

    /// Read several pins at once.
    ///
    /// Bit `n` of `mask` selects pin `n`; a zero mask selects every pin. Bit
    /// `n` of the result is the level of pin `n`. Selected pins that are not
    /// usable in the active scheme read as low.
    pub fn read_all(&mut self, mask: u64) -> Result<u64> {
        let mask = if mask == 0 { u64::MAX } else { mask };
        let mut levels = 0;
        for (bit, native) in self.masked(mask)? {
            if self.session_mut()?.regs.read_level(native)? {
                levels |= bit;
            }
        }
        Ok(levels)
    }

    /// Drive every selected pin that is in output mode to `high`.
    ///
    /// Pins in any other mode are skipped.
    pub fn write_all(&mut self, mask: u64, high: bool) -> Result<()> {
        for (_, native) in self.masked(mask)? {
            let Session { regs, modes, .. } = self.session_mut()?;
            if modes.get(regs, native)? == PinMode::Output {
                regs.write_level(native, high)?;
            }
        }
        Ok(())
    }

    /// Invert every selected pin that is in output mode.
    pub fn toggle_all(&mut self, mask: u64) -> Result<()> {
        for (_, native) in self.masked(mask)? {
            let Session { regs, modes, .. } = self.session_mut()?;
            if modes.get(regs, native)? == PinMode::Output {
                let high = !regs.read_level(native)?;
                regs.write_level(native, high)?;
            }
        }
        Ok(())
    }

    /// End the session.
    ///
    /// Restores changed pins (when release-on-close is enabled), releases
    /// the register window and invalidates every cursor. The context is closed
    /// even when some pins could not be restored; those are reported together
    /// as `ErrorKind::Restore`.
    pub fn close(&mut self) -> Result<()> {
        let Session {
            mut regs,
            modes,
            lease,
        } = self.session.take().ok_or(ErrorKind::NotOpen)?;

        let restored = modes.close(&mut regs);
        self.slot.store(None);
        info!(board = self.board.name(), window = %lease.window(), "GPIO context closed");
        drop(lease);

        restored.map_err(|failures| ErrorKind::Restore(failures).into())
    }

    // (mask bit, native) of the selected usable pins.
    fn masked(&self, mask: u64) -> Result<Vec<(u64, u32)>> {
        let registry = self.registry()?;
        Ok(registry
            .entries()
            .iter()
            .filter_map(|e| {
                let bit = 1u64.checked_shl(e.pin)?;
                (mask & bit != 0).then_some((bit, e.native))
            })
            .collect())
    }

    fn session(&self) -> Result<&Session<R>> {
        self.session.as_ref().ok_or_else(|| ErrorKind::NotOpen.into())
    }

    fn session_mut(&mut self) -> Result<&mut Session<R>> {
        self.session.as_mut().ok_or_else(|| ErrorKind::NotOpen.into())
    }
}

impl<R: RegisterAccess> Drop for GpioContext<R> {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                warn!(board = self.board.name(), error = %e, "Error closing GPIO context");
            }
        }
    }
}
