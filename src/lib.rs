// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `board-gpio` crate is the board-independent half of a GPIO driver for
//! single-board computers.
//!
//! A board is described once, as a table of the SoC's native pins and their
//! positions in the *logical* (dense software numbering) and *physical*
//! (header slot) schemes. Each chip family implements [`RegisterAccess`] for
//! its memory-mapped register block. A [`GpioContext`] ties the two together:
//! it translates pin numbers between schemes, walks the usable pins with a
//! [`PinCursor`], tracks every mode change and puts the original modes back
//! when it is closed.
//!
//! # Examples
//!
//! Drive logical pin 1 high for a moment, then let the context restore its
//! mode:
//!
//! ```no_run
//! use board_gpio::{BoardDescriptor, GpioContext, PinCaps, PinMode, WindowId};
//! use board_gpio::sim::SimRegisters;
//!
//! # fn main() -> Result<(), board_gpio::Error> {
//! let board = BoardDescriptor::from_native(
//!     "tiny-4",
//!     [
//!         (0, PinCaps::GPIO),
//!         (1, PinCaps::GROUND),
//!         (2, PinCaps::GPIO),
//!         (3, PinCaps::GPIO),
//!     ],
//! )?;
//! let regs = SimRegisters::new(WindowId::from_base(0x3f20_0000), 4);
//!
//! let mut gpio = GpioContext::open(board, regs)?;
//! gpio.set_mode(1, PinMode::Output)?;
//! gpio.write(1, true)?;
//! gpio.close()?;
//! # Ok(()) }
//! ```
//!
//! Iterating over the usable pins of the active numbering scheme:
//!
//! ```no_run
//! # use board_gpio::{BoardDescriptor, GpioContext, NumberingScheme, PinCaps, WindowId};
//! # use board_gpio::sim::SimRegisters;
//! # fn main() -> Result<(), board_gpio::Error> {
//! # let board = BoardDescriptor::from_native("tiny", [(0, PinCaps::GPIO)])?;
//! # let regs = SimRegisters::new(WindowId::from_base(0), 1);
//! let mut gpio = GpioContext::open(board, regs)?;
//! gpio.set_numbering(NumberingScheme::Physical)?;
//!
//! let mut cursor = gpio.cursor()?;
//! while cursor.has_next() {
//!     let pin = cursor.next_pin()?;
//!     println!("{:>3}: {}", pin, gpio.mode(pin)?);
//! }
//! # Ok(()) }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod errors;

pub mod board;
pub mod config;
pub mod context;
pub mod cursor;
pub mod mode;
pub mod numbering;
pub mod registry;
pub mod regs;
pub mod sim;

pub use board::{BoardDescriptor, Connector, PinCaps, PinDescriptor, Position};
pub use context::GpioContext;
pub use cursor::{CursorState, PinCursor};
pub use errors::{Error, ErrorKind, RestoreFailure};
pub use mode::{ModeStore, PinMode, Pull};
pub use numbering::{translate, NumberingScheme};
pub use registry::{PinEntry, PinRegistry};
pub use regs::{Fault, FaultResult, RegisterAccess, WindowId};
