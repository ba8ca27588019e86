// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use itertools::Itertools;

use crate::mode::PinMode;
use crate::numbering::NumberingScheme;
use crate::regs::{Fault, WindowId};

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// Error returned by every fallible operation of the crate.
///
/// Structural misuse of the API (closed context, bad pin number, cursor
/// misuse) and per-pin hardware faults share this type; use
/// [`Error::is_fault`] or match on [`Error::kind`] to tell them apart.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    #[error("GPIO context is not open")]
    NotOpen,
    #[error("Register window {0} is already bound by a live context")]
    AlreadyBound(WindowId),
    #[error("Pin {pin} is out of range in {scheme} numbering")]
    OutOfRange { pin: u32, scheme: NumberingScheme },
    #[error("No pin at row {row}, column {column} of connector {connector}")]
    NoPinAt { connector: u32, row: u32, column: u32 },
    #[error("Unknown numbering scheme: {0:?}")]
    UnknownScheme(String),
    #[error("Unknown pin mode: {0:?}")]
    UnknownMode(String),
    #[error("Cursor is not positioned on a pin")]
    NoCurrent,
    #[error("Cursor is exhausted")]
    Exhausted,
    #[error("Cursor was invalidated by a numbering change, reset it with to_front() or to_back()")]
    StaleCursor,
    #[error("Invalid board descriptor: {0}")]
    InvalidDescriptor(String),
    #[error(transparent)]
    Fault(#[from] Fault),
    #[error("Failed to restore {} pin(s): {}", .0.len(), .0.iter().join(", "))]
    Restore(Vec<RestoreFailure>),
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// True for hardware-layer faults, which are expected at runtime and
    /// recoverable per pin. Everything else is a usage error.
    pub fn is_fault(&self) -> bool {
        matches!(self.kind, ErrorKind::Fault(_))
    }

    pub(crate) fn out_of_range(pin: u32, scheme: NumberingScheme) -> Self {
        ErrorKind::OutOfRange { pin, scheme }.into()
    }

    pub(crate) fn invalid_descriptor(msg: impl Into<String>) -> Self {
        ErrorKind::InvalidDescriptor(msg.into()).into()
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        ErrorKind::Fault(fault).into()
    }
}

/// A pin that could not be put back into its original mode at close.
#[derive(Debug, thiserror::Error)]
#[error("native pin {native} -> {mode}: {fault}")]
pub struct RestoreFailure {
    pub native: u32,
    pub mode: PinMode,
    pub fault: Fault,
}
