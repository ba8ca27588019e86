// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::str::FromStr;

use crate::errors::{Error, ErrorKind};

mod store;

pub use store::ModeStore;

/// Electrical function selected for a pin.
///
/// `Alt0`..`Alt5` are the SoC's alternate functions (UART, SPI, PWM, ...);
/// which peripheral each one routes to is chip specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PinMode {
    Input,
    Output,
    Alt0,
    Alt1,
    Alt2,
    Alt3,
    Alt4,
    Alt5,
}

impl PinMode {
    pub const ALL: [PinMode; 8] = [
        PinMode::Input,
        PinMode::Output,
        PinMode::Alt0,
        PinMode::Alt1,
        PinMode::Alt2,
        PinMode::Alt3,
        PinMode::Alt4,
        PinMode::Alt5,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            PinMode::Input => "INPUT",
            PinMode::Output => "OUTPUT",
            PinMode::Alt0 => "ALT0",
            PinMode::Alt1 => "ALT1",
            PinMode::Alt2 => "ALT2",
            PinMode::Alt3 => "ALT3",
            PinMode::Alt4 => "ALT4",
            PinMode::Alt5 => "ALT5",
        }
    }

    /// Alternate function index, `None` for plain input/output.
    pub const fn alt(&self) -> Option<u8> {
        match self {
            PinMode::Input | PinMode::Output => None,
            PinMode::Alt0 => Some(0),
            PinMode::Alt1 => Some(1),
            PinMode::Alt2 => Some(2),
            PinMode::Alt3 => Some(3),
            PinMode::Alt4 => Some(4),
            PinMode::Alt5 => Some(5),
        }
    }
}

impl std::fmt::Display for PinMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for PinMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PinMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ErrorKind::UnknownMode(s.to_owned()).into())
    }
}

/// Pull resistor configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pull {
    #[default]
    Off,
    Down,
    Up,
}

impl std::fmt::Display for Pull {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Pull::Off => "off",
            Pull::Down => "down",
            Pull::Up => "up",
        })
    }
}
