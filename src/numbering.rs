// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::str::FromStr;

use crate::board::BoardDescriptor;
use crate::errors::{Error, ErrorKind, Result};

/// Pin numbering convention.
///
/// * `Logical` - dense software numbering of the usable GPIOs only
/// * `Physical` - position on the board header, counted from 1
/// * `SocNative` - the chip vendor's own pin index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum NumberingScheme {
    #[default]
    Logical,
    Physical,
    SocNative,
}

impl NumberingScheme {
    pub const ALL: [NumberingScheme; 3] = [
        NumberingScheme::Logical,
        NumberingScheme::Physical,
        NumberingScheme::SocNative,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            NumberingScheme::Logical => "Logical",
            NumberingScheme::Physical => "Physical",
            NumberingScheme::SocNative => "SocNative",
        }
    }
}

impl std::fmt::Display for NumberingScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for NumberingScheme {
    type Err = Error;

    /// Case-insensitive. Besides the canonical names, `board`/`header` select
    /// `Physical` and `native`/`soc`/`mcu` select `SocNative`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logical" => Ok(NumberingScheme::Logical),
            "physical" | "board" | "header" => Ok(NumberingScheme::Physical),
            "socnative" | "soc_native" | "native" | "soc" | "mcu" => {
                Ok(NumberingScheme::SocNative)
            }
            _ => Err(ErrorKind::UnknownScheme(s.to_owned()).into()),
        }
    }
}

impl TryFrom<String> for NumberingScheme {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NumberingScheme> for &'static str {
    fn from(value: NumberingScheme) -> Self {
        value.name()
    }
}

/// Convert `pin` from one numbering scheme to another.
///
/// Fails with `OutOfRange` when `pin` does not exist in `from`, or when the
/// pin it designates has no number in `to` (power, ground and not-connected
/// pins only exist natively).
pub fn translate(
    pin: u32,
    from: NumberingScheme,
    to: NumberingScheme,
    board: &BoardDescriptor,
) -> Result<u32> {
    let desc = board
        .find(pin, from)
        .ok_or_else(|| Error::out_of_range(pin, from))?;
    desc.number(to)
        .ok_or_else(|| Error::out_of_range(desc.native(), NumberingScheme::SocNative))
}
