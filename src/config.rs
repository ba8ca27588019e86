// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! TOML board descriptions and context settings.
//!
//! ```toml
//! # board.toml
//! name = "tiny-4"
//!
//! [[pin]]
//! native = 0
//! name = "GPIO0"
//!
//! [[pin]]
//! native = 1
//! caps = "GROUND"
//!
//! # Optional: where the pins sit on the board.
//! [[connector]]
//! number = 1
//! name = "con1"
//! rows = 2
//! columns = 2
//! ```
//!
//! ```rust,no_run
//! use std::path::Path;
//! use board_gpio::config::{BoardConfig, ConfigLoader, GpioConfig};
//!
//! # fn main() -> Result<(), board_gpio::config::ConfigError> {
//! let board = BoardConfig::load(Path::new("board.toml"))?.build()?;
//! let settings = GpioConfig::load(Path::new("gpio.toml"))?;
//! # Ok(()) }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{self, BoardDescriptor, Connector, PinCaps, PinDescriptor};
use crate::numbering::NumberingScheme;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found")]
    FileNotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Load a configuration value from a TOML file.
///
/// Blanket-implemented for every deserializable type.
///
/// # Errors
///
/// - `ConfigError::FileNotFound` if the file does not exist
/// - `ConfigError::ParseError` if it cannot be read or is not valid TOML
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Settings applied when a context is opened.
///
/// ```toml
/// numbering = "physical"
/// release_on_close = false
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub numbering: NumberingScheme,
    /// Put every changed pin back into its original mode on close.
    pub release_on_close: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingScheme::Logical,
            release_on_close: true,
        }
    }
}

fn gpio_caps() -> PinCaps {
    PinCaps::GPIO
}

fn one() -> u32 {
    1
}

/// One `[[connector]]` table. `columns` defaults to 1, a single-row strip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub number: u32,
    pub name: String,
    pub rows: u32,
    #[serde(default = "one")]
    pub columns: u32,
}

impl ConnectorConfig {
    fn connector(&self) -> Result<Connector, ConfigError> {
        Connector::new(self.number, &self.name, self.rows, self.columns)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// One `[[pin]]` table of a board description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig {
    pub native: u32,
    #[serde(default)]
    pub logical: Option<u32>,
    #[serde(default)]
    pub physical: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "gpio_caps")]
    pub caps: PinCaps,
    /// Connector number; defaults to 1 when `row` is given.
    #[serde(default)]
    pub connector: Option<u32>,
    #[serde(default)]
    pub row: Option<u32>,
    /// Defaults to 1 when `row` is given.
    #[serde(default)]
    pub column: Option<u32>,
}

impl PinConfig {
    fn descriptor(&self) -> Result<PinDescriptor, ConfigError> {
        let mut pin = PinDescriptor::new(self.native, self.caps);
        if let Some(logical) = self.logical {
            pin = pin.with_logical(logical);
        }
        if let Some(physical) = self.physical {
            pin = pin.with_physical(physical);
        }
        if let Some(name) = &self.name {
            pin = pin
                .with_name(name)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }
        match self.row {
            Some(row) => {
                pin = pin.with_position(
                    self.connector.unwrap_or(1),
                    row,
                    self.column.unwrap_or(1),
                );
            }
            None if self.connector.is_some() || self.column.is_some() => {
                return Err(ConfigError::ValidationError(format!(
                    "native pin {} has a connector or column but no row",
                    self.native
                )));
            }
            None => {}
        }
        Ok(pin)
    }
}

/// A board description as written in TOML.
///
/// With `derive_numbering` set, the `logical` and `physical` fields of the
/// pins are ignored and derived from native order, see
/// [`BoardDescriptor::from_native`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    pub name: String,
    #[serde(default)]
    pub derive_numbering: bool,
    #[serde(rename = "connector", default)]
    pub connectors: Vec<ConnectorConfig>,
    #[serde(rename = "pin", default)]
    pub pins: Vec<PinConfig>,
}

impl BoardConfig {
    /// Validate into a [`BoardDescriptor`].
    pub fn build(&self) -> Result<BoardDescriptor, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "board name cannot be empty".to_string(),
            ));
        }

        let connectors = self
            .connectors
            .iter()
            .map(ConnectorConfig::connector)
            .collect::<Result<Vec<_>, _>>()?;
        let mut pins = self
            .pins
            .iter()
            .map(PinConfig::descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        if self.derive_numbering {
            pins = board::derive_numbering(pins);
        }

        BoardDescriptor::with_connectors(&self.name, connectors, pins)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

impl TryFrom<BoardConfig> for BoardDescriptor {
    type Error = ConfigError;

    fn try_from(config: BoardConfig) -> Result<Self, Self::Error> {
        config.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TINY: &str = r#"
name = "tiny-4"
derive_numbering = true

[[pin]]
native = 3

[[pin]]
native = 0
name = "LED"
caps = "GPIO | PWM"

[[pin]]
native = 1
caps = "GROUND"

[[pin]]
native = 2
"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn gpio_config_defaults() {
        let config: GpioConfig = toml::from_str("").unwrap();
        assert_eq!(config, GpioConfig::default());
        assert_eq!(config.numbering, NumberingScheme::Logical);
        assert!(config.release_on_close);
    }

    #[test]
    fn gpio_config_from_file() {
        let file = write_temp("numbering = \"physical\"\nrelease_on_close = false\n");
        let config = GpioConfig::load(file.path()).unwrap();
        assert_eq!(config.numbering, NumberingScheme::Physical);
        assert!(!config.release_on_close);
    }

    #[test]
    fn board_from_file() {
        let file = write_temp(TINY);
        let board = BoardConfig::load(file.path()).unwrap().build().unwrap();

        assert_eq!(board.name(), "tiny-4");
        assert_eq!(board.len(), 4);
        let led = board.find(0, NumberingScheme::Logical).unwrap();
        assert_eq!(led.native(), 0);
        assert_eq!(led.name(), "LED");
        assert!(led.caps().contains(PinCaps::PWM));
        assert!(board.find(1, NumberingScheme::SocNative).unwrap().is_reserved());
        assert_eq!(board.find(2, NumberingScheme::Logical).unwrap().native(), 3);
    }

    #[test]
    fn explicit_numbering() {
        let config: BoardConfig = toml::from_str(
            r#"
name = "explicit"

[[pin]]
native = 17
logical = 0
physical = 11
"#,
        )
        .unwrap();
        let board = BoardDescriptor::try_from(config).unwrap();
        let pin = board.find(11, NumberingScheme::Physical).unwrap();
        assert_eq!(pin.native(), 17);
        assert_eq!(pin.logical(), Some(0));
    }

    #[test]
    fn missing_file() {
        let result = GpioConfig::load(Path::new("/nonexistent/gpio.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn invalid_toml() {
        let file = write_temp("name = [unterminated");
        let result = BoardConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn duplicate_pins_fail_validation() {
        let config: BoardConfig =
            toml::from_str("name = \"dup\"\n[[pin]]\nnative = 1\n[[pin]]\nnative = 1\n").unwrap();
        let err = config.build().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("duplicate native")));
    }

    #[test]
    fn empty_board_name_fails_validation() {
        let config = BoardConfig {
            name: String::new(),
            derive_numbering: false,
            connectors: vec![],
            pins: vec![],
        };
        assert!(matches!(config.build(), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn connectors_and_positions() {
        let config: BoardConfig = toml::from_str(
            r#"
name = "neo-slice"
derive_numbering = true

[[connector]]
number = 1
name = "con1"
rows = 2
columns = 2

[[connector]]
number = 2
name = "dbg_uart"
rows = 4

[[pin]]
native = 0
caps = "POWER"
row = 1

[[pin]]
native = 12
row = 1
column = 2

[[pin]]
native = 4
name = "UART0TX"
connector = 2
row = 3
"#,
        )
        .unwrap();
        let board = config.build().unwrap();

        assert_eq!(board.connector(2).unwrap().columns(), 1);
        assert_eq!(board.find_at(1, 1, 1).unwrap().native(), 0);
        assert_eq!(board.find_at(1, 1, 2).unwrap().logical(), Some(1));
        assert_eq!(board.find_at(2, 3, 1).unwrap().name(), "UART0TX");
    }

    #[test]
    fn column_without_row_fails_validation() {
        let config: BoardConfig =
            toml::from_str("name = \"bad\"\n[[pin]]\nnative = 1\ncolumn = 2\n").unwrap();
        let err = config.build().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("no row")));
    }

    #[test]
    fn position_off_connector_fails_validation() {
        let config: BoardConfig = toml::from_str(
            "name = \"bad\"\n[[connector]]\nnumber = 1\nname = \"con1\"\nrows = 2\n\n[[pin]]\nnative = 1\nlogical = 0\nrow = 3\n",
        )
        .unwrap();
        assert!(matches!(config.build(), Err(ConfigError::ValidationError(_))));
    }
}
