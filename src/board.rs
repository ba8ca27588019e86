// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Static description of a board's pins and connectors.
//!
//! A [`BoardDescriptor`] lists every native pin of the SoC that is routed
//! somewhere, together with its number in the logical and physical schemes
//! and, optionally, its row and column on one of the board's [`Connector`]s.
//! The physical scheme numbers the slots of the main header; pins that only
//! appear on secondary connectors (debug UART, USB, audio) are addressed by
//! their [`Position`] instead. It is plain data: nothing here touches the
//! hardware.

use itertools::Itertools;

use crate::errors::{Error, Result};
use crate::numbering::NumberingScheme;

/// Maximum number of pins a board descriptor can hold.
pub const PINS_MAX: usize = 64;
/// Maximum number of connectors on a board.
pub const CONNECTORS_MAX: usize = 8;
/// Maximum length of a pin or connector name, in bytes.
pub const PIN_NAME_SIZE: usize = 16;
/// Maximum length of a board name, in bytes.
pub const BOARD_NAME_SIZE: usize = 32;

bitflags::bitflags! {
    /// What a connector slot is wired to.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct PinCaps: u32 {
        const GPIO = 1 << 0;
        const PWM = 1 << 1;
        const POWER = 1 << 2;
        const GROUND = 1 << 3;
        const NOT_CONNECTED = 1 << 4;
        const USB = 1 << 5;
        const SOUND = 1 << 6;
        const VIDEO = 1 << 7;

        /// Slots that take up a connector position but can never be driven.
        const RESERVED = Self::POWER.bits()
            | Self::GROUND.bits()
            | Self::NOT_CONNECTED.bits()
            | Self::USB.bits()
            | Self::SOUND.bits()
            | Self::VIDEO.bits();
    }
}

/// A pin header or socket of the board, made of `rows` x `columns` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    number: u32,
    name: heapless::String<PIN_NAME_SIZE>,
    rows: u32,
    columns: u32,
}

impl Connector {
    pub fn new(number: u32, name: &str, rows: u32, columns: u32) -> Result<Self> {
        let name = heapless::String::try_from(name).map_err(|_| {
            Error::invalid_descriptor(format!(
                "connector name {name:?} is longer than {PIN_NAME_SIZE} bytes"
            ))
        })?;
        if rows == 0 || columns == 0 {
            return Err(Error::invalid_descriptor(format!(
                "connector {number} has no slots ({rows}x{columns})"
            )));
        }
        Ok(Self {
            number,
            name,
            rows,
            columns,
        })
    }

    pub const fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn rows(&self) -> u32 {
        self.rows
    }

    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Slot number printed on the connector, counted from 1 row by row.
    ///
    /// On a dual-row header, row 3 column 2 is slot 6; on a single-row
    /// connector the slot is the row. `None` outside the connector.
    pub fn slot(&self, row: u32, column: u32) -> Option<u32> {
        if !(1..=self.rows).contains(&row) || !(1..=self.columns).contains(&column) {
            return None;
        }
        Some((row - 1) * self.columns + column)
    }
}

/// Location of a pin: connector number, then row and column from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub connector: u32,
    pub row: u32,
    pub column: u32,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "con{}:{}.{}", self.connector, self.row, self.column)
    }
}

/// One native pin and the numbers it goes by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDescriptor {
    native: u32,
    logical: Option<u32>,
    physical: Option<u32>,
    position: Option<Position>,
    name: heapless::String<PIN_NAME_SIZE>,
    caps: PinCaps,
}

impl PinDescriptor {
    pub const fn new(native: u32, caps: PinCaps) -> Self {
        Self {
            native,
            logical: None,
            physical: None,
            position: None,
            name: heapless::String::new(),
            caps,
        }
    }

    pub fn with_logical(self, logical: u32) -> Self {
        Self {
            logical: Some(logical),
            ..self
        }
    }

    /// Set the main header slot, counted from 1.
    pub fn with_physical(self, physical: u32) -> Self {
        Self {
            physical: Some(physical),
            ..self
        }
    }

    pub fn with_position(self, connector: u32, row: u32, column: u32) -> Self {
        Self {
            position: Some(Position {
                connector,
                row,
                column,
            }),
            ..self
        }
    }

    pub fn with_name(mut self, name: &str) -> Result<Self> {
        self.name = heapless::String::try_from(name).map_err(|_| {
            Error::invalid_descriptor(format!(
                "pin name {name:?} is longer than {PIN_NAME_SIZE} bytes"
            ))
        })?;
        Ok(self)
    }

    pub const fn native(&self) -> u32 {
        self.native
    }

    pub const fn logical(&self) -> Option<u32> {
        self.logical
    }

    pub const fn physical(&self) -> Option<u32> {
        self.physical
    }

    pub const fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn caps(&self) -> PinCaps {
        self.caps
    }

    /// Power, ground, not-connected and peripheral (USB, sound, video) slots.
    pub const fn is_reserved(&self) -> bool {
        self.caps.intersects(PinCaps::RESERVED)
    }

    /// Number of this pin in `scheme`.
    ///
    /// Reserved pins only have a native number.
    pub const fn number(&self, scheme: NumberingScheme) -> Option<u32> {
        match scheme {
            NumberingScheme::SocNative => Some(self.native),
            _ if self.is_reserved() => None,
            NumberingScheme::Logical => self.logical,
            NumberingScheme::Physical => self.physical,
        }
    }
}

/// Pin table of one board model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDescriptor {
    name: heapless::String<BOARD_NAME_SIZE>,
    connectors: heapless::Vec<Connector, CONNECTORS_MAX>,
    pins: heapless::Vec<PinDescriptor, PINS_MAX>,
}

impl BoardDescriptor {
    /// Validate and build a descriptor without connectors.
    pub fn new(name: &str, pins: impl IntoIterator<Item = PinDescriptor>) -> Result<Self> {
        Self::with_connectors(name, std::iter::empty::<Connector>(), pins)
    }

    /// Validate and build a descriptor.
    ///
    /// Native numbers must be unique, and so must the logical numbers, the
    /// physical slots and the connector positions that are present. Every
    /// pin that is not reserved needs a logical number below [`PINS_MAX`];
    /// reserved pins cannot have one. Physical slots count from 1. A pin
    /// without a physical slot is not on the main header and is left out of
    /// the physical scheme. Positions must fall inside a listed connector.
    pub fn with_connectors(
        name: &str,
        connectors: impl IntoIterator<Item = Connector>,
        pins: impl IntoIterator<Item = PinDescriptor>,
    ) -> Result<Self> {
        let name = heapless::String::try_from(name).map_err(|_| {
            Error::invalid_descriptor(format!(
                "board name {name:?} is longer than {BOARD_NAME_SIZE} bytes"
            ))
        })?;

        let mut sockets: heapless::Vec<Connector, CONNECTORS_MAX> = heapless::Vec::new();
        for connector in connectors {
            sockets.push(connector).map_err(|_| {
                Error::invalid_descriptor(format!("more than {CONNECTORS_MAX} connectors"))
            })?;
        }
        sockets.sort_unstable_by_key(Connector::number);
        if let Some(number) = sockets.iter().map(Connector::number).duplicates().next() {
            return Err(Error::invalid_descriptor(format!(
                "duplicate connector {number}"
            )));
        }

        let mut table: heapless::Vec<PinDescriptor, PINS_MAX> = heapless::Vec::new();
        for pin in pins {
            table.push(pin).map_err(|_| {
                Error::invalid_descriptor(format!("more than {PINS_MAX} pins"))
            })?;
        }
        table.sort_unstable_by_key(PinDescriptor::native);

        if let Some(native) = table.iter().map(PinDescriptor::native).duplicates().next() {
            return Err(Error::invalid_descriptor(format!(
                "duplicate native pin {native}"
            )));
        }
        if let Some(logical) = table.iter().filter_map(PinDescriptor::logical).duplicates().next() {
            return Err(Error::invalid_descriptor(format!(
                "duplicate logical pin {logical}"
            )));
        }
        if let Some(slot) = table.iter().filter_map(PinDescriptor::physical).duplicates().next() {
            return Err(Error::invalid_descriptor(format!(
                "duplicate physical slot {slot}"
            )));
        }
        if let Some(pos) = table.iter().filter_map(PinDescriptor::position).duplicates().next() {
            return Err(Error::invalid_descriptor(format!(
                "duplicate position {pos}"
            )));
        }
        if let Some(pin) = table.iter().find(|p| p.physical == Some(0)) {
            return Err(Error::invalid_descriptor(format!(
                "native pin {} has physical slot 0, slots count from 1",
                pin.native
            )));
        }
        for pin in table.iter() {
            let Some(pos) = pin.position else {
                continue;
            };
            let inside = sockets
                .binary_search_by_key(&pos.connector, Connector::number)
                .ok()
                .and_then(|i| sockets[i].slot(pos.row, pos.column));
            if inside.is_none() {
                return Err(Error::invalid_descriptor(format!(
                    "native pin {} is placed at {pos}, outside every connector",
                    pin.native
                )));
            }
        }
        if let Some(pin) = table.iter().find(|p| p.is_reserved() && p.logical.is_some()) {
            return Err(Error::invalid_descriptor(format!(
                "reserved native pin {} cannot have a logical number",
                pin.native
            )));
        }
        if let Some(pin) = table.iter().find(|p| !p.is_reserved() && p.logical.is_none()) {
            return Err(Error::invalid_descriptor(format!(
                "native pin {} has no logical number",
                pin.native
            )));
        }
        // Keeps logical numbers addressable by a 64-bit pin mask.
        if let Some(logical) = table
            .iter()
            .filter_map(PinDescriptor::logical)
            .find(|&n| n as usize >= PINS_MAX)
        {
            return Err(Error::invalid_descriptor(format!(
                "logical pin {logical} is not below {PINS_MAX}"
            )));
        }

        Ok(Self {
            name,
            connectors: sockets,
            pins: table,
        })
    }

    /// Build a descriptor where the header follows native order.
    ///
    /// Physical slot `n` is the `n`-th native pin (counting from 1, reserved
    /// pins included) and logical numbers are assigned densely, in native
    /// order, to the non-reserved pins.
    pub fn from_native(name: &str, pins: impl IntoIterator<Item = (u32, PinCaps)>) -> Result<Self> {
        Self::with_derived_numbering(
            name,
            pins.into_iter()
                .map(|(native, caps)| PinDescriptor::new(native, caps)),
        )
    }

    /// Like [`from_native`](Self::from_native), keeping the names and
    /// positions of the given pins. Any logical or physical numbers they carry
    /// are replaced.
    pub fn with_derived_numbering(
        name: &str,
        pins: impl IntoIterator<Item = PinDescriptor>,
    ) -> Result<Self> {
        Self::new(name, derive_numbering(pins))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pins sorted by native number.
    pub fn pins(&self) -> &[PinDescriptor] {
        &self.pins
    }

    /// Connectors sorted by number.
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn connector(&self, number: u32) -> Option<&Connector> {
        self.connectors
            .binary_search_by_key(&number, Connector::number)
            .ok()
            .map(|i| &self.connectors[i])
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Position of a native pin in [`pins`](Self::pins).
    pub fn index_of(&self, native: u32) -> Option<usize> {
        self.pins
            .binary_search_by_key(&native, PinDescriptor::native)
            .ok()
    }

    /// The pin numbered `pin` in `scheme`.
    pub fn find(&self, pin: u32, scheme: NumberingScheme) -> Option<&PinDescriptor> {
        match scheme {
            NumberingScheme::SocNative => self.index_of(pin).map(|i| &self.pins[i]),
            _ => self.pins.iter().find(|p| p.number(scheme) == Some(pin)),
        }
    }

    /// The pin at `row`, `column` of connector `connector`.
    pub fn find_at(&self, connector: u32, row: u32, column: u32) -> Option<&PinDescriptor> {
        let pos = Position {
            connector,
            row,
            column,
        };
        self.pins.iter().find(|p| p.position == Some(pos))
    }

    /// Size of the raw pin table of `scheme`, reserved slots included.
    pub fn raw_capacity(&self, scheme: NumberingScheme) -> usize {
        match scheme {
            NumberingScheme::SocNative => self.pins.len(),
            // Logical numbers are below PINS_MAX.
            NumberingScheme::Logical => self
                .pins
                .iter()
                .filter_map(PinDescriptor::logical)
                .max()
                .map_or(0, |n| n as usize + 1),
            NumberingScheme::Physical => self
                .pins
                .iter()
                .filter_map(PinDescriptor::physical)
                .max()
                .map_or(0, |n| n as usize),
        }
    }
}

/// Renumber `pins` in native order: physical slots from 1 for every pin,
/// dense logical numbers for the non-reserved ones.
pub(crate) fn derive_numbering(pins: impl IntoIterator<Item = PinDescriptor>) -> Vec<PinDescriptor> {
    let mut sorted: Vec<PinDescriptor> = pins.into_iter().collect();
    sorted.sort_unstable_by_key(PinDescriptor::native);

    let mut next_logical = 0;
    sorted
        .into_iter()
        .zip(1..)
        .map(|(pin, slot)| {
            let pin = PinDescriptor {
                logical: None,
                ..pin
            }
            .with_physical(slot);
            if pin.is_reserved() {
                pin
            } else {
                next_logical += 1;
                pin.with_logical(next_logical - 1)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn test_board() -> BoardDescriptor {
        BoardDescriptor::from_native(
            "test-4",
            [
                (3, PinCaps::GPIO),
                (1, PinCaps::GROUND),
                (0, PinCaps::GPIO),
                (2, PinCaps::GPIO | PinCaps::PWM),
            ],
        )
        .unwrap()
    }

    // A dual-row main header and a single-row debug UART, as on NanoPi boards.
    fn two_connectors() -> BoardDescriptor {
        BoardDescriptor::with_connectors(
            "neo-slice",
            [
                Connector::new(2, "dbg_uart", 4, 1).unwrap(),
                Connector::new(1, "con1", 12, 2).unwrap(),
            ],
            [
                PinDescriptor::new(100, PinCaps::POWER).with_physical(1).with_position(1, 1, 1),
                PinDescriptor::new(12, PinCaps::GPIO)
                    .with_logical(8)
                    .with_physical(3)
                    .with_position(1, 2, 1),
                PinDescriptor::new(11, PinCaps::GPIO)
                    .with_logical(9)
                    .with_physical(5)
                    .with_position(1, 3, 1),
                PinDescriptor::new(101, PinCaps::GROUND).with_position(2, 1, 1),
                PinDescriptor::new(4, PinCaps::GPIO)
                    .with_logical(17)
                    .with_position(2, 3, 1)
                    .with_name("UART0TX")
                    .unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn derived_numbering() {
        let board = test_board();
        let logical: Vec<_> = board.pins().iter().map(PinDescriptor::logical).collect();
        let physical: Vec<_> = board.pins().iter().map(PinDescriptor::physical).collect();
        assert_eq!(logical, [Some(0), None, Some(1), Some(2)]);
        assert_eq!(physical, [Some(1), Some(2), Some(3), Some(4)]);
    }

    #[test]
    fn reserved_pins_exist_only_natively() {
        let board = test_board();
        let ground = board.find(1, NumberingScheme::SocNative).unwrap();
        assert!(ground.is_reserved());
        assert_eq!(ground.number(NumberingScheme::Logical), None);
        assert_eq!(ground.number(NumberingScheme::Physical), None);
        assert!(board.find(2, NumberingScheme::Physical).is_none());
    }

    #[test]
    fn peripheral_slots_are_reserved() {
        for caps in [PinCaps::USB, PinCaps::SOUND, PinCaps::VIDEO] {
            let pin = PinDescriptor::new(0, caps);
            assert!(pin.is_reserved());
            assert_eq!(pin.number(NumberingScheme::Physical), None);
        }
    }

    #[test]
    fn raw_capacity_per_scheme() {
        let board = test_board();
        assert_eq!(board.raw_capacity(NumberingScheme::SocNative), 4);
        assert_eq!(board.raw_capacity(NumberingScheme::Logical), 3);
        assert_eq!(board.raw_capacity(NumberingScheme::Physical), 4);
    }

    #[test]
    fn duplicate_native_is_rejected() {
        let err = BoardDescriptor::from_native("dup", [(5, PinCaps::GPIO), (5, PinCaps::GPIO)])
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDescriptor(_)));
    }

    #[test]
    fn duplicate_physical_is_rejected() {
        let err = BoardDescriptor::new(
            "dup",
            [
                PinDescriptor::new(0, PinCaps::GPIO).with_logical(0).with_physical(7),
                PinDescriptor::new(1, PinCaps::GPIO).with_logical(1).with_physical(7),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate physical slot 7"));
    }

    #[test]
    fn reserved_pin_with_logical_number_is_rejected() {
        let err = BoardDescriptor::new(
            "bad",
            [PinDescriptor::new(0, PinCaps::POWER).with_logical(0)],
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDescriptor(_)));
    }

    #[test]
    fn gpio_without_logical_number_is_rejected() {
        let err = BoardDescriptor::new("bad", [PinDescriptor::new(3, PinCaps::GPIO).with_physical(1)])
            .unwrap_err();
        assert!(err.to_string().contains("native pin 3 has no logical number"));
    }

    #[test]
    fn huge_logical_number_is_rejected() {
        let err = BoardDescriptor::new(
            "bad",
            [PinDescriptor::new(0, PinCaps::GPIO).with_logical(u32::MAX)],
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDescriptor(_)));

        let board = BoardDescriptor::new(
            "edge",
            [PinDescriptor::new(0, PinCaps::GPIO).with_logical(PINS_MAX as u32 - 1)],
        )
        .unwrap();
        assert_eq!(board.raw_capacity(NumberingScheme::Logical), PINS_MAX);
    }

    #[test]
    fn physical_slot_zero_is_rejected() {
        let err = BoardDescriptor::new(
            "bad",
            [PinDescriptor::new(0, PinCaps::GPIO).with_logical(0).with_physical(0)],
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDescriptor(_)));
    }

    #[test]
    fn too_many_pins() {
        let pins = (0..=PINS_MAX as u32).map(|n| (n, PinCaps::GPIO));
        assert!(BoardDescriptor::from_native("huge", pins).is_err());
    }

    #[test]
    fn pin_names() {
        let pin = PinDescriptor::new(0, PinCaps::GPIO).with_name("GPIO0").unwrap();
        assert_eq!(pin.name(), "GPIO0");
        assert!(PinDescriptor::new(0, PinCaps::GPIO)
            .with_name("A_VERY_LONG_PIN_NAME")
            .is_err());
    }

    #[test]
    fn derived_numbering_keeps_names() {
        let board = BoardDescriptor::with_derived_numbering(
            "named",
            [
                PinDescriptor::new(9, PinCaps::GPIO).with_name("LED").unwrap(),
                PinDescriptor::new(4, PinCaps::GPIO).with_logical(30),
            ],
        )
        .unwrap();
        let led = board.find(1, NumberingScheme::Logical).unwrap();
        assert_eq!(led.name(), "LED");
        assert_eq!(led.physical(), Some(2));
        assert_eq!(board.find(4, NumberingScheme::SocNative).unwrap().logical(), Some(0));
    }

    #[test]
    fn connector_slots() {
        let dil = Connector::new(1, "con1", 12, 2).unwrap();
        assert_eq!(dil.slot(1, 1), Some(1));
        assert_eq!(dil.slot(3, 2), Some(6));
        assert_eq!(dil.slot(12, 2), Some(24));
        assert_eq!(dil.slot(13, 1), None);
        assert_eq!(dil.slot(1, 3), None);
        assert_eq!(dil.slot(0, 1), None);

        let sil = Connector::new(2, "dbg_uart", 4, 1).unwrap();
        assert_eq!(sil.slot(3, 1), Some(3));
        assert!(Connector::new(3, "empty", 0, 2).is_err());
    }

    #[test]
    fn pins_are_found_by_position() {
        let board = two_connectors();
        assert_eq!(
            board.connectors().iter().map(Connector::name).collect::<Vec<_>>(),
            ["con1", "dbg_uart"]
        );
        assert_eq!(board.connector(2).unwrap().rows(), 4);

        let tx = board.find_at(2, 3, 1).unwrap();
        assert_eq!(tx.native(), 4);
        assert_eq!(tx.name(), "UART0TX");
        assert_eq!(board.find_at(1, 3, 1).unwrap().physical(), Some(5));
        assert!(board.find_at(1, 4, 2).is_none());
    }

    #[test]
    fn secondary_connector_pins_have_no_header_slot() {
        let board = two_connectors();
        let tx = board.find(17, NumberingScheme::Logical).unwrap();
        assert_eq!(tx.physical(), None);
        assert_eq!(tx.position().unwrap().to_string(), "con2:3.1");
        assert_eq!(board.raw_capacity(NumberingScheme::Physical), 5);
    }

    #[test]
    fn position_outside_connector_is_rejected() {
        let connectors = || [Connector::new(1, "con1", 2, 2).unwrap()];

        let err = BoardDescriptor::with_connectors(
            "bad",
            connectors(),
            [PinDescriptor::new(0, PinCaps::GPIO).with_logical(0).with_position(1, 3, 1)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("outside every connector"));

        let err = BoardDescriptor::with_connectors(
            "bad",
            connectors(),
            [PinDescriptor::new(0, PinCaps::GPIO).with_logical(0).with_position(5, 1, 1)],
        )
        .unwrap_err();
        assert!(err.to_string().contains("con5:1.1"));
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let err = BoardDescriptor::with_connectors(
            "bad",
            [Connector::new(1, "con1", 2, 2).unwrap()],
            [
                PinDescriptor::new(0, PinCaps::GPIO).with_logical(0).with_position(1, 1, 2),
                PinDescriptor::new(1, PinCaps::GROUND).with_position(1, 1, 2),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate position con1:1.2"));
    }

    #[test]
    fn duplicate_connector_is_rejected() {
        let err = BoardDescriptor::with_connectors(
            "bad",
            [
                Connector::new(1, "con1", 2, 2).unwrap(),
                Connector::new(1, "con2", 2, 2).unwrap(),
            ],
            std::iter::empty::<PinDescriptor>(),
        )
        .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidDescriptor(_)));
    }
}
