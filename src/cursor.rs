// Copyright (c) 2024 The board-gpio Project Developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::sync::Arc;

use crate::errors::{ErrorKind, Result};
use crate::numbering::NumberingScheme;
use crate::registry::{PinRegistry, RegistrySlot};

/// Position of a [`PinCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Not started; the next step forward lands on the first pin.
    BeforeFirst,
    /// On the pin at this index of the registry.
    OnPin(usize),
    /// Past the last pin. Stepping forward fails until the cursor is reset.
    Exhausted,
}

/// Stateful walk over the pins of a context's registry.
///
/// Each cursor keeps its own position, so any number of them can walk the
/// same context independently. A cursor works on the registry that was active
/// when it was last reset: after the context switches numbering scheme, every
/// step fails with `StaleCursor` until [`to_front`](Self::to_front) or
/// [`to_back`](Self::to_back) picks up the new registry. Switching the
/// numbering mid-iteration is a caller error.
#[derive(Debug, Clone)]
pub struct PinCursor {
    source: Arc<RegistrySlot>,
    snapshot: Option<Arc<PinRegistry>>,
    state: CursorState,
}

impl PinCursor {
    pub(crate) fn new(source: Arc<RegistrySlot>) -> Self {
        let snapshot = source.load();
        Self {
            source,
            snapshot,
            state: CursorState::BeforeFirst,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Scheme of the pins this cursor yields.
    pub fn scheme(&self) -> Option<NumberingScheme> {
        self.snapshot.as_ref().map(|r| r.scheme())
    }

    /// Rewind before the first pin.
    pub fn to_front(&mut self) {
        self.snapshot = self.source.load();
        self.state = CursorState::BeforeFirst;
    }

    /// Move past the last pin, ready for [`prev_pin`](Self::prev_pin).
    pub fn to_back(&mut self) {
        self.snapshot = self.source.load();
        self.state = CursorState::Exhausted;
    }

    /// True if [`next_pin`](Self::next_pin) would not fail with `Exhausted`.
    ///
    /// A stale cursor, or one whose context is closed, also answers true so
    /// that the next step reports `StaleCursor` or `NotOpen` instead of the
    /// loop ending early.
    pub fn has_next(&self) -> bool {
        let Ok(reg) = self.registry() else {
            return true;
        };
        match self.state {
            CursorState::BeforeFirst => !reg.is_empty(),
            CursorState::OnPin(i) => i + 1 < reg.count(),
            CursorState::Exhausted => false,
        }
    }

    /// Backward counterpart of [`has_next`](Self::has_next).
    pub fn has_previous(&self) -> bool {
        let Ok(reg) = self.registry() else {
            return true;
        };
        match self.state {
            CursorState::BeforeFirst => false,
            CursorState::OnPin(i) => i > 0,
            CursorState::Exhausted => !reg.is_empty(),
        }
    }

    /// Step forward and return the pin landed on.
    pub fn next_pin(&mut self) -> Result<u32> {
        let reg = self.registry()?.clone();
        let idx = match self.state {
            CursorState::BeforeFirst => 0,
            CursorState::OnPin(i) => i + 1,
            CursorState::Exhausted => return Err(ErrorKind::Exhausted.into()),
        };

        match reg.get(idx) {
            Some(entry) => {
                self.state = CursorState::OnPin(idx);
                Ok(entry.pin)
            }
            None => {
                self.state = CursorState::Exhausted;
                Err(ErrorKind::Exhausted.into())
            }
        }
    }

    /// Step backward and return the pin landed on.
    pub fn prev_pin(&mut self) -> Result<u32> {
        let reg = self.registry()?.clone();
        let idx = match self.state {
            CursorState::BeforeFirst => return Err(ErrorKind::Exhausted.into()),
            CursorState::OnPin(i) => i.checked_sub(1),
            CursorState::Exhausted => reg.count().checked_sub(1),
        };

        match idx.and_then(|i| Some((i, reg.get(i)?))) {
            Some((i, entry)) => {
                self.state = CursorState::OnPin(i);
                Ok(entry.pin)
            }
            None => {
                self.state = CursorState::BeforeFirst;
                Err(ErrorKind::Exhausted.into())
            }
        }
    }

    /// The pin the cursor is on.
    pub fn current(&self) -> Result<u32> {
        let reg = self.registry()?;
        match self.state {
            CursorState::OnPin(i) => reg
                .get(i)
                .map(|e| e.pin)
                .ok_or_else(|| ErrorKind::NoCurrent.into()),
            _ => Err(ErrorKind::NoCurrent.into()),
        }
    }

    fn registry(&self) -> Result<&Arc<PinRegistry>> {
        let snapshot = self.snapshot.as_ref().ok_or(ErrorKind::NotOpen)?;
        match self.source.generation() {
            None => Err(ErrorKind::NotOpen.into()),
            Some(g) if g != snapshot.generation() => Err(ErrorKind::StaleCursor.into()),
            Some(_) => Ok(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardDescriptor, PinCaps};

    fn slot(scheme: NumberingScheme, generation: u64) -> (BoardDescriptor, Arc<RegistrySlot>) {
        let board = BoardDescriptor::from_native(
            "test-4",
            [
                (0, PinCaps::GPIO),
                (1, PinCaps::GROUND),
                (2, PinCaps::GPIO),
                (3, PinCaps::GPIO),
            ],
        )
        .unwrap();
        let reg = PinRegistry::build_generation(&board, scheme, generation);
        (board, Arc::new(RegistrySlot::new(Arc::new(reg))))
    }

    fn is_kind(err: crate::Error, kind: fn(&ErrorKind) -> bool) -> bool {
        kind(err.kind())
    }

    #[test]
    fn walks_forward_then_exhausts() {
        let (_, slot) = slot(NumberingScheme::Logical, 0);
        let mut cursor = PinCursor::new(slot);

        assert_eq!(cursor.state(), CursorState::BeforeFirst);
        assert!(is_kind(cursor.current().unwrap_err(), |k| matches!(k, ErrorKind::NoCurrent)));

        let mut seen = vec![];
        while cursor.has_next() {
            seen.push(cursor.next_pin().unwrap());
            assert_eq!(cursor.current().unwrap(), *seen.last().unwrap());
        }
        assert_eq!(seen, [0, 1, 2]);

        assert!(is_kind(cursor.next_pin().unwrap_err(), |k| matches!(k, ErrorKind::Exhausted)));
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(is_kind(cursor.next_pin().unwrap_err(), |k| matches!(k, ErrorKind::Exhausted)));
        assert!(cursor.current().is_err());

        cursor.to_front();
        assert_eq!(cursor.next_pin().unwrap(), 0);
    }

    #[test]
    fn walks_backward_from_back() {
        let (_, slot) = slot(NumberingScheme::Physical, 0);
        let mut cursor = PinCursor::new(slot);
        cursor.to_back();

        let mut seen = vec![];
        while cursor.has_previous() {
            seen.push(cursor.prev_pin().unwrap());
        }
        assert_eq!(seen, [4, 3, 1]);
        assert!(cursor.prev_pin().is_err());
        assert_eq!(cursor.state(), CursorState::BeforeFirst);
    }

    #[test]
    fn cursors_are_independent() {
        let (_, slot) = slot(NumberingScheme::SocNative, 0);
        let mut a = PinCursor::new(slot.clone());
        let mut b = PinCursor::new(slot);

        assert_eq!(a.next_pin().unwrap(), 0);
        assert_eq!(a.next_pin().unwrap(), 1);
        assert_eq!(b.next_pin().unwrap(), 0);
        assert_eq!(a.current().unwrap(), 1);
    }

    #[test]
    fn empty_registry() {
        let board = BoardDescriptor::from_native("dead", [(0, PinCaps::GROUND)]).unwrap();
        let reg = PinRegistry::build(&board, NumberingScheme::Logical);
        let mut cursor = PinCursor::new(Arc::new(RegistrySlot::new(Arc::new(reg))));

        assert!(!cursor.has_next());
        assert!(cursor.next_pin().is_err());
        assert_eq!(cursor.state(), CursorState::Exhausted);
        cursor.to_back();
        assert!(!cursor.has_previous());
    }

    #[test]
    fn registry_swap_makes_cursor_stale() {
        let (board, slot) = slot(NumberingScheme::Logical, 0);
        let mut cursor = PinCursor::new(slot.clone());
        assert_eq!(cursor.next_pin().unwrap(), 0);

        slot.store(Some(Arc::new(PinRegistry::build_generation(
            &board,
            NumberingScheme::Physical,
            1,
        ))));
        assert!(cursor.has_next());
        assert!(cursor.has_previous());
        assert!(is_kind(cursor.next_pin().unwrap_err(), |k| matches!(k, ErrorKind::StaleCursor)));
        assert!(is_kind(cursor.current().unwrap_err(), |k| matches!(k, ErrorKind::StaleCursor)));

        cursor.to_front();
        assert_eq!(cursor.scheme(), Some(NumberingScheme::Physical));
        assert_eq!(cursor.next_pin().unwrap(), 1);
    }

    #[test]
    fn cursor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PinCursor>();
        assert_send_sync::<CursorState>();
    }

    #[test]
    fn closed_source_reports_not_open() {
        let (_, slot) = slot(NumberingScheme::Logical, 0);
        let mut cursor = PinCursor::new(slot.clone());
        slot.store(None);
        assert!(cursor.has_next());
        assert!(is_kind(cursor.next_pin().unwrap_err(), |k| matches!(k, ErrorKind::NotOpen)));
        cursor.to_front();
        assert!(is_kind(cursor.next_pin().unwrap_err(), |k| matches!(k, ErrorKind::NotOpen)));
    }
}
