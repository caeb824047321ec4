//! Logical pin slots and their binding to physical pins.

use core::fmt;

/// Number of GPIO lines exposed through the configuration report.
pub const PIN_SLOTS: usize = 8;

/// Board-specific physical pin number. Its encoding is up to the platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId(pub u8);

/// A logical slot index, always in `0..PIN_SLOTS`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
    pub const fn new(index: usize) -> Option<Self> {
        if index < PIN_SLOTS {
            Some(Slot(index as u8))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All slots in ascending order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..PIN_SLOTS as u8).map(Slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static slot -> physical pin table, fixed at build time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinBindings {
    pins: [PinId; PIN_SLOTS],
}

impl PinBindings {
    pub const fn new(pins: [PinId; PIN_SLOTS]) -> Self {
        Self { pins }
    }

    pub const fn physical_pin_for(&self, slot: Slot) -> PinId {
        self.pins[slot.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_bounds() {
        assert_eq!(Slot::new(0).map(Slot::index), Some(0));
        assert_eq!(Slot::new(7).map(Slot::index), Some(7));
        assert_eq!(Slot::new(8), None);
        assert_eq!(Slot::all().count(), PIN_SLOTS);
    }

    #[test]
    fn test_lookup_follows_table_order() {
        let bindings = PinBindings::new([
            PinId(10),
            PinId(11),
            PinId(3),
            PinId(4),
            PinId(20),
            PinId(21),
            PinId(22),
            PinId(7),
        ]);
        let resolved: Vec<PinId> = Slot::all().map(|s| bindings.physical_pin_for(s)).collect();
        assert_eq!(resolved[0], PinId(10));
        assert_eq!(resolved[2], PinId(3));
        assert_eq!(resolved[7], PinId(7));
    }
}
