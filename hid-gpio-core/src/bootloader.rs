//! Reboot-reason markers and the keyboard LED escape chord.
//!
//! A marker is left in a non-volatile register before resetting so the
//! bootloader (or early start-up code) knows why the device went down.

use crate::platform::{NvRegisters, SystemControl};

/// Non-volatile register slot holding the reboot reason.
pub const REBOOT_REASON_SLOT: usize = 2;

pub const LED_NUM_LOCK: u8 = 1 << 0;
pub const LED_CAPS_LOCK: u8 = 1 << 1;
pub const LED_SCROLL_LOCK: u8 = 1 << 2;

/// Num-Lock + Caps-Lock + Scroll-Lock all lit at once.
pub const REENTRY_CHORD: u8 = LED_NUM_LOCK | LED_CAPS_LOCK | LED_SCROLL_LOCK;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum RebootReason {
    Bootloader = 100,
    Dfu = 0xDF00_AE01,
}

impl RebootReason {
    pub const fn marker(self) -> u32 {
        self as u32
    }

    pub const fn from_marker(value: u32) -> Option<Self> {
        match value {
            100 => Some(RebootReason::Bootloader),
            0xDF00_AE01 => Some(RebootReason::Dfu),
            _ => None,
        }
    }
}

/// True when the LED byte carries the bootloader escape chord.
pub const fn is_reentry_chord(leds: u8) -> bool {
    leds & REENTRY_CHORD == REENTRY_CHORD
}

/// Persist `reason` and reset. Does not return on hardware.
pub fn reboot<P: NvRegisters + SystemControl + ?Sized>(platform: &mut P, reason: RebootReason) {
    log::info!("rebooting: {:?}", reason);
    platform.store(REBOOT_REASON_SLOT, reason.marker());
    platform.reset();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakePlatform};

    #[test]
    fn test_chord_needs_all_three_bits() {
        assert!(is_reentry_chord(0x07));
        assert!(is_reentry_chord(0xFF));
        assert!(is_reentry_chord(0x0F));
        assert!(!is_reentry_chord(0x03));
        assert!(!is_reentry_chord(0x05));
        assert!(!is_reentry_chord(0x06));
        assert!(!is_reentry_chord(0x00));
    }

    #[test]
    fn test_markers() {
        assert_eq!(RebootReason::Bootloader.marker(), 100);
        assert_eq!(RebootReason::Dfu.marker(), 0xDF00AE01);
        assert_eq!(RebootReason::from_marker(100), Some(RebootReason::Bootloader));
        assert_eq!(RebootReason::from_marker(0xDF00AE01), Some(RebootReason::Dfu));
        assert_eq!(RebootReason::from_marker(0), None);
    }

    #[test]
    fn test_reboot_stores_then_resets() {
        let mut fake = FakePlatform::new();
        reboot(&mut fake, RebootReason::Dfu);
        assert_eq!(
            fake.calls(),
            &[Call::NvStore(REBOOT_REASON_SLOT, 0xDF00AE01), Call::Reset]
        );
    }
}
