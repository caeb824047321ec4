//! Build-time board configuration.
//!
//! Pins are encoded as `port * 8 + bit`. Edit the table below to rebind the
//! eight slots the host can drive.

use hid_gpio_core::{BlinkPolicy, PinBindings, PinId};

#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Port {
    B = 1,
    C = 2,
    D = 3,
    E = 4,
    F = 5,
}

impl Port {
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Port::B),
            2 => Some(Port::C),
            3 => Some(Port::D),
            4 => Some(Port::E),
            5 => Some(Port::F),
            _ => None,
        }
    }
}

pub const fn pin(port: Port, bit: u8) -> PinId {
    PinId((port as u8) * 8 + (bit & 0x07))
}

pub const fn split(pin: PinId) -> Option<(Port, u8)> {
    match Port::from_index(pin.0 / 8) {
        Some(port) => Some((port, pin.0 % 8)),
        None => None,
    }
}

/// HID_GPIO_PIN0..7: Teensy 2.0 pins B0..B3, B7, D0..D2.
pub const PIN_BINDINGS: PinBindings = PinBindings::new([
    pin(Port::B, 0),
    pin(Port::B, 1),
    pin(Port::B, 2),
    pin(Port::B, 3),
    pin(Port::B, 7),
    pin(Port::D, 0),
    pin(Port::D, 1),
    pin(Port::D, 2),
]);

/// On-board LED (PD6).
pub const LED_BLINK_PIN: PinId = pin(Port::D, 6);

/// The main loop tick runs at 1 kHz; one blink unit is one second.
pub const TICKS_PER_SEC: u32 = 1000;

pub const BLINK_POLICY: BlinkPolicy = BlinkPolicy::StateDependent;

pub const USB_VID: u16 = hid_gpio_core::USB_VID;
pub const USB_PID: u16 = hid_gpio_core::USB_PID;
pub const USB_RELEASE: u16 = 0x0100;
/// bMaxPower in 2 mA units.
pub const USB_MAX_POWER: u8 = 50;

pub const MANUFACTURER: &str = "hid-gpio";
pub const PRODUCT: &str = "HID GPIO";
