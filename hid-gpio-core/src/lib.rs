//! Report protocol and pin state for a USB HID GPIO device.
//!
//! The host drives up to eight GPIO lines through a vendor feature report and
//! a status LED through the keyboard LED report. This crate holds that logic
//! behind small platform traits so it runs unchanged on the AVR firmware and
//! in host-side tests. It is also shared with the host CLI for report IDs and
//! the text form of a configuration.

#![cfg_attr(not(test), no_std)]

pub mod app;
pub mod bootloader;
pub mod bus;
pub mod config;
pub mod connection;
pub mod interpreter;
pub mod pins;
pub mod platform;
pub mod report;

#[cfg(test)]
mod testing;

/// USB vendor ID the firmware enumerates with (shared VOTI range).
pub const USB_VID: u16 = 0x16C0;
/// USB product ID the firmware enumerates with.
pub const USB_PID: u16 = 0x05DF;

pub use app::HidGpio;
pub use bootloader::RebootReason;
pub use bus::BusTracker;
pub use config::{ConfigError, PinCommand, PinConfig};
pub use connection::{BlinkPolicy, BusEvent, ConnectionState, Indicator};
pub use pins::{PinBindings, PinId, Slot, PIN_SLOTS};
pub use platform::{Gpio, Level, NvRegisters, Platform, Scheduler, SystemControl};
pub use report::{HidCallbacks, ReportType};
