//! Platform services the application consumes.
//!
//! The report logic only talks to hardware through these traits. The firmware
//! implements them with direct register access; tests use an in-memory fake.

use crate::pins::PinId;

/// Logic level of a digital output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// Digital pin access.
pub trait Gpio {
    /// Configure `pin` as a push-pull output, driving `level` immediately.
    fn configure_output(&mut self, pin: PinId, level: Level);

    /// Drive an already configured output.
    fn write(&mut self, pin: PinId, level: Level);

    /// Invert the current output level of `pin`.
    fn toggle(&mut self, pin: PinId);

    /// Return `pin` to its reset state (high-impedance input).
    fn release(&mut self, pin: PinId);
}

/// Small word-sized storage that survives a system reset.
pub trait NvRegisters {
    fn store(&mut self, slot: usize, value: u32);
}

pub trait SystemControl {
    /// Reset the whole device. On hardware this never returns.
    fn reset(&mut self);

    /// Human-readable cause of the last reset.
    fn reset_cause(&self) -> &'static str;
}

/// One-shot callout used for the indicator blink.
pub trait Scheduler {
    /// Arm (or re-arm) the callout to fire once after `ticks`.
    fn schedule_after(&mut self, ticks: u32);
}

/// Everything the application needs from the board.
pub trait Platform: Gpio + NvRegisters + SystemControl + Scheduler {}

impl<T: Gpio + NvRegisters + SystemControl + Scheduler> Platform for T {}
