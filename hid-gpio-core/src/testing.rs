//! In-memory platform used by the unit tests.

use std::collections::HashMap;

use crate::pins::{PinBindings, PinId};
use crate::platform::{Gpio, Level, NvRegisters, Scheduler, SystemControl};

/// Electrical state of a fake pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinState {
    /// Never touched since power-on.
    Untouched,
    Output(Level),
    Released,
}

/// Every platform call, in the order it happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ConfigureOutput(PinId, Level),
    Write(PinId, Level),
    Toggle(PinId),
    Release(PinId),
    NvStore(usize, u32),
    Reset,
    Schedule(u32),
}

#[derive(Default)]
pub struct FakePlatform {
    pins: HashMap<PinId, PinState>,
    nvreg: HashMap<usize, u32>,
    calls: Vec<Call>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(&self, pin: PinId) -> PinState {
        self.pins.get(&pin).copied().unwrap_or(PinState::Untouched)
    }

    pub fn nvreg(&self, slot: usize) -> Option<u32> {
        self.nvreg.get(&slot).copied()
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn resets(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Reset).count()
    }

    /// Ticks passed to the most recent `schedule_after`.
    pub fn last_schedule(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Schedule(ticks) => Some(*ticks),
            _ => None,
        })
    }
}

impl Gpio for FakePlatform {
    fn configure_output(&mut self, pin: PinId, level: Level) {
        self.calls.push(Call::ConfigureOutput(pin, level));
        self.pins.insert(pin, PinState::Output(level));
    }

    fn write(&mut self, pin: PinId, level: Level) {
        self.calls.push(Call::Write(pin, level));
        self.pins.insert(pin, PinState::Output(level));
    }

    fn toggle(&mut self, pin: PinId) {
        self.calls.push(Call::Toggle(pin));
        let next = match self.pin(pin) {
            PinState::Output(level) => level.toggled(),
            _ => Level::High,
        };
        self.pins.insert(pin, PinState::Output(next));
    }

    fn release(&mut self, pin: PinId) {
        self.calls.push(Call::Release(pin));
        self.pins.insert(pin, PinState::Released);
    }
}

impl NvRegisters for FakePlatform {
    fn store(&mut self, slot: usize, value: u32) {
        self.calls.push(Call::NvStore(slot, value));
        self.nvreg.insert(slot, value);
    }
}

impl SystemControl for FakePlatform {
    fn reset(&mut self) {
        self.calls.push(Call::Reset);
    }

    fn reset_cause(&self) -> &'static str {
        "power-on"
    }
}

impl Scheduler for FakePlatform {
    fn schedule_after(&mut self, ticks: u32) {
        self.calls.push(Call::Schedule(ticks));
    }
}

pub const TEST_LED: PinId = PinId(0x1E);

pub fn test_bindings() -> PinBindings {
    PinBindings::new([
        PinId(0x08),
        PinId(0x09),
        PinId(0x0A),
        PinId(0x0B),
        PinId(0x1A),
        PinId(0x1B),
        PinId(0x2C),
        PinId(0x2D),
    ])
}
