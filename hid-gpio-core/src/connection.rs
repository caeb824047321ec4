//! USB connection lifecycle and the status indicator blink.
//!
//! The state only changes on bus events from the USB stack. Every event is
//! accepted in every state. The indicator callout toggles the LED and
//! re-arms itself with a period picked from the current state.

use crate::pins::PinId;
use crate::platform::{Gpio, Scheduler};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Reset,
    Running,
    Suspended,
}

/// Bus lifecycle notifications from the USB stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Mount,
    Unmount,
    Suspend { remote_wakeup_enabled: bool },
    Resume,
}

impl ConnectionState {
    /// Unconditional transition for `event`.
    pub const fn on_event(self, event: BusEvent) -> Self {
        match event {
            BusEvent::Mount | BusEvent::Resume => ConnectionState::Running,
            BusEvent::Unmount => ConnectionState::Reset,
            BusEvent::Suspend { .. } => ConnectionState::Suspended,
        }
    }
}

/// How the indicator callout picks its next period.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlinkPolicy {
    /// Period follows the connection state (5/1/3 units).
    StateDependent,
    /// Always re-arm with the running period, whatever the state.
    Constant,
}

/// Blink periods in time units.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlinkPeriods {
    pub reset: u32,
    pub running: u32,
    pub suspended: u32,
}

impl BlinkPeriods {
    pub const DEFAULT: Self = Self {
        reset: 5,
        running: 1,
        suspended: 3,
    };

    pub const fn for_state(&self, state: ConnectionState) -> u32 {
        match state {
            ConnectionState::Reset => self.reset,
            ConnectionState::Running => self.running,
            ConnectionState::Suspended => self.suspended,
        }
    }
}

impl Default for BlinkPeriods {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Status LED driven by a recurring one-shot callout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Indicator {
    pin: PinId,
    ticks_per_unit: u32,
    policy: BlinkPolicy,
    periods: BlinkPeriods,
}

impl Indicator {
    pub const fn new(pin: PinId, ticks_per_unit: u32, policy: BlinkPolicy) -> Self {
        Self {
            pin,
            ticks_per_unit,
            policy,
            periods: BlinkPeriods::DEFAULT,
        }
    }

    pub fn with_periods(mut self, periods: BlinkPeriods) -> Self {
        self.periods = periods;
        self
    }

    pub const fn pin(&self) -> PinId {
        self.pin
    }

    pub const fn policy(&self) -> BlinkPolicy {
        self.policy
    }

    /// Initial arm; always uses the period of the state passed in.
    pub fn start<P: Scheduler + ?Sized>(&self, platform: &mut P, state: ConnectionState) {
        platform.schedule_after(self.periods.for_state(state).saturating_mul(self.ticks_per_unit));
    }

    /// Callout body: toggle the LED, then re-arm.
    pub fn fire<P: Gpio + Scheduler + ?Sized>(&self, platform: &mut P, state: ConnectionState) {
        platform.toggle(self.pin);
        platform.schedule_after(self.rearm_ticks(state));
    }

    pub const fn rearm_ticks(&self, state: ConnectionState) -> u32 {
        let units = match self.policy {
            BlinkPolicy::StateDependent => self.periods.for_state(state),
            BlinkPolicy::Constant => self.periods.running,
        };
        units.saturating_mul(self.ticks_per_unit)
    }
}
