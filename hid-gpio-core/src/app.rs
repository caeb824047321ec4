//! Application context: the report dispatcher and connection tracking.
//!
//! All mutable state lives here and is handed to the USB stack explicitly.
//! Every entry point runs to completion on the single event context.

use crate::bootloader::{self, RebootReason};
use crate::config::PinConfig;
use crate::connection::{BusEvent, ConnectionState, Indicator};
use crate::interpreter;
use crate::pins::{PinBindings, PIN_SLOTS};
use crate::platform::{Level, Platform};
use crate::report::{
    HidCallbacks, ReportType, PIN_CONFIG_REPORT_LEN, REPORT_ID_KEYBOARD_LEDS,
    REPORT_ID_PIN_CONFIG,
};

pub struct HidGpio<P> {
    platform: P,
    bindings: PinBindings,
    indicator: Indicator,
    config: PinConfig,
    state: ConnectionState,
}

impl<P: Platform> HidGpio<P> {
    pub fn new(platform: P, bindings: PinBindings, indicator: Indicator) -> Self {
        Self {
            platform,
            bindings,
            indicator,
            config: PinConfig::new(),
            state: ConnectionState::Reset,
        }
    }

    /// Log the start-up banner and arm the indicator callout.
    pub fn start(&mut self) {
        log::info!("HID GPIO started");
        log::info!("reset reason {}", self.platform.reset_cause());
        self.indicator.start(&mut self.platform, self.state);
    }

    /// Indicator callout expired.
    pub fn on_indicator_timer(&mut self) {
        self.indicator.fire(&mut self.platform, self.state);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    pub fn pin_config(&self) -> &PinConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Leave a DFU marker and reset. Not reachable from any report.
    pub fn reboot_to_dfu(&mut self) {
        bootloader::reboot(&mut self.platform, RebootReason::Dfu);
    }

    fn bus_event(&mut self, event: BusEvent) {
        let next = self.state.on_event(event);
        log::debug!("bus {:?}: {:?} -> {:?}", event, self.state, next);
        self.state = next;
    }

    fn set_keyboard_leds(&mut self, payload: &[u8]) {
        let Some(&leds) = payload.first() else {
            return;
        };

        let level = Level::from_bit(leds & bootloader::LED_NUM_LOCK != 0);
        self.platform.write(self.indicator.pin(), level);

        if bootloader::is_reentry_chord(leds) {
            bootloader::reboot(&mut self.platform, RebootReason::Bootloader);
        }
    }

    fn set_pin_config(&mut self, payload: &[u8]) {
        let Some(bytes) = payload.get(..PIN_SLOTS) else {
            log::warn!("pin config report too short: {} bytes", payload.len());
            return;
        };

        let mut raw = [0u8; PIN_SLOTS];
        raw.copy_from_slice(bytes);
        self.config.overwrite(raw);
        interpreter::apply_all(&mut self.platform, &self.bindings, &self.config);
        log::debug!("pins {}", self.config);
    }
}

impl<P: Platform> HidCallbacks for HidGpio<P> {
    fn on_mount(&mut self) {
        self.bus_event(BusEvent::Mount);
    }

    fn on_unmount(&mut self) {
        self.bus_event(BusEvent::Unmount);
    }

    fn on_suspend(&mut self, remote_wakeup_enabled: bool) {
        self.bus_event(BusEvent::Suspend {
            remote_wakeup_enabled,
        });
    }

    fn on_resume(&mut self) {
        self.bus_event(BusEvent::Resume);
    }

    fn on_set_report(&mut self, _interface: u8, report_id: u8, report_type: ReportType, payload: &[u8]) {
        log::debug!("set_report {}, {:?}", report_id, report_type);

        match (report_id, report_type) {
            (REPORT_ID_KEYBOARD_LEDS, _) => self.set_keyboard_leds(payload),
            (REPORT_ID_PIN_CONFIG, ReportType::Feature) => self.set_pin_config(payload),
            _ => {}
        }
    }

    fn on_get_report(
        &mut self,
        _interface: u8,
        report_id: u8,
        _report_type: ReportType,
        buffer: &mut [u8],
    ) -> usize {
        if report_id == REPORT_ID_PIN_CONFIG && buffer.len() == PIN_CONFIG_REPORT_LEN {
            buffer.copy_from_slice(self.config.as_bytes());
            PIN_CONFIG_REPORT_LEN
        } else {
            0
        }
    }
}
