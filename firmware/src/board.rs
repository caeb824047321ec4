//! ATmega32U4 implementation of the platform services.
//!
//! GPIO goes straight to the PORTx/DDRx/PINx registers. Writing a one to a
//! PINx bit flips the matching PORTx bit in hardware, which gives a
//! single-instruction toggle.

use avr_device::atmega32u4::{PORTB, PORTC, PORTD, PORTE, PORTF, WDT};
use hid_gpio_core::{Gpio, Level, PinId};

use crate::config::{self, Port};
use crate::system::ResetFlags;
use crate::tick::Ticker;

pub struct Board {
    portb: PORTB,
    portc: PORTC,
    portd: PORTD,
    porte: PORTE,
    portf: PORTF,
    pub(crate) wdt: WDT,
    pub(crate) ticker: Ticker,
    pub(crate) reset_flags: ResetFlags,
}

/// Expand `$body` once per port with the three registers bound.
macro_rules! with_port {
    ($board:expr, $port:expr, |$ddr:ident, $out:ident, $pin:ident| $body:block) => {
        match $port {
            Port::B => {
                let ($ddr, $out, $pin) = (&$board.portb.ddrb, &$board.portb.portb, &$board.portb.pinb);
                $body
            }
            Port::C => {
                let ($ddr, $out, $pin) = (&$board.portc.ddrc, &$board.portc.portc, &$board.portc.pinc);
                $body
            }
            Port::D => {
                let ($ddr, $out, $pin) = (&$board.portd.ddrd, &$board.portd.portd, &$board.portd.pind);
                $body
            }
            Port::E => {
                let ($ddr, $out, $pin) = (&$board.porte.ddre, &$board.porte.porte, &$board.porte.pine);
                $body
            }
            Port::F => {
                let ($ddr, $out, $pin) = (&$board.portf.ddrf, &$board.portf.portf, &$board.portf.pinf);
                $body
            }
        }
    };
}

impl Board {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        portb: PORTB,
        portc: PORTC,
        portd: PORTD,
        porte: PORTE,
        portf: PORTF,
        wdt: WDT,
        ticker: Ticker,
        reset_flags: ResetFlags,
    ) -> Self {
        Self {
            portb,
            portc,
            portd,
            porte,
            portf,
            wdt,
            ticker,
            reset_flags,
        }
    }

    /// Bit mask and port for `pin`, or `None` for pins outside ports B..F.
    fn locate(pin: PinId) -> Option<(Port, u8)> {
        let located = config::split(pin).map(|(port, bit)| (port, 1u8 << bit));
        if located.is_none() {
            log::warn!("pin {} is not on this board", pin.0);
        }
        located
    }
}

impl Gpio for Board {
    fn configure_output(&mut self, pin: PinId, level: Level) {
        let Some((port, mask)) = Self::locate(pin) else {
            return;
        };
        with_port!(self, port, |ddr, out, _pin| {
            // Latch the level first so the pin never glitches to the old value.
            match level {
                Level::High => out.modify(|r, w| unsafe { w.bits(r.bits() | mask) }),
                Level::Low => out.modify(|r, w| unsafe { w.bits(r.bits() & !mask) }),
            }
            ddr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
        });
    }

    fn write(&mut self, pin: PinId, level: Level) {
        let Some((port, mask)) = Self::locate(pin) else {
            return;
        };
        with_port!(self, port, |_ddr, out, _pin| {
            match level {
                Level::High => out.modify(|r, w| unsafe { w.bits(r.bits() | mask) }),
                Level::Low => out.modify(|r, w| unsafe { w.bits(r.bits() & !mask) }),
            }
        });
    }

    fn toggle(&mut self, pin: PinId) {
        let Some((port, mask)) = Self::locate(pin) else {
            return;
        };
        with_port!(self, port, |_ddr, _out, input| {
            input.write(|w| unsafe { w.bits(mask) });
        });
    }

    fn release(&mut self, pin: PinId) {
        let Some((port, mask)) = Self::locate(pin) else {
            return;
        };
        // Input, pull-up off: high impedance.
        with_port!(self, port, |ddr, out, _pin| {
            ddr.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
            out.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
        });
    }
}
