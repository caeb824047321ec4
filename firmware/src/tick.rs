//! 1 kHz tick from Timer0 and the one-shot indicator callout.
//!
//! Timer0 runs in CTC mode and is polled from the main loop; nothing here
//! uses interrupts.

use avr_device::atmega32u4::TC0;
use hid_gpio_core::Scheduler;

use crate::board::Board;

/// 16 MHz / 64 / 250 = 1 kHz.
const PRESCALE_64: u8 = 0x03;
const CTC_MODE: u8 = 0x02;
const COMPARE_TOP: u8 = 249;

pub struct Ticker {
    tc0: TC0,
    now: u32,
    deadline: Option<u32>,
}

impl Ticker {
    pub fn new(tc0: TC0) -> Self {
        tc0.tccr0a.write(|w| unsafe { w.bits(CTC_MODE) });
        tc0.ocr0a.write(|w| unsafe { w.bits(COMPARE_TOP) });
        tc0.tcnt0.write(|w| unsafe { w.bits(0) });
        tc0.tccr0b.write(|w| unsafe { w.bits(PRESCALE_64) });
        Self {
            tc0,
            now: 0,
            deadline: None,
        }
    }

    fn arm(&mut self, ticks: u32) {
        self.deadline = Some(self.now.wrapping_add(ticks));
    }

    /// Advance the tick count and report whether the callout is due.
    /// A due callout is disarmed; its handler re-arms it.
    pub fn poll(&mut self) -> bool {
        if self.tc0.tifr0.read().ocf0a().bit_is_set() {
            // Flag clears by writing a one.
            self.tc0.tifr0.write(|w| w.ocf0a().set_bit());
            self.now = self.now.wrapping_add(1);
        }

        match self.deadline {
            Some(deadline) if self.now.wrapping_sub(deadline) as i32 >= 0 => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Scheduler for Board {
    fn schedule_after(&mut self, ticks: u32) {
        self.ticker.arm(ticks);
    }
}
