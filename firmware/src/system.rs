//! Reset handling, reset cause, and the non-volatile reboot-reason slots.

use core::ptr::{addr_of, addr_of_mut};

use avr_device::atmega32u4::{Peripherals, CPU, WDT};
use hid_gpio_core::bootloader::REBOOT_REASON_SLOT;
use hid_gpio_core::{NvRegisters, RebootReason, SystemControl};

use crate::board::Board;

const NVREG_SLOTS: usize = 4;

/// Left alone by the C runtime start-up, so it survives a watchdog reset.
#[link_section = ".noinit"]
static mut NVREG: [u32; NVREG_SLOTS] = [0; NVREG_SLOTS];

// MCUSR bits
const PORF: u8 = 1 << 0;
const EXTRF: u8 = 1 << 1;
const BORF: u8 = 1 << 2;
const WDRF: u8 = 1 << 3;
const JTRF: u8 = 1 << 4;

// WDTCSR bits
const WDE: u8 = 1 << 3;
const WDCE: u8 = 1 << 4;

/// Snapshot of MCUSR taken at start-up.
#[derive(Copy, Clone)]
pub struct ResetFlags(u8);

impl ResetFlags {
    pub fn describe(self) -> &'static str {
        let flags = self.0;
        if flags & WDRF != 0 {
            "watchdog"
        } else if flags & BORF != 0 {
            "brown-out"
        } else if flags & EXTRF != 0 {
            "external"
        } else if flags & JTRF != 0 {
            "jtag"
        } else if flags & PORF != 0 {
            "power-on"
        } else {
            "unknown"
        }
    }
}

/// Read and clear MCUSR, then switch the watchdog off.
///
/// After a watchdog reset the watchdog stays armed; this must run before
/// anything slow.
pub fn take_reset_flags(cpu: &CPU, wdt: &WDT) -> ResetFlags {
    let flags = ResetFlags(cpu.mcusr.read().bits());
    cpu.mcusr.write(|w| unsafe { w.bits(0) });
    avr_device::interrupt::free(|_| {
        wdt.wdtcsr.write(|w| unsafe { w.bits(WDCE | WDE) });
        wdt.wdtcsr.write(|w| unsafe { w.bits(0) });
    });
    flags
}

/// Consume a reboot-reason marker left before the last reset.
pub fn take_reboot_reason() -> Option<RebootReason> {
    let marker = unsafe { core::ptr::read_volatile(addr_of!(NVREG[REBOOT_REASON_SLOT])) };
    let reason = RebootReason::from_marker(marker);
    if reason.is_some() {
        unsafe { core::ptr::write_volatile(addr_of_mut!(NVREG[REBOOT_REASON_SLOT]), 0) };
    }
    reason
}

impl NvRegisters for Board {
    fn store(&mut self, slot: usize, value: u32) {
        if slot >= NVREG_SLOTS {
            log::warn!("nvreg slot {} out of range", slot);
            return;
        }
        unsafe { core::ptr::write_volatile(addr_of_mut!(NVREG[slot]), value) };
    }
}

impl SystemControl for Board {
    /// Arm the watchdog at its shortest timeout (16 ms) and wait for it.
    fn reset(&mut self) {
        avr_device::interrupt::disable();
        self.wdt.wdtcsr.write(|w| unsafe { w.bits(WDCE | WDE) });
        self.wdt.wdtcsr.write(|w| unsafe { w.bits(WDE) });
        loop {}
    }

    fn reset_cause(&self) -> &'static str {
        self.reset_flags.describe()
    }
}

/// Hand the chip to the HalfKay bootloader at 0x7E00.
///
/// Runs at start-up, before USB is attached, so only the ports need to be
/// put back to their reset state.
pub fn jump_to_bootloader(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });

    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.ddrc.write(|w| unsafe { w.bits(0) });
    dp.PORTC.portc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });
    dp.PORTE.ddre.write(|w| unsafe { w.bits(0) });
    dp.PORTE.porte.write(|w| unsafe { w.bits(0) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0) });

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}
