//! HID GPIO firmware for ATmega32U4 (Teensy 2.0).
//!
//! Exposes eight GPIO lines to the host through a vendor HID feature report
//! and mirrors Num-Lock on the on-board LED, which otherwise blinks at a rate
//! that reflects the USB connection state.
//!
//! Everything runs from one polled loop: USB requests and the LED callout are
//! serviced one at a time and never preempt each other.

#![no_std]
#![no_main]
#![feature(asm_experimental_arch)]

mod board;
mod config;
mod system;
mod tick;
mod usb;

use avr_device::atmega32u4::Peripherals;
use hid_gpio_core::{Gpio, HidGpio, Indicator, Level};

use board::Board;
use tick::Ticker;
use usb::{UsbDevice, VendorCommand};

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Must come first: a watchdog reset leaves the watchdog running.
    let reset_flags = system::take_reset_flags(&dp.CPU, &dp.WDT);

    // Disable clock prescaler (CLKPR)
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) }); // Prescaler = 1

    if system::take_reboot_reason().is_some() {
        system::jump_to_bootloader(&dp);
    }

    let board = Board::new(
        dp.PORTB,
        dp.PORTC,
        dp.PORTD,
        dp.PORTE,
        dp.PORTF,
        dp.WDT,
        Ticker::new(dp.TC0),
        reset_flags,
    );
    let indicator = Indicator::new(config::LED_BLINK_PIN, config::TICKS_PER_SEC, config::BLINK_POLICY);
    let mut app = HidGpio::new(board, config::PIN_BINDINGS, indicator);

    app.platform_mut()
        .configure_output(config::LED_BLINK_PIN, Level::Low);

    let mut usb = UsbDevice::new(dp.USB_DEVICE, dp.PLL);
    usb.init();

    app.start();

    loop {
        if let Some(VendorCommand::RebootToDfu) = usb.poll(&mut app) {
            app.reboot_to_dfu();
        }

        if app.platform_mut().ticker.poll() {
            app.on_indicator_timer();
        }
    }
}
