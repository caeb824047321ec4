//! Register-level USB device driver for the ATmega32U4.
//!
//! Handles enumeration on endpoint 0 and turns HID class requests and bus
//! events into [`HidCallbacks`] calls. Everything is polled from the main
//! loop, so callbacks never overlap.

use avr_device::atmega32u4::{PLL, USB_DEVICE};
use hid_gpio_core::report::{self, HID_REPORT_DESCRIPTOR, MAX_CONTROL_REPORT_LEN};
use hid_gpio_core::{BusTracker, HidCallbacks, ReportType};

use crate::config;

const EP0_SIZE: u8 = 64;
const EP1_SIZE: u8 = 8;

const CONTROL_BUF_LEN: usize = MAX_CONTROL_REPORT_LEN;

// Standard requests (bmRequestType, bRequest)
const GET_STATUS: (u8, u8) = (0x80, 0x00);
const CLEAR_FEATURE: (u8, u8) = (0x00, 0x01);
const SET_FEATURE: (u8, u8) = (0x00, 0x03);
const SET_ADDRESS: (u8, u8) = (0x00, 0x05);
const GET_DESCRIPTOR: (u8, u8) = (0x80, 0x06);
const GET_CONFIGURATION: (u8, u8) = (0x80, 0x08);
const SET_CONFIGURATION: (u8, u8) = (0x00, 0x09);
const GET_INTERFACE_DESCRIPTOR: (u8, u8) = (0x81, 0x06);

// HID class requests
const HID_GET_REPORT: (u8, u8) = (0xA1, 0x01);
const HID_SET_REPORT: (u8, u8) = (0x21, 0x09);
const HID_SET_IDLE: (u8, u8) = (0x21, 0x0A);
const HID_SET_PROTOCOL: (u8, u8) = (0x21, 0x0B);

const VENDOR_REBOOT_TO_DFU: (u8, u8) = (0x40, 0xFF);

const FEATURE_DEVICE_REMOTE_WAKEUP: u8 = 1;

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    config::USB_VID as u8, (config::USB_VID >> 8) as u8, // idVendor
    config::USB_PID as u8, (config::USB_PID >> 8) as u8, // idProduct
    config::USB_RELEASE as u8, (config::USB_RELEASE >> 8) as u8, // bcdDevice
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0xA0, // bmAttributes (bus powered, remote wakeup)
    config::USB_MAX_POWER, // bMaxPower
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (none)
    0,    // bInterfaceProtocol (none)
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN, interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress (EP1 IN)
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    10,   // bInterval (10ms polling)
];

/// String descriptor 0 (language ID)
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

static STRING_DESC_1: [u8; string_len(config::MANUFACTURER)] = string_descriptor(config::MANUFACTURER);
static STRING_DESC_2: [u8; string_len(config::PRODUCT)] = string_descriptor(config::PRODUCT);

const fn string_len(s: &str) -> usize {
    2 + 2 * s.len()
}

/// UTF-16LE string descriptor from an ASCII string.
const fn string_descriptor<const N: usize>(s: &str) -> [u8; N] {
    let bytes = s.as_bytes();
    let mut desc = [0u8; N];
    desc[0] = N as u8;
    desc[1] = 3;
    let mut i = 0;
    while i < bytes.len() {
        desc[2 + 2 * i] = bytes[i];
        i += 1;
    }
    desc
}

/// Requests outside the HID report protocol that the main loop acts on.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum VendorCommand {
    RebootToDfu,
}

/// Decoded SETUP packet.
struct Setup {
    request_type: u8,
    request: u8,
    value_l: u8,
    value_h: u8,
    index_l: u8,
    length: u16,
}

pub struct UsbDevice {
    usb: USB_DEVICE,
    pll: PLL,
    bus: BusTracker,
}

impl UsbDevice {
    pub fn new(usb: USB_DEVICE, pll: PLL) -> Self {
        Self {
            usb,
            pll,
            bus: BusTracker::new(),
        }
    }

    /// Initialize the ATmega32U4 USB controller and attach to the bus.
    pub fn init(&mut self) {
        let usb = &self.usb;

        // Enable USB pad regulator
        usb.uhwcon.write(|w| w.uvrege().set_bit());

        // Enable USB controller and VBUS pad
        usb.usbcon
            .write(|w| w.usbe().set_bit().otgpade().set_bit().vbuste().set_bit());

        // 16MHz crystal -> 96MHz PLL -> 48MHz USB clock
        self.pll.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());
        while self.pll.pllcsr.read().plock().bit_is_clear() {}

        // Enable USB clock
        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        // Attach to bus (clear DETACH)
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        usb.udien
            .write(|w| w.eorste().set_bit().suspe().set_bit().wakeupe().set_bit());

        self.bus = BusTracker::new();
    }

    /// Service bus events and control requests. Call from the main loop.
    pub fn poll<A: HidCallbacks>(&mut self, app: &mut A) -> Option<VendorCommand> {
        if self.usb.usbint.read().vbusti().bit_is_set() {
            self.usb.usbint.modify(|_, w| w.vbusti().clear_bit());
            if self.usb.usbsta.read().vbus().bit_is_clear() {
                self.bus.vbus_lost(app);
            }
        }

        let udint = self.usb.udint.read();

        // End of reset
        if udint.eorsti().bit_is_set() {
            self.usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0();
            self.bus.bus_reset(app);
        }

        if udint.suspi().bit_is_set() {
            self.usb.udint.modify(|_, w| w.suspi().clear_bit());
            self.bus.suspend(app);
        }

        if udint.wakeupi().bit_is_set() {
            self.usb.udint.modify(|_, w| w.wakeupi().clear_bit());
            self.bus.wakeup(app);
        }

        // Check for SETUP packet on EP0
        self.select_endpoint(0);
        if self.usb.ueintx.read().rxstpi().bit_is_set() {
            return self.handle_setup(app);
        }

        None
    }

    fn configure_ep0(&self) {
        let usb = &self.usb;

        self.select_endpoint(0);
        // Enable EP0 as control endpoint, 64 bytes
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self) {
        let usb = &self.usb;

        self.select_endpoint(1);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt IN endpoint
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b000).alloc().set_bit());
        self.select_endpoint(0);
    }

    fn select_endpoint(&self, ep: u8) {
        self.usb.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn read_setup(&self) -> Setup {
        let usb = &self.usb;

        let request_type = usb.uedatx.read().bits();
        let request = usb.uedatx.read().bits();
        let value_l = usb.uedatx.read().bits();
        let value_h = usb.uedatx.read().bits();
        let index_l = usb.uedatx.read().bits();
        let _index_h = usb.uedatx.read().bits();
        let length_l = usb.uedatx.read().bits();
        let length_h = usb.uedatx.read().bits();

        // Acknowledge SETUP
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        Setup {
            request_type,
            request,
            value_l,
            value_h,
            index_l,
            length: (length_h as u16) << 8 | length_l as u16,
        }
    }

    fn handle_setup<A: HidCallbacks>(&mut self, app: &mut A) -> Option<VendorCommand> {
        let setup = self.read_setup();

        match (setup.request_type, setup.request) {
            GET_DESCRIPTOR => match setup.value_h {
                1 => self.send_control_in(&DEVICE_DESCRIPTOR, setup.length),
                2 => self.send_control_in(&CONFIG_DESCRIPTOR, setup.length),
                3 => match setup.value_l {
                    0 => self.send_control_in(&STRING_DESC_0, setup.length),
                    1 => self.send_control_in(&STRING_DESC_1, setup.length),
                    2 => self.send_control_in(&STRING_DESC_2, setup.length),
                    _ => self.stall(),
                },
                _ => self.stall(),
            },

            SET_ADDRESS => {
                // Send ZLP first, then set address
                self.send_zlp();
                while self.usb.ueintx.read().txini().bit_is_clear() {}
                self.usb
                    .udaddr
                    .write(|w| w.uadd().bits(setup.value_l & 0x7F).adden().set_bit());
            }

            SET_CONFIGURATION => {
                self.send_zlp();
                if setup.value_l != 0 {
                    self.configure_ep1();
                }
                self.bus.set_configuration(app, setup.value_l);
            }

            GET_CONFIGURATION => {
                let value = [self.bus.is_configured() as u8];
                self.send_control_in(&value, setup.length);
            }

            GET_STATUS => {
                let status = [(self.bus.remote_wakeup() as u8) << 1, 0];
                self.send_control_in(&status, setup.length);
            }

            SET_FEATURE | CLEAR_FEATURE if setup.value_l == FEATURE_DEVICE_REMOTE_WAKEUP => {
                self.bus.set_remote_wakeup(setup.request == SET_FEATURE.1);
                self.send_zlp();
            }

            GET_INTERFACE_DESCRIPTOR => match setup.value_h {
                0x22 => self.send_control_in(&HID_REPORT_DESCRIPTOR, setup.length),
                _ => self.stall(),
            },

            HID_SET_REPORT => self.set_report(app, &setup),

            HID_GET_REPORT => self.get_report(app, &setup),

            HID_SET_IDLE | HID_SET_PROTOCOL => self.send_zlp(),

            VENDOR_REBOOT_TO_DFU => {
                self.send_zlp();
                return Some(VendorCommand::RebootToDfu);
            }

            (request_type, request) => {
                log::debug!("stall {:02x}/{:02x}", request_type, request);
                self.stall();
            }
        }

        None
    }

    /// SET_REPORT: read the data stage and hand the payload over without the
    /// leading report ID byte.
    fn set_report<A: HidCallbacks>(&mut self, app: &mut A, setup: &Setup) {
        let report_id = setup.value_l;
        let report_type = ReportType::from(setup.value_h);

        // A truncated read would leave OUT packets queued on the pipe.
        if !report::set_report_fits(setup.length) {
            log::warn!("SET_REPORT of {} bytes too long", setup.length);
            self.stall();
            return;
        }

        let mut buf = [0u8; CONTROL_BUF_LEN];
        let received = self.receive_control_out(&mut buf[..setup.length as usize]);
        let payload = report::set_report_payload(report_id, &buf[..received]);

        // Status stage goes out first: the LED chord may reset the chip.
        self.send_zlp();
        app.on_set_report(setup.index_l, report_id, report_type, payload);
    }

    /// GET_REPORT: prefix the report ID, stall on an empty answer.
    fn get_report<A: HidCallbacks>(&mut self, app: &mut A, setup: &Setup) {
        let report_id = setup.value_l;
        let report_type = ReportType::from(setup.value_h);

        let mut buf = [0u8; CONTROL_BUF_LEN];
        let wanted = core::cmp::min(setup.length as usize, buf.len());
        let Some((header, body)) = report::get_report_frame(report_id, &mut buf[..wanted]) else {
            self.stall();
            return;
        };

        let written = app.on_get_report(setup.index_l, report_id, report_type, body);
        if written == 0 {
            self.stall();
            return;
        }
        self.send_control_in(&buf[..header + written], setup.length);
    }

    /// Read an OUT data stage into `buf`, stopping at a short packet.
    fn receive_control_out(&self, buf: &mut [u8]) -> usize {
        let usb = &self.usb;
        let mut received = 0;

        while received < buf.len() {
            while usb.ueintx.read().rxouti().bit_is_clear() {}

            let count = usb.uebclx.read().bits() as usize;
            for _ in 0..count {
                let byte = usb.uedatx.read().bits();
                if received < buf.len() {
                    buf[received] = byte;
                    received += 1;
                }
            }
            usb.ueintx.modify(|_, w| w.rxouti().clear_bit());

            if count < EP0_SIZE as usize {
                break;
            }
        }

        received
    }

    fn send_control_in(&self, data: &[u8], max_length: u16) {
        let usb = &self.usb;
        let len = core::cmp::min(data.len(), max_length as usize);
        let mut sent = 0;

        while sent < len {
            while usb.ueintx.read().txini().bit_is_clear() {}

            let chunk_end = core::cmp::min(sent + EP0_SIZE as usize, len);
            for &byte in &data[sent..chunk_end] {
                usb.uedatx.write(|w| w.bits(byte));
            }

            usb.ueintx.modify(|_, w| w.txini().clear_bit());
            sent = chunk_end;
        }

        // Wait for status stage (host sends ZLP)
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn send_zlp(&self) {
        self.usb.ueintx.modify(|_, w| w.txini().clear_bit());
    }

    fn stall(&self) {
        self.usb.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}
