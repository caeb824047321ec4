//! HID report identifiers, report types, the report descriptor, and the
//! callback contract the USB stack drives.

/// Keyboard LED output report (boot keyboard semantics).
pub const REPORT_ID_KEYBOARD_LEDS: u8 = 1;
/// Vendor feature report carrying one configuration byte per pin slot.
pub const REPORT_ID_PIN_CONFIG: u8 = 5;
/// Payload length of the pin configuration report, report ID excluded.
pub const PIN_CONFIG_REPORT_LEN: usize = 8;

/// Largest report data stage handled on the control pipe, report ID included.
pub const MAX_CONTROL_REPORT_LEN: usize = 64;

/// HID report type, as carried in the high byte of wValue.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ReportType {
    Invalid = 0,
    Input = 1,
    Output = 2,
    Feature = 3,
}

impl From<u8> for ReportType {
    fn from(value: u8) -> Self {
        match value {
            1 => ReportType::Input,
            2 => ReportType::Output,
            3 => ReportType::Feature,
            _ => ReportType::Invalid,
        }
    }
}

/// Callbacks invoked by the USB device stack, one at a time, from the
/// application's single event context.
pub trait HidCallbacks {
    fn on_mount(&mut self);
    fn on_unmount(&mut self);
    fn on_suspend(&mut self, remote_wakeup_enabled: bool);
    fn on_resume(&mut self);

    /// SET_REPORT, or data received on an OUT endpoint.
    fn on_set_report(&mut self, interface: u8, report_id: u8, report_type: ReportType, payload: &[u8]);

    /// GET_REPORT. `buffer.len()` is the length the host requested.
    ///
    /// Returns the number of bytes written. Zero tells the stack to STALL.
    fn on_get_report(
        &mut self,
        interface: u8,
        report_id: u8,
        report_type: ReportType,
        buffer: &mut [u8],
    ) -> usize;
}

/// Whether a SET_REPORT data stage of `length` bytes can be received whole.
/// Anything longer must be stalled, not truncated.
pub fn set_report_fits(length: u16) -> bool {
    length as usize <= MAX_CONTROL_REPORT_LEN
}

/// Payload of a SET_REPORT data stage. With a non-zero report ID the host
/// always sends the ID as the first byte.
pub fn set_report_payload(report_id: u8, data: &[u8]) -> &[u8] {
    if report_id == 0 {
        return data;
    }
    data.get(1..).unwrap_or(&[])
}

/// Lay out a GET_REPORT answer in `buf`, sized to the host's wLength.
///
/// Writes the report ID prefix and returns the header length together with
/// the body for the dispatcher to fill, so wLength 9 becomes a requested
/// length of 8. `None` when wLength leaves no room for the ID.
pub fn get_report_frame(report_id: u8, buf: &mut [u8]) -> Option<(usize, &mut [u8])> {
    if report_id == 0 {
        return Some((0, buf));
    }
    let (id, body) = buf.split_first_mut()?;
    *id = report_id;
    Some((1, body))
}

/// Report descriptor: a keyboard LED output report (ID 1) and an 8-byte
/// vendor feature report (ID 5).
pub static HID_REPORT_DESCRIPTOR: [u8; 52] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_KEYBOARD_LEDS, //   Report ID (1)
    // LEDs: Num | Caps | Scroll | Compose | Kana
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    // LED padding (3 bits)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    0xC0, // End Collection
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x00, // Usage (0)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_PIN_CONFIG, //   Report ID (5)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, //   Logical Maximum (255)
    0x95, PIN_CONFIG_REPORT_LEN as u8, //   Report Count (8)
    0x75, 0x08, //   Report Size (8)
    0xB1, 0x00, //   Feature (Data, Array, Absolute)
    0xC0, // End Collection
];
