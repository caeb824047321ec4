use std::time::Duration;

use anyhow::{bail, Context, Result};
use hid_gpio_core::bootloader::REENTRY_CHORD;
use hid_gpio_core::report::{PIN_CONFIG_REPORT_LEN, REPORT_ID_KEYBOARD_LEDS, REPORT_ID_PIN_CONFIG};
use hid_gpio_core::{PinConfig, ReportType, PIN_SLOTS};
use rusb::{DeviceHandle, GlobalContext};

/// HID class request codes.
const HID_GET_REPORT: u8 = 0x01;
const HID_SET_REPORT: u8 = 0x09;

/// bmRequestType: class, interface, host-to-device / device-to-host.
const REQUEST_TYPE_OUT: u8 = 0x21;
const REQUEST_TYPE_IN: u8 = 0xA1;

/// The firmware exposes a single HID interface.
const INTERFACE: u8 = 0;

/// Which device to talk to and how long to wait for it.
#[derive(Clone, Copy, Debug)]
pub struct Target {
    pub vid: u16,
    pub pid: u16,
    pub timeout: Duration,
}

/// wValue for GET_REPORT / SET_REPORT: report type high, report ID low.
pub fn report_value(report_type: ReportType, report_id: u8) -> u16 {
    (report_type as u16) << 8 | report_id as u16
}

/// Report bytes as sent on the wire: report ID first, then the payload.
pub fn encode_report(report_id: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(report_id);
    buf.extend_from_slice(payload);
    buf
}

/// Parse a GET_REPORT answer for the pin configuration report.
pub fn decode_pin_config(buf: &[u8]) -> Result<PinConfig> {
    if buf.len() != 1 + PIN_CONFIG_REPORT_LEN {
        bail!(
            "short pin configuration report: {} bytes, expected {}",
            buf.len(),
            1 + PIN_CONFIG_REPORT_LEN
        );
    }
    if buf[0] != REPORT_ID_PIN_CONFIG {
        bail!("unexpected report ID {} in answer", buf[0]);
    }
    let mut bytes = [0u8; PIN_SLOTS];
    bytes.copy_from_slice(&buf[1..]);
    Ok(PinConfig::from_bytes(bytes))
}

/// Whether a device with the target VID/PID is connected.
pub fn detect(target: &Target) -> Result<bool> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == target.vid && desc.product_id() == target.pid {
            return Ok(true);
        }
    }
    Ok(false)
}

pub struct HidGpioDevice {
    handle: DeviceHandle<GlobalContext>,
    timeout: Duration,
}

impl HidGpioDevice {
    /// Open the first matching device and claim its HID interface.
    pub fn open(target: &Target) -> Result<Self> {
        let mut handle = rusb::open_device_with_vid_pid(target.vid, target.pid).with_context(|| {
            format!(
                "HID GPIO device {:04X}:{:04X} not found (may need root/sudo or udev rules)",
                target.vid, target.pid
            )
        })?;

        // The kernel HID driver binds to the interface; borrow it for our requests.
        if rusb::supports_detach_kernel_driver() {
            handle
                .set_auto_detach_kernel_driver(true)
                .context("failed to enable kernel driver auto-detach")?;
        }
        handle
            .claim_interface(INTERFACE)
            .context("failed to claim HID interface")?;

        Ok(Self {
            handle,
            timeout: target.timeout,
        })
    }

    fn set_report(&self, report_type: ReportType, report_id: u8, payload: &[u8]) -> Result<()> {
        let value = report_value(report_type, report_id);
        let buf = encode_report(report_id, payload);
        log::debug!("SET_REPORT wValue=0x{:04X} data={:02X?}", value, buf);
        let written = self
            .handle
            .write_control(REQUEST_TYPE_OUT, HID_SET_REPORT, value, INTERFACE as u16, &buf, self.timeout)
            .context("SET_REPORT control transfer failed")?;
        if written != buf.len() {
            bail!("SET_REPORT wrote {} of {} bytes", written, buf.len());
        }
        Ok(())
    }

    fn get_report(&self, report_type: ReportType, report_id: u8, len: usize) -> Result<Vec<u8>> {
        let value = report_value(report_type, report_id);
        let mut buf = vec![0u8; 1 + len];
        let read = self
            .handle
            .read_control(REQUEST_TYPE_IN, HID_GET_REPORT, value, INTERFACE as u16, &mut buf, self.timeout)
            .context("GET_REPORT control transfer failed (device stalled?)")?;
        buf.truncate(read);
        log::debug!("GET_REPORT wValue=0x{:04X} data={:02X?}", value, buf);
        Ok(buf)
    }

    /// Apply a configuration to all eight pins.
    pub fn set_pins(&self, config: &PinConfig) -> Result<()> {
        self.set_report(ReportType::Feature, REPORT_ID_PIN_CONFIG, config.as_bytes())
    }

    /// Read back the last configuration the device accepted.
    pub fn get_pins(&self) -> Result<PinConfig> {
        let buf = self.get_report(ReportType::Feature, REPORT_ID_PIN_CONFIG, PIN_CONFIG_REPORT_LEN)?;
        decode_pin_config(&buf)
    }

    /// Send the keyboard LED output report.
    pub fn set_leds(&self, leds: u8) -> Result<()> {
        self.set_report(ReportType::Output, REPORT_ID_KEYBOARD_LEDS, &[leds])
    }

    /// Light Num, Caps and Scroll Lock together; the device resets into its
    /// bootloader.
    pub fn reboot_to_bootloader(&self) -> Result<()> {
        // The device may reset before the status stage completes
        if let Err(err) = self.set_leds(REENTRY_CHORD) {
            log::debug!("reboot request: {:#}", err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_value() {
        assert_eq!(report_value(ReportType::Feature, 5), 0x0305);
        assert_eq!(report_value(ReportType::Output, 1), 0x0201);
        assert_eq!(report_value(ReportType::Input, 0), 0x0100);
    }

    #[test]
    fn test_encode_prefixes_report_id() {
        let config: PinConfig = "01i-----".parse().unwrap();
        let buf = encode_report(REPORT_ID_PIN_CONFIG, config.as_bytes());
        assert_eq!(buf, b"\x0501i-----");
        assert_eq!(encode_report(REPORT_ID_KEYBOARD_LEDS, &[0x07]), vec![1, 7]);
    }

    #[test]
    fn test_decode_pin_config() {
        let config = decode_pin_config(b"\x0510i?0000").unwrap();
        assert_eq!(config.as_bytes(), b"10i?0000");
    }

    #[test]
    fn test_decode_rejects_short_answer() {
        assert!(decode_pin_config(b"\x050101").is_err());
        assert!(decode_pin_config(&[]).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_report_id() {
        assert!(decode_pin_config(b"\x0401010101").is_err());
    }
}
