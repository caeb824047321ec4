//! Pin configuration bytes and the last-applied configuration snapshot.
//!
//! Each slot is driven by one character-coded byte:
//! - `'0'` drive low (pin becomes an output)
//! - `'1'` drive high (pin becomes an output)
//! - `'i'` release the pin back to its input state
//! - anything else leaves the pin alone
//!
//! The raw bytes are kept as received, valid or not, so the host reads back
//! exactly what it wrote.

use core::fmt;
use core::str::FromStr;

use thiserror::Error;

use crate::pins::{Slot, PIN_SLOTS};

/// Decoded action for a single configuration byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinCommand {
    DriveLow,
    DriveHigh,
    Release,
    Ignore,
}

impl PinCommand {
    pub const fn decode(byte: u8) -> Self {
        match byte {
            b'0' => PinCommand::DriveLow,
            b'1' => PinCommand::DriveHigh,
            b'i' => PinCommand::Release,
            _ => PinCommand::Ignore,
        }
    }
}

/// Error parsing the text form of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("expected {expected} configuration characters, got {found}")]
    Length { expected: usize, found: usize },
    #[error("non-ASCII character in slot {slot}")]
    NonAscii { slot: usize },
}

/// The last 8-byte configuration received for the pin feature report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PinConfig {
    bytes: [u8; PIN_SLOTS],
}

impl PinConfig {
    /// Zeroed until the host writes the first configuration.
    pub const fn new() -> Self {
        Self {
            bytes: [0; PIN_SLOTS],
        }
    }

    pub const fn from_bytes(bytes: [u8; PIN_SLOTS]) -> Self {
        Self { bytes }
    }

    pub const fn as_bytes(&self) -> &[u8; PIN_SLOTS] {
        &self.bytes
    }

    /// Replace the whole snapshot.
    pub fn overwrite(&mut self, bytes: [u8; PIN_SLOTS]) {
        self.bytes = bytes;
    }

    pub const fn byte(&self, slot: Slot) -> u8 {
        self.bytes[slot.index()]
    }

    /// Per-slot commands in slot order.
    pub fn commands(&self) -> impl Iterator<Item = (Slot, PinCommand)> + '_ {
        Slot::all().map(move |slot| (slot, PinCommand::decode(self.byte(slot))))
    }
}

impl FromStr for PinConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let found = s.chars().count();
        if found != PIN_SLOTS {
            return Err(ConfigError::Length {
                expected: PIN_SLOTS,
                found,
            });
        }

        let mut bytes = [0u8; PIN_SLOTS];
        for (slot, ch) in s.chars().enumerate() {
            if !ch.is_ascii() {
                return Err(ConfigError::NonAscii { slot });
            }
            bytes[slot] = ch as u8;
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for PinConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.bytes {
            let ch = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_table() {
        assert_eq!(PinCommand::decode(b'0'), PinCommand::DriveLow);
        assert_eq!(PinCommand::decode(b'1'), PinCommand::DriveHigh);
        assert_eq!(PinCommand::decode(b'i'), PinCommand::Release);
        assert_eq!(PinCommand::decode(b'I'), PinCommand::Ignore);
        assert_eq!(PinCommand::decode(0), PinCommand::Ignore);
        assert_eq!(PinCommand::decode(1), PinCommand::Ignore);
    }

    #[test]
    fn test_parse_text_form() {
        let config: PinConfig = "01i-x10i".parse().unwrap();
        assert_eq!(config.as_bytes(), b"01i-x10i");

        let commands: Vec<PinCommand> = config.commands().map(|(_, c)| c).collect();
        assert_eq!(
            commands,
            [
                PinCommand::DriveLow,
                PinCommand::DriveHigh,
                PinCommand::Release,
                PinCommand::Ignore,
                PinCommand::Ignore,
                PinCommand::DriveHigh,
                PinCommand::DriveLow,
                PinCommand::Release,
            ]
        );
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(
            "0101".parse::<PinConfig>(),
            Err(ConfigError::Length {
                expected: 8,
                found: 4
            })
        );
        assert_eq!(
            "010101010".parse::<PinConfig>(),
            Err(ConfigError::Length {
                expected: 8,
                found: 9
            })
        );
    }

    #[test]
    fn test_parse_rejects_non_ascii() {
        assert_eq!(
            "0101010é".parse::<PinConfig>(),
            Err(ConfigError::NonAscii { slot: 7 })
        );
    }

    #[test]
    fn test_display_masks_unprintable_bytes() {
        let config = PinConfig::from_bytes([b'0', b'1', 0, 0xFF, b'i', b' ', b'-', 0x7F]);
        assert_eq!(config.to_string(), "01..i.-.");
        assert_eq!(PinConfig::new().to_string(), "........");
    }
}
