//! Applies configuration bytes to physical pins.

use crate::config::{PinCommand, PinConfig};
use crate::pins::{PinBindings, Slot};
use crate::platform::{Gpio, Level};

/// Apply one configuration byte to the pin bound to `slot`.
///
/// Unknown bytes are a silent no-op; the pin keeps whatever state it had.
pub fn apply<G: Gpio + ?Sized>(gpio: &mut G, bindings: &PinBindings, slot: Slot, byte: u8) {
    let pin = bindings.physical_pin_for(slot);
    match PinCommand::decode(byte) {
        PinCommand::DriveLow => gpio.configure_output(pin, Level::Low),
        PinCommand::DriveHigh => gpio.configure_output(pin, Level::High),
        PinCommand::Release => gpio.release(pin),
        PinCommand::Ignore => {}
    }
}

/// Apply every slot of `config` in slot order.
pub fn apply_all<G: Gpio + ?Sized>(gpio: &mut G, bindings: &PinBindings, config: &PinConfig) {
    for slot in Slot::all() {
        apply(gpio, bindings, slot, config.byte(slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::PinId;
    use crate::testing::{test_bindings, Call, FakePlatform, PinState};

    fn slot(i: usize) -> Slot {
        Slot::new(i).unwrap()
    }

    #[test]
    fn test_drive_low_and_high() {
        let bindings = test_bindings();
        let mut fake = FakePlatform::new();

        apply(&mut fake, &bindings, slot(0), b'0');
        apply(&mut fake, &bindings, slot(1), b'1');

        assert_eq!(fake.pin(bindings.physical_pin_for(slot(0))), PinState::Output(Level::Low));
        assert_eq!(fake.pin(bindings.physical_pin_for(slot(1))), PinState::Output(Level::High));
    }

    #[test]
    fn test_release_is_the_only_action() {
        let bindings = test_bindings();
        let mut fake = FakePlatform::new();
        let pin = bindings.physical_pin_for(slot(3));

        apply(&mut fake, &bindings, slot(3), b'1');
        fake.clear_calls();
        apply(&mut fake, &bindings, slot(3), b'i');

        assert_eq!(fake.calls(), &[Call::Release(pin)]);
        assert_eq!(fake.pin(pin), PinState::Released);
    }

    #[test]
    fn test_unknown_byte_leaves_pin_alone() {
        let bindings = test_bindings();
        let mut fake = FakePlatform::new();
        let pin = bindings.physical_pin_for(slot(5));

        apply(&mut fake, &bindings, slot(5), b'1');
        fake.clear_calls();
        for byte in [b'x', b'I', 0, 1, 0xFF, b' '] {
            apply(&mut fake, &bindings, slot(5), byte);
        }

        assert!(fake.calls().is_empty());
        assert_eq!(fake.pin(pin), PinState::Output(Level::High));
    }

    #[test]
    fn test_apply_all_walks_slots_in_order() {
        let bindings = test_bindings();
        let mut fake = FakePlatform::new();
        let config = PinConfig::from_bytes(*b"10i?0000");

        apply_all(&mut fake, &bindings, &config);

        let pins: Vec<PinId> = fake
            .calls()
            .iter()
            .map(|c| match c {
                Call::ConfigureOutput(pin, _) | Call::Release(pin) => *pin,
                other => panic!("unexpected call {:?}", other),
            })
            .collect();
        let expected: Vec<PinId> = [0, 1, 2, 4, 5, 6, 7]
            .iter()
            .map(|&i| bindings.physical_pin_for(slot(i)))
            .collect();
        assert_eq!(pins, expected);
    }
}
