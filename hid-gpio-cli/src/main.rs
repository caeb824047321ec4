mod device;

use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hid_gpio_core::bootloader::LED_NUM_LOCK;
use hid_gpio_core::PinConfig;
use indicatif::{ProgressBar, ProgressStyle};

use device::{HidGpioDevice, Target};

#[derive(Parser)]
#[command(name = "hid-gpio-cli")]
#[command(about = "Drive the GPIO lines of a HID GPIO device")]
struct Cli {
    /// USB vendor ID (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x16C0", value_parser = parse_u16, global = true)]
    vid: u16,

    /// USB product ID (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0x05DF", value_parser = parse_u16, global = true)]
    pid: u16,

    /// Control transfer timeout in milliseconds
    #[arg(long, default_value_t = 2000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether the device is connected
    Detect,
    /// Configure all eight pins, one character per pin:
    /// '0' low, '1' high, 'i' release, anything else leaves the pin alone
    Set {
        /// Eight characters, e.g. 01i-----
        config: PinConfig,
    },
    /// Print the configuration the device last accepted
    Get,
    /// Drive the status LED through the Num-Lock bit
    Led {
        #[arg(value_enum)]
        state: LedState,
    },
    /// Reboot the device into its bootloader
    Bootloader {
        /// Wait until the device has left the bus
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LedState {
    On,
    Off,
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid USB ID '{}': {}", s, e))
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let target = Target {
        vid: cli.vid,
        pid: cli.pid,
        timeout: Duration::from_millis(cli.timeout_ms),
    };

    match cli.command {
        Command::Detect => {
            if device::detect(&target)? {
                println!("HID GPIO device {:04X}:{:04X} detected.", target.vid, target.pid);
            } else {
                println!("HID GPIO device {:04X}:{:04X} not detected.", target.vid, target.pid);
            }
        }
        Command::Set { config } => {
            let dev = HidGpioDevice::open(&target)?;
            dev.set_pins(&config).context("setting pin configuration")?;
            println!("Pins set to {}", config);
        }
        Command::Get => {
            let dev = HidGpioDevice::open(&target)?;
            let config = dev.get_pins().context("reading pin configuration")?;
            println!("{}", config);
        }
        Command::Led { state } => {
            let dev = HidGpioDevice::open(&target)?;
            let leds = match state {
                LedState::On => LED_NUM_LOCK,
                LedState::Off => 0,
            };
            dev.set_leds(leds).context("writing LED report")?;
        }
        Command::Bootloader { wait } => {
            let dev = HidGpioDevice::open(&target)?;
            dev.reboot_to_bootloader()?;
            drop(dev);
            println!("Rebooting device into bootloader...");
            if wait {
                wait_for_departure(&target)?;
            }
        }
    }

    Ok(())
}

/// Poll the bus until the device disappears, for up to five seconds.
fn wait_for_departure(target: &Target) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.set_message("Waiting for device to leave the bus");
    spinner.enable_steady_tick(Duration::from_millis(100));

    for _ in 0..50 {
        thread::sleep(Duration::from_millis(100));
        if !device::detect(target)? {
            spinner.finish_with_message("Device left the bus");
            return Ok(());
        }
    }

    spinner.abandon_with_message("Device still present");
    bail!("device did not reboot; check that the firmware is running");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u16() {
        assert_eq!(parse_u16("0x16C0"), Ok(0x16C0));
        assert_eq!(parse_u16("0X05df"), Ok(0x05DF));
        assert_eq!(parse_u16("1234"), Ok(1234));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u16("zz").is_err());
    }

    #[test]
    fn test_cli_parses_set() {
        let cli = Cli::try_parse_from(["hid-gpio-cli", "set", "01i-----"]).unwrap();
        match cli.command {
            Command::Set { config } => assert_eq!(config.as_bytes(), b"01i-----"),
            _ => panic!("expected set"),
        }
        assert_eq!(cli.vid, hid_gpio_core::USB_VID);
        assert_eq!(cli.pid, hid_gpio_core::USB_PID);
    }

    #[test]
    fn test_cli_rejects_bad_config() {
        assert!(Cli::try_parse_from(["hid-gpio-cli", "set", "0101"]).is_err());
    }

    #[test]
    fn test_cli_global_ids() {
        let cli = Cli::try_parse_from(["hid-gpio-cli", "get", "--vid", "0x1234", "--pid", "42"]).unwrap();
        assert_eq!(cli.vid, 0x1234);
        assert_eq!(cli.pid, 42);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
