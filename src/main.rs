use anyhow::Context;
use argh::FromArgs;
use scaictl::{
    acpi_call::{AcpiCall, DEFAULT_DEVICE, DEFAULT_PATH},
    settings::{self, Backlight, Setting},
    Firmware, Session,
};

/// scaictl - control Samsung Galaxy Book firmware features
#[derive(Debug, FromArgs)]
struct Args {
    /// ACPI path of the SCAI device [default=\_SB.PCI0.LPCB.SCAI]
    #[argh(option, default = "DEFAULT_DEVICE.to_string()")]
    device: String,

    /// path of the acpi_call control file [default=/proc/acpi/call]
    #[argh(option, default = "DEFAULT_PATH.to_string()")]
    acpi_call: String,

    #[argh(subcommand)]
    command: Command,
}

#[derive(Debug, FromArgs)]
#[argh(subcommand)]
enum Command {
    Status(Status),
    Get(Get),
    Set(Set),
    Backlight(BacklightCmd),
    Notify(Notify),
}

/// show all settings
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "status")]
struct Status {}

/// read a setting (battery_life_extender, autoboot, webcam_enable, perf_mode)
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "get")]
struct Get {
    /// setting name
    #[argh(positional)]
    setting: Setting,
}

/// write a setting
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "set")]
struct Set {
    /// setting name
    #[argh(positional)]
    setting: Setting,

    /// new value
    #[argh(positional)]
    value: String,
}

/// read or set the keyboard backlight level (0-3)
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "backlight")]
struct BacklightCmd {
    /// new brightness level
    #[argh(positional)]
    level: Option<u8>,
}

/// forward a raw event code to the firmware
#[derive(Debug, FromArgs)]
#[argh(subcommand, name = "notify")]
struct Notify {
    /// event code, decimal or 0x-prefixed hex
    #[argh(positional, from_str_fn(parse_event))]
    event: u32,
}

fn parse_event(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid event code {s}: {e}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module(
            env!("CARGO_PKG_NAME"),
            if cfg!(debug_assertions) {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        )
        .init();

    let args: Args = argh::from_env();
    log::debug!("args={:?}", args);

    if !nix::unistd::geteuid().is_root() {
        log::warn!(
            "not running as root; {} is normally only writable by root",
            args.acpi_call
        );
    }

    let firmware = AcpiCall::open(&args.acpi_call, &args.device)
        .with_context(|| format!("failed to open {}", args.acpi_call))?;
    let session = Session::attach(firmware)
        .with_context(|| format!("failed to attach to SCAI device {}", args.device))?;

    let result = run(&session, args.command);
    session.detach();
    result
}

fn run<F: Firmware>(session: &Session<F>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Status(Status {}) => {
            let led = Backlight::new(session);
            match led.brightness() {
                Ok(level) => println!(
                    "kbd_backlight: {level}/{}",
                    Backlight::<F>::MAX_BRIGHTNESS
                ),
                Err(e) => println!("kbd_backlight: <{e}>"),
            }
            for setting in Setting::ALL {
                match setting.read(session) {
                    Ok(value) => println!("{setting}: {value}"),
                    Err(e) => println!("{setting}: <{e}>"),
                }
            }
            println!("supported perf_mode: {}", session.performance_modes());
        }
        Command::Get(Get { setting }) => {
            let value = setting
                .read(session)
                .with_context(|| format!("failed to read {setting}"))?;
            println!("{value}");
        }
        Command::Set(Set { setting, value }) => {
            setting.write(session, &value).with_context(|| {
                format!(
                    "failed to set {setting} to '{value}' (accepted: {})",
                    settings::describe(setting)
                )
            })?;
            log::info!("{setting} set to {value}");
        }
        Command::Backlight(BacklightCmd { level }) => {
            let led = Backlight::new(session);
            match level {
                Some(level) => led
                    .set_brightness(level)
                    .context("failed to set keyboard backlight")?,
                None => println!(
                    "{}",
                    led.brightness()
                        .context("failed to read keyboard backlight")?
                ),
            }
        }
        Command::Notify(Notify { event }) => session.notify(event),
    }
    Ok(())
}
