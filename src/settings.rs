use std::{fmt, str::FromStr};

use crate::{
    command::{PerformanceMode, KBD_BACKLIGHT_MAX},
    firmware::Firmware,
    session::Session,
    Error, Result,
};

/// A named setting that can be read and written as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    BatteryLifeExtender,
    Autoboot,
    WebcamEnable,
    PerfMode,
}

impl Setting {
    pub const ALL: [Setting; 4] = [
        Setting::BatteryLifeExtender,
        Setting::Autoboot,
        Setting::WebcamEnable,
        Setting::PerfMode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Setting::BatteryLifeExtender => "battery_life_extender",
            Setting::Autoboot => "autoboot",
            Setting::WebcamEnable => "webcam_enable",
            Setting::PerfMode => "perf_mode",
        }
    }

    pub fn read<F: Firmware>(self, session: &Session<F>) -> Result<String> {
        Ok(match self {
            Setting::BatteryLifeExtender => session.battery_life_extender()?.to_string(),
            Setting::Autoboot => u8::from(session.autoboot()?).to_string(),
            Setting::WebcamEnable => u8::from(session.webcam_enabled()?).to_string(),
            Setting::PerfMode => session.performance_mode()?.to_string(),
        })
    }

    /// Parses `value` and writes it. Surrounding whitespace (such as a trailing newline) is
    /// ignored.
    pub fn write<F: Firmware>(self, session: &Session<F>, value: &str) -> Result<()> {
        let value = value.trim();
        match self {
            Setting::BatteryLifeExtender => {
                session.set_battery_life_extender(parse_u8(self, value)?)
            }
            Setting::Autoboot => session.set_autoboot(parse_u8(self, value)?),
            Setting::WebcamEnable => session.set_webcam_enabled(parse_u8(self, value)?),
            Setting::PerfMode => session.set_performance_mode(value.parse()?),
        }
    }
}

fn parse_u8(setting: Setting, value: &str) -> Result<u8> {
    value
        .parse()
        .map_err(|e| Error::InvalidArgument(format!("invalid value '{value}' for {setting}: {e}")))
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown setting '{s}'")))
    }
}

/// Keyboard backlight as a brightness-controlled LED.
pub struct Backlight<'a, F> {
    session: &'a Session<F>,
}

impl<'a, F: Firmware> Backlight<'a, F> {
    pub const NAME: &'static str = "samsung-galaxybook::kbd_backlight";
    pub const MAX_BRIGHTNESS: u8 = KBD_BACKLIGHT_MAX;

    pub fn new(session: &'a Session<F>) -> Self {
        Self { session }
    }

    pub fn brightness(&self) -> Result<u8> {
        self.session.kbd_backlight()
    }

    pub fn set_brightness(&self, brightness: u8) -> Result<()> {
        self.session.set_kbd_backlight(brightness)
    }
}

/// Accepted values of a setting, for help output.
pub fn describe(setting: Setting) -> String {
    match setting {
        Setting::BatteryLifeExtender => "0-99 (0 disables the charge limit)".into(),
        Setting::Autoboot | Setting::WebcamEnable => "0 or 1".into(),
        Setting::PerfMode => PerformanceMode::ALL
            .iter()
            .map(|mode| mode.name())
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeFirmware;

    fn attach() -> (FakeFirmware, Session<FakeFirmware>) {
        let fake = FakeFirmware::new();
        let session = Session::attach(fake.clone()).unwrap();
        fake.clear_calls();
        (fake, session)
    }

    #[test]
    fn names() {
        for setting in Setting::ALL {
            assert_eq!(setting.name().parse::<Setting>().unwrap(), setting);
        }
        assert!(matches!(
            "kbd_backlight".parse::<Setting>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn read_and_write() {
        let (_fake, session) = attach();
        Setting::BatteryLifeExtender.write(&session, "80\n").unwrap();
        assert_eq!(Setting::BatteryLifeExtender.read(&session).unwrap(), "80");

        Setting::Autoboot.write(&session, "1").unwrap();
        assert_eq!(Setting::Autoboot.read(&session).unwrap(), "1");

        Setting::WebcamEnable.write(&session, "0").unwrap();
        assert_eq!(Setting::WebcamEnable.read(&session).unwrap(), "0");

        Setting::PerfMode.write(&session, "quiet").unwrap();
        assert_eq!(Setting::PerfMode.read(&session).unwrap(), "quiet");
    }

    #[test]
    fn bad_input_is_rejected_without_firmware_call() {
        let (fake, session) = attach();
        for (setting, value) in [
            (Setting::BatteryLifeExtender, "100"),
            (Setting::BatteryLifeExtender, "-1"),
            (Setting::BatteryLifeExtender, "eighty"),
            (Setting::Autoboot, "2"),
            (Setting::WebcamEnable, "yes"),
            (Setting::PerfMode, "turbo"),
        ] {
            let err = setting.write(&session, value).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{setting}={value}: {err}");
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn read_surfaces_errors() {
        let (fake, session) = attach();
        fake.device().fail_sub_address = Some(0x7a);
        assert!(matches!(
            Setting::BatteryLifeExtender.read(&session),
            Err(Error::Transport(_))
        ));
    }

    #[test]
    fn backlight() {
        let (fake, session) = attach();
        let led = Backlight::new(&session);
        led.set_brightness(Backlight::<FakeFirmware>::MAX_BRIGHTNESS)
            .unwrap();
        assert_eq!(fake.device().backlight, 3);
        assert_eq!(led.brightness().unwrap(), 3);
        assert!(led.set_brightness(4).is_err());
    }
}
