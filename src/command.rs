use std::{fmt, str::FromStr};

use crate::{
    buffer::{ExtendedBuffer, SettingsBuffer},
    firmware::Frame,
    handshake::SubFeatureKind,
    Error, Result,
};

/// Trait implemented by SCAI buffer commands.
pub trait Command {
    /// The buffer type, which also determines the firmware method the command is sent through.
    type Buffer: Frame;

    /// The decoded result.
    type Output;

    /// Sub-address the command is sent to.
    fn sub_address(&self) -> u16;

    /// Writes the request payload into a freshly created, zero-filled buffer.
    ///
    /// Arguments are validated here, before anything is sent to the firmware.
    fn encode(&self, buf: &mut Self::Buffer) -> Result<()>;

    /// Interprets the firmware's response. The response flag has already been checked.
    fn decode(&self, resp: &Self::Buffer) -> Result<Self::Output>;
}

const GUNM_GET: u8 = 0x81;
const GUNM_SET: u8 = 0x82;
const GUNM_POWER_MANAGEMENT: u8 = 0x82;
const GUNM_NOTIFICATIONS: u8 = 0x80;

fn decode_bool(what: &str, value: u8) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::UnexpectedResponseShape(format!(
            "{what} reported non-boolean value {value:#04x}"
        ))),
    }
}

//////////////////////////////////
// Keyboard backlight
//////////////////////////////////

pub const KBD_BACKLIGHT_MAX: u8 = 3;

#[derive(Debug, Clone, Copy)]
pub struct KbdBacklightGet;

impl Command for KbdBacklightGet {
    type Buffer = SettingsBuffer;
    type Output = u8;

    fn sub_address(&self) -> u16 {
        SubFeatureKind::KbdBacklight.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        *buf.generic_mut().selector = GUNM_GET;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<u8> {
        // The firmware returns the level in place of the selector.
        let level = resp.generic().selector;
        if level > KBD_BACKLIGHT_MAX {
            return Err(Error::UnexpectedResponseShape(format!(
                "keyboard backlight level {level} out of range 0-{KBD_BACKLIGHT_MAX}"
            )));
        }
        Ok(level)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KbdBacklightSet {
    pub level: u8,
}

impl Command for KbdBacklightSet {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SubFeatureKind::KbdBacklight.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        if self.level > KBD_BACKLIGHT_MAX {
            return Err(Error::InvalidArgument(format!(
                "keyboard backlight level {} out of range (valid range: 0-{KBD_BACKLIGHT_MAX})",
                self.level
            )));
        }
        let g = buf.generic_mut();
        *g.selector = GUNM_SET;
        g.data[0] = self.level;
        Ok(())
    }

    fn decode(&self, _: &SettingsBuffer) -> Result<()> {
        Ok(())
    }
}

//////////////////////////////////
// Battery life extender
//////////////////////////////////

const BATTERY_LIFE_EXTENDER: u8 = 0xe9;
const BATTERY_LIFE_EXTENDER_SET: u8 = 0x90;
const BATTERY_LIFE_EXTENDER_GET: u8 = 0x91;

/// Charge limits must stay below this.
pub const BATTERY_LIFE_EXTENDER_LIMIT: u8 = 100;

#[derive(Debug, Clone, Copy)]
pub struct BatteryLifeExtenderGet;

impl Command for BatteryLifeExtenderGet {
    type Buffer = SettingsBuffer;
    type Output = u8;

    fn sub_address(&self) -> u16 {
        SubFeatureKind::PowerManagement.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        let g = buf.generic_mut();
        *g.selector = GUNM_POWER_MANAGEMENT;
        g.data[0] = BATTERY_LIFE_EXTENDER;
        g.data[1] = BATTERY_LIFE_EXTENDER_GET;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<u8> {
        let percent = resp.generic().data[1];
        if percent >= BATTERY_LIFE_EXTENDER_LIMIT {
            return Err(Error::UnexpectedResponseShape(format!(
                "battery life extender reported {percent}%"
            )));
        }
        Ok(percent)
    }
}

/// Sets the battery charge limit in percent. `0` disables the limit.
#[derive(Debug, Clone, Copy)]
pub struct BatteryLifeExtenderSet {
    pub percent: u8,
}

impl Command for BatteryLifeExtenderSet {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SubFeatureKind::PowerManagement.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        if self.percent >= BATTERY_LIFE_EXTENDER_LIMIT {
            return Err(Error::InvalidArgument(format!(
                "battery life extender value {} out of range (valid range: 0-{})",
                self.percent,
                BATTERY_LIFE_EXTENDER_LIMIT - 1
            )));
        }
        let g = buf.generic_mut();
        *g.selector = GUNM_POWER_MANAGEMENT;
        g.data[..3].copy_from_slice(&[
            BATTERY_LIFE_EXTENDER,
            BATTERY_LIFE_EXTENDER_SET,
            self.percent,
        ]);
        Ok(())
    }

    fn decode(&self, _: &SettingsBuffer) -> Result<()> {
        Ok(())
    }
}

//////////////////////////////////
// Autoboot (start on AC)
//////////////////////////////////

const AUTOBOOT: u8 = 0xa3;
const AUTOBOOT_SET: u8 = 0x80;
const AUTOBOOT_GET: u8 = 0x81;

#[derive(Debug, Clone, Copy)]
pub struct AutobootGet;

impl Command for AutobootGet {
    type Buffer = SettingsBuffer;
    type Output = bool;

    fn sub_address(&self) -> u16 {
        SubFeatureKind::PowerManagement.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        let g = buf.generic_mut();
        *g.selector = GUNM_POWER_MANAGEMENT;
        g.data[0] = AUTOBOOT;
        g.data[1] = AUTOBOOT_GET;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<bool> {
        decode_bool("autoboot", resp.generic().data[1])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AutobootSet {
    /// Raw value; only `0` and `1` are accepted.
    pub value: u8,
}

impl Command for AutobootSet {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SubFeatureKind::PowerManagement.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        if self.value > 1 {
            return Err(Error::InvalidArgument(format!(
                "autoboot value {} is not 0 or 1",
                self.value
            )));
        }
        let g = buf.generic_mut();
        *g.selector = GUNM_POWER_MANAGEMENT;
        g.data[..3].copy_from_slice(&[AUTOBOOT, AUTOBOOT_SET, self.value]);
        Ok(())
    }

    fn decode(&self, _: &SettingsBuffer) -> Result<()> {
        Ok(())
    }
}

//////////////////////////////////
// Webcam
//////////////////////////////////

#[derive(Debug, Clone, Copy)]
pub struct WebcamGet;

impl Command for WebcamGet {
    type Buffer = SettingsBuffer;
    type Output = bool;

    fn sub_address(&self) -> u16 {
        SubFeatureKind::Webcam.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        *buf.generic_mut().selector = GUNM_GET;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<bool> {
        decode_bool("webcam", resp.generic().selector)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WebcamSet {
    /// Raw value; only `0` and `1` are accepted.
    pub value: u8,
}

impl Command for WebcamSet {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SubFeatureKind::Webcam.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        if self.value > 1 {
            return Err(Error::InvalidArgument(format!(
                "webcam value {} is not 0 or 1",
                self.value
            )));
        }
        let g = buf.generic_mut();
        *g.selector = GUNM_SET;
        g.data[0] = self.value;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<()> {
        let echoed = resp.generic().selector;
        if echoed != self.value {
            return Err(Error::CommandRejected(format!(
                "webcam set to {} but firmware reported {echoed:#04x}",
                self.value
            )));
        }
        Ok(())
    }
}

//////////////////////////////////
// Notifications
//////////////////////////////////

const NOTIFICATIONS_HOTKEYS: u8 = 0x02;

/// Enables delivery of hotkey events.
#[derive(Debug, Clone, Copy)]
pub struct NotificationsEnable;

impl Command for NotificationsEnable {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SubFeatureKind::Notifications.sub_address()
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        let g = buf.generic_mut();
        *g.selector = GUNM_NOTIFICATIONS;
        g.data[0] = NOTIFICATIONS_HOTKEYS;
        Ok(())
    }

    fn decode(&self, _: &SettingsBuffer) -> Result<()> {
        Ok(())
    }
}

//////////////////////////////////
// Performance mode
//////////////////////////////////

pub const SASB_PERFORMANCE_MODE: u16 = 0x91;

/// Capability GUID `8246028d-8bca-4a55-ba0f-6f1e6b921b8f`.
pub const PERFORMANCE_MODE_GUID: [u8; 16] = [
    0x8d, 0x02, 0x46, 0x82, 0xca, 0x8b, 0x55, 0x4a, 0xba, 0x0f, 0x6f, 0x1e, 0x6b, 0x92, 0x1b, 0x8f,
];

const FNCN_PERFORMANCE_MODE: u8 = 0x51;
const SUBN_LIST: u8 = 0x00;
const SUBN_GET: u8 = 0x02;
const SUBN_SET: u8 = 0x03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceMode {
    Optimized,
    Performance,
    Quiet,
    Silent,
}

impl PerformanceMode {
    /// In the order the firmware reports them during discovery.
    pub const ALL: [PerformanceMode; 4] = [
        PerformanceMode::Optimized,
        PerformanceMode::Performance,
        PerformanceMode::Quiet,
        PerformanceMode::Silent,
    ];

    pub fn code(self) -> u8 {
        match self {
            PerformanceMode::Optimized => 0x00,
            PerformanceMode::Performance => 0x01,
            PerformanceMode::Quiet => 0x0a,
            PerformanceMode::Silent => 0x0b,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            PerformanceMode::Optimized => "optimized",
            PerformanceMode::Performance => "performance",
            PerformanceMode::Quiet => "quiet",
            PerformanceMode::Silent => "silent",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for PerformanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PerformanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown performance mode '{s}'")))
    }
}

/// Set of performance modes supported by a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerformanceModes(u8);

impl PerformanceModes {
    pub const NONE: Self = Self(0);

    pub fn contains(self, mode: PerformanceMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn insert(&mut self, mode: PerformanceMode) {
        self.0 |= mode.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = PerformanceMode> {
        PerformanceMode::ALL
            .into_iter()
            .filter(move |&mode| self.contains(mode))
    }
}

impl FromIterator<PerformanceMode> for PerformanceModes {
    fn from_iter<I: IntoIterator<Item = PerformanceMode>>(iter: I) -> Self {
        let mut this = Self::NONE;
        for mode in iter {
            this.insert(mode);
        }
        this
    }
}

impl fmt::Display for PerformanceModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mode) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{mode}")?;
        }
        Ok(())
    }
}

fn encode_performance_mode(buf: &mut ExtendedBuffer, sub_function: u8) {
    let ext = buf.extended_mut();
    ext.capability = PERFORMANCE_MODE_GUID;
    ext.function = FNCN_PERFORMANCE_MODE;
    ext.sub_function = sub_function;
}

/// Queries which performance modes the firmware supports.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceModeList;

impl Command for PerformanceModeList {
    type Buffer = ExtendedBuffer;
    type Output = PerformanceModes;

    fn sub_address(&self) -> u16 {
        SASB_PERFORMANCE_MODE
    }

    fn encode(&self, buf: &mut ExtendedBuffer) -> Result<()> {
        encode_performance_mode(buf, SUBN_LIST);
        Ok(())
    }

    fn decode(&self, resp: &ExtendedBuffer) -> Result<PerformanceModes> {
        let io = resp.extended().io;
        let mut modes = PerformanceModes::NONE;
        for (mode, &present) in PerformanceMode::ALL.iter().zip(&io) {
            if decode_bool(mode.name(), present)? {
                modes.insert(*mode);
            }
        }
        Ok(modes)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PerformanceModeGet;

impl Command for PerformanceModeGet {
    type Buffer = ExtendedBuffer;
    type Output = PerformanceMode;

    fn sub_address(&self) -> u16 {
        SASB_PERFORMANCE_MODE
    }

    fn encode(&self, buf: &mut ExtendedBuffer) -> Result<()> {
        encode_performance_mode(buf, SUBN_GET);
        Ok(())
    }

    fn decode(&self, resp: &ExtendedBuffer) -> Result<PerformanceMode> {
        let code = resp.extended().io[0];
        PerformanceMode::from_code(code).ok_or_else(|| {
            Error::UnexpectedResponseShape(format!("unknown performance mode code {code:#04x}"))
        })
    }
}

/// Selects a performance mode. Support is checked by the session against the discovered modes,
/// not here.
#[derive(Debug, Clone, Copy)]
pub struct PerformanceModeSet {
    pub mode: PerformanceMode,
}

impl Command for PerformanceModeSet {
    type Buffer = ExtendedBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        SASB_PERFORMANCE_MODE
    }

    fn encode(&self, buf: &mut ExtendedBuffer) -> Result<()> {
        encode_performance_mode(buf, SUBN_SET);
        buf.extended_mut().io[0] = self.mode.code();
        Ok(())
    }

    fn decode(&self, _: &ExtendedBuffer) -> Result<()> {
        Ok(())
    }
}
