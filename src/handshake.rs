use std::fmt;

use crate::{
    buffer::{Header, SettingsBuffer, RESPONSE_OK},
    command::Command,
    firmware::{Channel, Firmware},
    Error, Result,
};

const ENABLE_SELECTOR: u8 = 0xbb;
const ENABLE_MAGIC: u8 = 0xaa;
const ACK_SELECTOR: u8 = 0xdd;
const ACK_MAGIC: u8 = 0xcc;

/// Checks the response flag of a buffer returned by the firmware.
///
/// Applies to every buffer command. A response without the success marker is rejected no matter
/// what the payload says.
pub fn check_response(method: &str, header: &Header) -> Result<()> {
    if header.response_flag() != RESPONSE_OK {
        return Err(Error::CommandRejected(format!(
            "{method} to sub-address {:#04x} returned response flag {:#04x}",
            header.sub_address(),
            header.response_flag(),
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFeatureKind {
    PowerManagement,
    KbdBacklight,
    Webcam,
    Notifications,
}

impl SubFeatureKind {
    /// Handshake order used when a session is attached.
    pub const ALL: [SubFeatureKind; 4] = [
        SubFeatureKind::PowerManagement,
        SubFeatureKind::KbdBacklight,
        SubFeatureKind::Webcam,
        SubFeatureKind::Notifications,
    ];

    pub fn sub_address(self) -> u16 {
        match self {
            SubFeatureKind::PowerManagement => 0x7a,
            SubFeatureKind::KbdBacklight => 0x78,
            SubFeatureKind::Webcam => 0x8a,
            SubFeatureKind::Notifications => 0x86,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SubFeatureKind::PowerManagement => "power management",
            SubFeatureKind::KbdBacklight => "keyboard backlight",
            SubFeatureKind::Webcam => "webcam",
            SubFeatureKind::Notifications => "notifications",
        }
    }
}

impl fmt::Display for SubFeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Disabled,
    Enabled,
}

/// Handshake state of one logical feature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubFeature {
    kind: SubFeatureKind,
    state: HandshakeState,
}

impl SubFeature {
    pub fn new(kind: SubFeatureKind) -> Self {
        Self {
            kind,
            state: HandshakeState::Disabled,
        }
    }

    pub fn kind(&self) -> SubFeatureKind {
        self.kind
    }

    pub fn sub_address(&self) -> u16 {
        self.kind.sub_address()
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == HandshakeState::Enabled
    }

    /// Performs the enable handshake. Safe to repeat on an already enabled sub-feature.
    ///
    /// The handle is only marked enabled once the firmware has acknowledged the request.
    pub fn enable<F: Firmware>(&mut self, channel: &mut Channel<F>) -> Result<()> {
        log::debug!(
            "enabling {} (sub-address {:#04x})",
            self.kind,
            self.sub_address()
        );
        channel.command(&Enable {
            sub_address: self.sub_address(),
        })?;
        self.state = HandshakeState::Enabled;
        Ok(())
    }
}

/// The enable request for one sub-address.
///
/// Selector `0xbb` with data `0xaa`; the firmware acknowledges with selector `0xdd` and data
/// `0xcc`, and ignores the sub-address until it has.
#[derive(Debug, Clone, Copy)]
pub struct Enable {
    pub sub_address: u16,
}

impl Command for Enable {
    type Buffer = SettingsBuffer;
    type Output = ();

    fn sub_address(&self) -> u16 {
        self.sub_address
    }

    fn encode(&self, buf: &mut SettingsBuffer) -> Result<()> {
        let g = buf.generic_mut();
        *g.selector = ENABLE_SELECTOR;
        g.data[0] = ENABLE_MAGIC;
        Ok(())
    }

    fn decode(&self, resp: &SettingsBuffer) -> Result<()> {
        // Both acknowledgement bytes have to match.
        let g = resp.generic();
        if g.selector != ACK_SELECTOR || g.data[0] != ACK_MAGIC {
            return Err(Error::CommandRejected(format!(
                "sub-address {:#04x} did not acknowledge enable request (got {:#04x} {:#04x})",
                self.sub_address, g.selector, g.data[0],
            )));
        }
        Ok(())
    }
}
