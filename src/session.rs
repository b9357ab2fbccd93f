use std::{
    mem,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    command::{
        AutobootGet, AutobootSet, BatteryLifeExtenderGet, BatteryLifeExtenderSet, Command,
        KbdBacklightGet, KbdBacklightSet, NotificationsEnable, PerformanceMode,
        PerformanceModeGet, PerformanceModeList, PerformanceModeSet, PerformanceModes, WebcamGet,
        WebcamSet,
    },
    firmware::{Channel, Firmware, METHOD_ENABLE, METHOD_EVENT},
    handshake::{SubFeature, SubFeatureKind},
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Enabling,
    Ready,
    Disabling,
    Closed,
}

/// Something exposed on top of a session that has to be taken down before the interface is
/// disabled.
///
/// The command-line tool only lives for one command and registers nothing; this is for programs
/// that keep a session attached and publish surfaces built on it. `unregister` runs without the
/// session lock held, so it may still call into the session (to switch a light off, say).
pub trait Interface: Send {
    fn name(&self) -> &str;

    fn unregister(&mut self) -> anyhow::Result<()>;
}

struct Inner<F> {
    channel: Channel<F>,
    state: State,
    sub_features: [SubFeature; 4],
    modes: PerformanceModes,
    interfaces: Vec<Box<dyn Interface>>,
}

impl<F: Firmware> Inner<F> {
    fn new(firmware: F) -> Self {
        Self {
            channel: Channel::new(firmware),
            state: State::Uninitialized,
            sub_features: SubFeatureKind::ALL.map(SubFeature::new),
            modes: PerformanceModes::NONE,
            interfaces: Vec::new(),
        }
    }

    fn enable(&mut self) -> Result<()> {
        self.state = State::Enabling;
        self.channel.call_integer(METHOD_ENABLE, 1)?;

        let result = self.bring_up();
        if result.is_err() {
            // Disable again, but report the bring-up error.
            if let Err(e) = self.channel.call_integer(METHOD_ENABLE, 0) {
                log::warn!("failed to disable SCAI after aborted attach: {e}");
            }
            self.sub_features = SubFeatureKind::ALL.map(SubFeature::new);
        }
        result
    }

    fn bring_up(&mut self) -> Result<()> {
        for feature in &mut self.sub_features {
            feature.enable(&mut self.channel)?;
        }

        self.modes = self.channel.command(&PerformanceModeList)?;
        log::debug!("supported performance modes: {}", self.modes);

        self.channel.command(&NotificationsEnable)?;
        Ok(())
    }

    /// Firmware calls are allowed while ready, and while interfaces are being unregistered.
    fn attached(&self) -> Result<()> {
        match self.state {
            State::Ready | State::Disabling => Ok(()),
            _ => Err(Error::NotReady("session is not attached")),
        }
    }

    fn require(&self, kind: SubFeatureKind) -> Result<()> {
        self.attached()?;
        let enabled = self
            .sub_features
            .iter()
            .any(|f| f.kind() == kind && f.is_enabled());
        if !enabled {
            return Err(Error::NotReady("sub-feature has not been enabled"));
        }
        Ok(())
    }

    fn command<C: Command>(&mut self, kind: SubFeatureKind, cmd: &C) -> Result<C::Output> {
        self.require(kind)?;
        self.channel.command(cmd)
    }
}

/// An attached SCAI device.
///
/// All firmware calls go through one lock, so the firmware never sees two buffers in flight.
pub struct Session<F> {
    inner: Mutex<Inner<F>>,
}

impl<F: Firmware> Session<F> {
    /// Attaches to the device behind `firmware`.
    ///
    /// Fails if any step of the bring-up fails. No session exists in that case.
    pub fn attach(firmware: F) -> Result<Self> {
        let mut inner = Inner::new(firmware);
        inner.enable()?;
        inner.state = State::Ready;
        log::info!("SCAI interface enabled");
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<F>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> State {
        self.lock().state
    }

    pub fn sub_features(&self) -> [SubFeature; 4] {
        self.lock().sub_features
    }

    /// Performance modes discovered during attach.
    pub fn performance_modes(&self) -> PerformanceModes {
        self.lock().modes
    }

    /// Registers something that has to be unregistered on [`Session::detach`].
    pub fn register(&self, interface: Box<dyn Interface>) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != State::Ready {
            return Err(Error::NotReady("session is not attached"));
        }
        log::debug!("registered {}", interface.name());
        inner.interfaces.push(interface);
        Ok(())
    }

    /// Unregisters all interfaces and disables the SCAI interface.
    ///
    /// Always completes; failures are logged. Detaching twice does nothing.
    pub fn detach(&self) {
        let interfaces = {
            let mut inner = self.lock();
            if inner.state != State::Ready {
                return;
            }
            inner.state = State::Disabling;
            mem::take(&mut inner.interfaces)
        };

        for mut interface in interfaces.into_iter().rev() {
            if let Err(e) = interface.unregister() {
                log::warn!("failed to unregister {}: {e:#}", interface.name());
            }
        }

        let mut inner = self.lock();
        if let Err(e) = inner.channel.call_integer(METHOD_ENABLE, 0) {
            log::warn!("failed to disable SCAI interface: {e}");
        }
        inner.state = State::Closed;
        log::info!("SCAI interface disabled");
    }

    pub fn kbd_backlight(&self) -> Result<u8> {
        self.lock()
            .command(SubFeatureKind::KbdBacklight, &KbdBacklightGet)
    }

    pub fn set_kbd_backlight(&self, level: u8) -> Result<()> {
        self.lock()
            .command(SubFeatureKind::KbdBacklight, &KbdBacklightSet { level })
    }

    pub fn battery_life_extender(&self) -> Result<u8> {
        self.lock()
            .command(SubFeatureKind::PowerManagement, &BatteryLifeExtenderGet)
    }

    pub fn set_battery_life_extender(&self, percent: u8) -> Result<()> {
        self.lock().command(
            SubFeatureKind::PowerManagement,
            &BatteryLifeExtenderSet { percent },
        )
    }

    pub fn autoboot(&self) -> Result<bool> {
        self.lock()
            .command(SubFeatureKind::PowerManagement, &AutobootGet)
    }

    pub fn set_autoboot(&self, value: u8) -> Result<()> {
        self.lock()
            .command(SubFeatureKind::PowerManagement, &AutobootSet { value })
    }

    pub fn webcam_enabled(&self) -> Result<bool> {
        self.lock().command(SubFeatureKind::Webcam, &WebcamGet)
    }

    pub fn set_webcam_enabled(&self, value: u8) -> Result<()> {
        self.lock()
            .command(SubFeatureKind::Webcam, &WebcamSet { value })
    }

    pub fn performance_mode(&self) -> Result<PerformanceMode> {
        let mut inner = self.lock();
        inner.attached()?;
        inner.channel.command(&PerformanceModeGet)
    }

    /// Selects `mode`, which must be one of the discovered modes.
    pub fn set_performance_mode(&self, mode: PerformanceMode) -> Result<()> {
        let mut inner = self.lock();
        inner.attached()?;
        if !inner.modes.contains(mode) {
            return Err(Error::UnsupportedCapability(mode));
        }
        inner.channel.command(&PerformanceModeSet { mode })
    }

    /// Forwards a hotkey/system event to the firmware.
    ///
    /// Best effort: failures are logged and otherwise ignored.
    pub fn notify(&self, event: u32) {
        let mut inner = self.lock();
        if inner.attached().is_err() {
            log::warn!("dropping event {event:#x}: session is not attached");
            return;
        }
        log::debug!("forwarding event {event:#x}");
        if let Err(e) = inner.channel.call_integer(METHOD_EVENT, event.into()) {
            log::warn!("failed to forward event {event:#x}: {e}");
        }
    }
}
