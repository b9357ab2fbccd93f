use std::{
    io,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Duration,
};

use crate::{
    buffer::{ExtendedBuffer, SettingsBuffer, EXTENDED_LEN, RESPONSE_OK, SETTINGS_LEN},
    command::{PerformanceMode, PerformanceModes},
    firmware::{Argument, Firmware, Object},
};

/// A firmware call as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Integer(String, u64),
    Buffer(String, Vec<u8>),
}

/// Simulated device state.
#[derive(Debug)]
pub struct FakeDevice {
    pub calls: Vec<Call>,
    pub backlight: u8,
    pub battery_life_extender: u8,
    pub autoboot: u8,
    pub webcam: u8,
    /// Webcam ignores set requests.
    pub webcam_stuck: bool,
    pub mode: PerformanceMode,
    pub supported: PerformanceModes,
    /// Buffer calls to this sub-address fail at the transport level.
    pub fail_sub_address: Option<u16>,
    /// Buffer calls to this sub-address come back with a bad response flag.
    pub reject_sub_address: Option<u16>,
    /// Calls to this method fail at the transport level.
    pub fail_method: Option<&'static str>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            backlight: 0,
            battery_life_extender: 0,
            autoboot: 0,
            webcam: 1,
            webcam_stuck: false,
            mode: PerformanceMode::Optimized,
            supported: PerformanceMode::ALL.into_iter().collect(),
            fail_sub_address: None,
            reject_sub_address: None,
            fail_method: None,
        }
    }
}

impl FakeDevice {
    fn settings(&mut self, buf: &mut SettingsBuffer) {
        let sub_address = buf.header().sub_address();
        let g = buf.generic_mut();
        match (sub_address, *g.selector, g.data[0], g.data[1]) {
            (_, 0xbb, 0xaa, _) => {
                *g.selector = 0xdd;
                g.data[0] = 0xcc;
            }
            (0x78, 0x81, ..) => *g.selector = self.backlight,
            (0x78, 0x82, level, _) => self.backlight = level,
            (0x7a, 0x82, 0xe9, 0x90) => self.battery_life_extender = g.data[2],
            (0x7a, 0x82, 0xe9, 0x91) => g.data[1] = self.battery_life_extender,
            (0x7a, 0x82, 0xa3, 0x80) => self.autoboot = g.data[2],
            (0x7a, 0x82, 0xa3, 0x81) => g.data[1] = self.autoboot,
            (0x8a, 0x81, ..) => *g.selector = self.webcam,
            (0x8a, 0x82, value, _) => {
                if !self.webcam_stuck {
                    self.webcam = value;
                }
                *g.selector = self.webcam;
            }
            (0x86, 0x80, 0x02, _) => {}
            other => panic!("unexpected CSFI request {other:02x?}"),
        }
    }

    fn extended(&mut self, buf: &mut ExtendedBuffer) {
        let ext = buf.extended_mut();
        match (ext.function, ext.sub_function) {
            (0x51, 0x00) => {
                for (slot, mode) in ext.io.iter_mut().zip(PerformanceMode::ALL) {
                    *slot = self.supported.contains(mode).into();
                }
            }
            (0x51, 0x02) => ext.io[0] = self.mode.code(),
            (0x51, 0x03) => {
                self.mode = PerformanceMode::from_code(ext.io[0]).expect("invalid mode code");
            }
            other => panic!("unexpected CSXI request {other:02x?}"),
        }
    }

    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>> {
        let call = match arg {
            Argument::Integer(value) => Call::Integer(method.into(), value),
            Argument::Buffer(bytes) => Call::Buffer(method.into(), bytes.to_vec()),
        };
        self.calls.push(call);

        if self.fail_method == Some(method) {
            return Err(io::Error::new(io::ErrorKind::Other, "AE_ERROR"));
        }

        let bytes = match arg {
            Argument::Integer(_) => return Ok(Some(Object::Integer(0))),
            Argument::Buffer(bytes) => bytes,
        };
        let sub_address = u16::from_le_bytes([bytes[2], bytes[3]]);
        if self.fail_sub_address == Some(sub_address) {
            return Err(io::Error::new(io::ErrorKind::Other, "AE_AML_BUFFER_LIMIT"));
        }
        let flag = if self.reject_sub_address == Some(sub_address) {
            0xff
        } else {
            RESPONSE_OK
        };

        let reply = match (method, bytes.len()) {
            ("CSFI", SETTINGS_LEN) => {
                let mut buf = SettingsBuffer::from_bytes(bytes).unwrap();
                self.settings(&mut buf);
                buf.header_mut().set_response_flag(flag);
                buf.as_bytes().to_vec()
            }
            ("CSXI", EXTENDED_LEN) => {
                let mut buf = ExtendedBuffer::from_bytes(bytes).unwrap();
                self.extended(&mut buf);
                buf.header_mut().set_response_flag(flag);
                buf.as_bytes().to_vec()
            }
            other => panic!("unexpected buffer call {other:?}"),
        };
        Ok(Some(Object::Buffer(reply)))
    }
}

#[derive(Default)]
struct Shared {
    device: Mutex<FakeDevice>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Cloneable handle to a simulated device; all clones share state.
#[derive(Clone, Default)]
pub struct FakeFirmware {
    shared: Arc<Shared>,
}

impl FakeFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self) -> MutexGuard<'_, FakeDevice> {
        self.shared.device.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.device().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.device().calls.clear();
    }

    /// Highest number of overlapping calls seen so far.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Firmware for FakeFirmware {
    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>> {
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give overlapping callers a chance to show up.
        thread::sleep(Duration::from_micros(50));
        let result = self.device().evaluate(method, arg);
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

type Script = dyn FnMut(&str, Argument<'_>) -> io::Result<Option<Object>> + Send;

/// Firmware answering every call with a closure.
pub struct Scripted(Box<Script>);

impl Scripted {
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(&str, Argument<'_>) -> io::Result<Option<Object>> + Send + 'static,
    {
        Self(Box::new(f))
    }
}

impl Firmware for Scripted {
    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>> {
        (self.0)(method, arg)
    }
}
