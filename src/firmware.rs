use std::io;

use crate::{
    buffer::{Buffer, Header, EXTENDED_LEN, NAMESPACE, SETTINGS_LEN},
    command::Command,
    handshake, Error, Result,
};

/// Enables (argument `1`) or disables (argument `0`) the SCAI interface.
pub const METHOD_ENABLE: &str = "SDLS";
/// Forwards a raw hotkey/system event code to the firmware.
pub const METHOD_EVENT: &str = "SETM";
/// Buffer command using 21-byte buffers.
pub const METHOD_SETTINGS: &str = "CSFI";
/// Buffer command using 256-byte buffers.
pub const METHOD_EXTENDED: &str = "CSXI";

/// Argument passed to a firmware method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument<'a> {
    Integer(u64),
    Buffer(&'a [u8]),
}

/// Object returned from a firmware method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Integer(u64),
    Buffer(Vec<u8>),
    String(String),
}

impl Object {
    fn kind(&self) -> &'static str {
        match self {
            Object::Integer(_) => "integer",
            Object::Buffer(_) => "buffer",
            Object::String(_) => "string",
        }
    }
}

/// Method evaluation on the firmware device implementing the SCAI protocol.
///
/// Implementations only evaluate the named method; they don't interpret any of the results.
/// Every call blocks until the firmware has returned.
pub trait Firmware: Send {
    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>>;
}

impl<F: Firmware + ?Sized> Firmware for Box<F> {
    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>> {
        (**self).evaluate(method, arg)
    }
}

/// A buffer type with a firmware method pinned to it.
pub trait Frame: Sized + std::fmt::Debug {
    const METHOD: &'static str;

    fn new(sub_address: u16) -> Self;
    fn from_bytes(bytes: &[u8]) -> Option<Self>;
    fn as_bytes(&self) -> &[u8];
    fn header(&self) -> &Header;
}

macro_rules! frame {
    ($len:ident, $method:ident) => {
        impl Frame for Buffer<$len> {
            const METHOD: &'static str = $method;

            fn new(sub_address: u16) -> Self {
                Buffer::<$len>::new(NAMESPACE, sub_address)
            }

            fn from_bytes(bytes: &[u8]) -> Option<Self> {
                Buffer::<$len>::from_bytes(bytes)
            }

            fn as_bytes(&self) -> &[u8] {
                Buffer::<$len>::as_bytes(self)
            }

            fn header(&self) -> &Header {
                Buffer::<$len>::header(self)
            }
        }
    };
}

frame!(SETTINGS_LEN, METHOD_SETTINGS);
frame!(EXTENDED_LEN, METHOD_EXTENDED);

/// Validating wrapper around a [`Firmware`].
pub struct Channel<F> {
    firmware: F,
}

impl<F: Firmware> Channel<F> {
    pub fn new(firmware: F) -> Self {
        Self { firmware }
    }

    /// Calls an integer method. A method may return nothing, but it must not return anything
    /// other than an integer.
    pub fn call_integer(&mut self, method: &str, arg: u64) -> Result<Option<u64>> {
        log::trace!("{method}({arg:#x})");
        match self.firmware.evaluate(method, Argument::Integer(arg))? {
            None => Ok(None),
            Some(Object::Integer(value)) => Ok(Some(value)),
            Some(other) => Err(Error::UnexpectedResponseShape(format!(
                "{method} returned a {} instead of an integer",
                other.kind()
            ))),
        }
    }

    /// Sends `request` to the buffer method of its length and returns the firmware's reply, which
    /// must be a buffer of exactly the same length.
    pub fn call_buffer<B: Frame>(&mut self, request: &B) -> Result<B> {
        let method = B::METHOD;
        log::trace!("{method} request:  {request:?}");
        let reply = self
            .firmware
            .evaluate(method, Argument::Buffer(request.as_bytes()))?;
        let bytes = match reply {
            Some(Object::Buffer(bytes)) => bytes,
            Some(other) => {
                return Err(Error::UnexpectedResponseShape(format!(
                    "{method} returned a {} instead of a buffer",
                    other.kind()
                )))
            }
            None => {
                return Err(Error::UnexpectedResponseShape(format!(
                    "{method} returned nothing"
                )))
            }
        };
        let response = B::from_bytes(&bytes).ok_or_else(|| {
            Error::UnexpectedResponseShape(format!(
                "{method} returned {} bytes, expected {}",
                bytes.len(),
                request.as_bytes().len()
            ))
        })?;
        log::trace!("{method} response: {response:?}");
        Ok(response)
    }

    /// Encodes `cmd`, runs it through its buffer method and decodes the validated response.
    pub fn command<C: Command>(&mut self, cmd: &C) -> Result<C::Output> {
        let mut request = C::Buffer::new(cmd.sub_address());
        cmd.encode(&mut request)?;
        let response = self.call_buffer(&request)?;
        handshake::check_response(C::Buffer::METHOD, response.header())?;
        cmd.decode(&response)
    }
}
