//! SCAI firmware interface of Samsung Galaxy Book laptops.

pub mod acpi_call;
pub mod buffer;
pub mod command;
mod error;
pub mod firmware;
pub mod handshake;
pub mod session;
pub mod settings;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use firmware::Firmware;
pub use session::Session;
