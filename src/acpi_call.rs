use std::{
    fmt::Write as _,
    fs::{self, File},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use crate::firmware::{Argument, Firmware, Object};

pub const DEFAULT_PATH: &str = "/proc/acpi/call";
pub const DEFAULT_DEVICE: &str = r"\_SB.PCI0.LPCB.SCAI";

/// Evaluates methods of an ACPI device through the `acpi_call` kernel module.
///
/// A method is called by writing its path and argument to `/proc/acpi/call`; reading the file back
/// yields the result.
pub struct AcpiCall {
    path: PathBuf,
    device: String,
}

impl AcpiCall {
    pub fn open(path: impl AsRef<Path>, device: &str) -> io::Result<Self> {
        let path = path.as_ref();
        // Only check that the file is there and writable; every call reopens it.
        File::options().write(true).open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                io::Error::new(
                    e.kind(),
                    format!(
                        "{} does not exist (is the acpi_call module loaded?)",
                        path.display()
                    ),
                )
            } else {
                e
            }
        })?;

        log::debug!("using {} for {device}", path.display());

        Ok(Self {
            path: path.to_owned(),
            device: device.trim_end_matches('.').to_owned(),
        })
    }
}

impl Firmware for AcpiCall {
    fn evaluate(&mut self, method: &str, arg: Argument<'_>) -> io::Result<Option<Object>> {
        let request = format_request(&self.device, method, arg);
        File::options()
            .write(true)
            .open(&self.path)?
            .write_all(request.as_bytes())?;
        let reply = fs::read_to_string(&self.path)?;
        parse_reply(&reply)
    }
}

fn format_request(device: &str, method: &str, arg: Argument<'_>) -> String {
    let mut request = format!("{device}.{method} ");
    match arg {
        Argument::Integer(value) => {
            write!(request, "{value:#x}").ok();
        }
        Argument::Buffer(bytes) => {
            request.push('b');
            for b in bytes {
                write!(request, "{b:02x}").ok();
            }
        }
    }
    request
}

fn parse_reply(reply: &str) -> io::Result<Option<Object>> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unrecognized acpi_call reply: {reply:?}"),
        )
    };

    let reply = reply.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if reply.is_empty() || reply == "not called" {
        return Ok(None);
    }
    if let Some(status) = reply.strip_prefix("Error: ") {
        return Err(io::Error::new(io::ErrorKind::Other, status.to_owned()));
    }
    if let Some(hex) = reply.strip_prefix("0x") {
        let value = u64::from_str_radix(hex, 16).map_err(|_| invalid())?;
        return Ok(Some(Object::Integer(value)));
    }
    if let Some(body) = reply.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        let bytes = body
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let hex = s.strip_prefix("0x").ok_or_else(invalid)?;
                u8::from_str_radix(hex, 16).map_err(|_| invalid())
            })
            .collect::<io::Result<Vec<u8>>>()?;
        return Ok(Some(Object::Buffer(bytes)));
    }
    if let Some(s) = reply.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(Some(Object::String(s.to_owned())));
    }
    Err(invalid())
}
