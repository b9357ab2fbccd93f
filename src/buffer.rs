use std::{fmt, mem::size_of};

use bytemuck::{Pod, Zeroable};

/// Namespace ID identifying the SCAI protocol family ("CX").
pub const NAMESPACE: u16 = 0x5843;

/// Value of [`Header::response_flag`] after the firmware has executed a command successfully.
pub const RESPONSE_OK: u8 = 0xaa;

pub const HEADER_LEN: usize = size_of::<Header>();

/// Length of buffers exchanged through `CSFI`.
pub const SETTINGS_LEN: usize = 0x15;

/// Length of buffers exchanged through `CSXI`.
pub const EXTENDED_LEN: usize = 0x100;

pub type SettingsBuffer = Buffer<SETTINGS_LEN>;
pub type ExtendedBuffer = Buffer<EXTENDED_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Header {
    namespace: [u8; 2],
    sub_address: [u8; 2],
    response_flag: u8,
}

impl Header {
    pub fn namespace(&self) -> u16 {
        u16::from_le_bytes(self.namespace)
    }

    pub fn sub_address(&self) -> u16 {
        u16::from_le_bytes(self.sub_address)
    }

    /// Written by the firmware; [`RESPONSE_OK`] on success.
    pub fn response_flag(&self) -> u8 {
        self.response_flag
    }

    pub fn set_response_flag(&mut self, flag: u8) {
        self.response_flag = flag;
    }
}

/// Extended payload layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Extended {
    /// GUID of the addressed capability, in mixed-endian byte order.
    pub capability: [u8; 16],
    pub function: u8,
    pub sub_function: u8,
    pub io: [u8; 10],
}

pub const EXTENDED_VIEW_END: usize = HEADER_LEN + size_of::<Extended>();

/// Generic payload view.
#[derive(Debug, Clone, Copy)]
pub struct Generic<'a> {
    pub selector: u8,
    pub data: &'a [u8],
}

/// Mutable generic payload view.
#[derive(Debug)]
pub struct GenericMut<'a> {
    pub selector: &'a mut u8,
    pub data: &'a mut [u8],
}

/// A fixed-size SCAI command buffer of `N` bytes.
///
/// The payload after the [`Header`] is read through either the generic view (selector byte and
/// data, used with 21-byte buffers) or the extended view (capability GUID, function codes and
/// I/O slots, only on 256-byte buffers). Both alias the same bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Buffer<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Buffer<N> {
    const HAS_PAYLOAD: () = assert!(N > HEADER_LEN, "buffer must be longer than its header");

    /// Creates a zero-filled buffer with the header written.
    ///
    /// The firmware inspects bytes the caller never set, so everything past the header is zero
    /// until a view writes to it.
    pub fn new(namespace: u16, sub_address: u16) -> Self {
        let () = Self::HAS_PAYLOAD;
        let mut this = Self { bytes: [0; N] };
        let header = this.header_mut();
        header.namespace = namespace.to_le_bytes();
        header.sub_address = sub_address.to_le_bytes();
        this
    }

    /// Reinterprets a received reply. Returns `None` if `bytes` is not exactly `N` bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let () = Self::HAS_PAYLOAD;
        let bytes = <[u8; N]>::try_from(bytes).ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &Header {
        bytemuck::from_bytes(&self.bytes[..HEADER_LEN])
    }

    pub fn header_mut(&mut self) -> &mut Header {
        bytemuck::from_bytes_mut(&mut self.bytes[..HEADER_LEN])
    }

    pub fn generic(&self) -> Generic<'_> {
        Generic {
            selector: self.bytes[HEADER_LEN],
            data: &self.bytes[HEADER_LEN + 1..],
        }
    }

    pub fn generic_mut(&mut self) -> GenericMut<'_> {
        let (selector, data) = self.bytes[HEADER_LEN..].split_at_mut(1);
        GenericMut {
            selector: &mut selector[0],
            data,
        }
    }
}

impl Buffer<EXTENDED_LEN> {
    pub fn extended(&self) -> &Extended {
        bytemuck::from_bytes(&self.bytes[HEADER_LEN..EXTENDED_VIEW_END])
    }

    pub fn extended_mut(&mut self) -> &mut Extended {
        bytemuck::from_bytes_mut(&mut self.bytes[HEADER_LEN..EXTENDED_VIEW_END])
    }
}

impl<const N: usize> fmt::Debug for Buffer<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only the used prefix of large buffers is interesting.
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(HEADER_LEN, |i| (i + 1).max(HEADER_LEN));
        write!(f, "Buffer<{N}>[")?;
        for (i, b) in self.bytes[..end].iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        if end < N {
            write!(f, " ..{} zero", N - end)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_little_endian() {
        let buf = SettingsBuffer::new(NAMESPACE, 0x78);
        assert_eq!(buf.as_bytes()[..HEADER_LEN], [0x43, 0x58, 0x78, 0x00, 0x00]);
        assert!(buf.as_bytes()[HEADER_LEN..].iter().all(|&b| b == 0));
    }

    #[test]
    fn settings_buffer_round_trip() {
        let mut buf = SettingsBuffer::new(NAMESPACE, 0x7a);
        let g = buf.generic_mut();
        *g.selector = 0x82;
        g.data[..3].copy_from_slice(&[0xe9, 0x90, 80]);
        buf.header_mut().set_response_flag(RESPONSE_OK);

        let decoded = SettingsBuffer::from_bytes(buf.as_bytes()).unwrap();
        assert_eq!(decoded, buf);
        assert_eq!(decoded.header().namespace(), NAMESPACE);
        assert_eq!(decoded.header().sub_address(), 0x7a);
        assert_eq!(decoded.header().response_flag(), RESPONSE_OK);
        let g = decoded.generic();
        assert_eq!(g.selector, 0x82);
        assert_eq!(g.data.len(), SETTINGS_LEN - HEADER_LEN - 1);
        assert_eq!(g.data[..4], [0xe9, 0x90, 80, 0]);
    }

    #[test]
    fn extended_buffer_round_trip() {
        let mut buf = ExtendedBuffer::new(NAMESPACE, 0x91);
        let ext = buf.extended_mut();
        ext.capability = [0x11; 16];
        ext.function = 0x51;
        ext.sub_function = 0x03;
        ext.io[0] = 0x0a;
        ext.io[9] = 0xff;

        let decoded = ExtendedBuffer::from_bytes(buf.as_bytes()).unwrap();
        assert_eq!(decoded.header().sub_address(), 0x91);
        assert_eq!(decoded.header().response_flag(), 0);
        let ext = decoded.extended();
        assert_eq!(ext.capability, [0x11; 16]);
        assert_eq!(ext.function, 0x51);
        assert_eq!(ext.sub_function, 0x03);
        assert_eq!(ext.io, [0x0a, 0, 0, 0, 0, 0, 0, 0, 0, 0xff]);
        assert!(decoded.as_bytes()[EXTENDED_VIEW_END..].iter().all(|&b| b == 0));
    }

    #[test]
    fn views_alias_payload() {
        let mut buf = ExtendedBuffer::new(NAMESPACE, 0x91);
        buf.extended_mut().capability[0] = 0x8d;
        assert_eq!(buf.generic().selector, 0x8d);
        *buf.generic_mut().selector = 0x01;
        assert_eq!(buf.extended().capability[0], 0x01);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(SettingsBuffer::from_bytes(&[0; SETTINGS_LEN - 1]).is_none());
        assert!(SettingsBuffer::from_bytes(&[0; EXTENDED_LEN]).is_none());
        assert!(ExtendedBuffer::from_bytes(&[0; EXTENDED_LEN]).is_some());
    }

    #[test]
    fn debug_trims_trailing_zeroes() {
        let buf = ExtendedBuffer::new(NAMESPACE, 0x91);
        assert_eq!(format!("{buf:?}"), "Buffer<256>[43 58 91 00 00 ..251 zero]");
    }
}
