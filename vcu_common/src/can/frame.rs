//! CAN frame and identifier types.

/// CAN identifier, standard (11-bit) or extended (29-bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanId {
    Standard(u16),
    Extended(u32),
}

impl CanId {
    /// Largest standard identifier.
    pub const STANDARD_MAX: u16 = 0x7FF;
    /// Largest extended identifier.
    pub const EXTENDED_MAX: u32 = 0x1FFF_FFFF;

    /// Raw numeric identifier.
    #[inline]
    pub const fn raw(&self) -> u32 {
        match *self {
            Self::Standard(id) => id as u32,
            Self::Extended(id) => id,
        }
    }

    #[inline]
    pub const fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }
}

/// A classic CAN data frame: identifier, up to 8 data bytes, length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: CanId,
    len: u8,
    data: [u8; 8],
}

impl CanFrame {
    /// Maximum payload length.
    pub const MAX_LEN: usize = 8;

    /// Build a frame from a payload slice. Returns `None` if the payload
    /// exceeds 8 bytes.
    pub fn new(id: CanId, payload: &[u8]) -> Option<Self> {
        if payload.len() > Self::MAX_LEN {
            return None;
        }
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id,
            len: payload.len() as u8,
            data,
        })
    }

    /// Build a frame from a full data array and a length, usable in `const`
    /// context. Lengths above 8 are clamped.
    pub const fn from_array(id: CanId, data: [u8; 8], len: u8) -> Self {
        let len = if len as usize > Self::MAX_LEN {
            Self::MAX_LEN as u8
        } else {
            len
        };
        Self { id, len, data }
    }

    #[inline]
    pub const fn id(&self) -> CanId {
        self.id
    }

    /// Data length code.
    #[inline]
    pub const fn len(&self) -> u8 {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload bytes (`len` of them).
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Full 8-byte data buffer, zero padded past `len`.
    #[inline]
    pub const fn raw_data(&self) -> [u8; 8] {
        self.data
    }

    /// Little-endian u16 at `offset`, or `None` if it lies past `len`.
    #[inline]
    pub fn u16_le(&self, offset: usize) -> Option<u16> {
        let bytes = self.data().get(offset..offset + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Little-endian i16 at `offset`, or `None` if it lies past `len`.
    #[inline]
    pub fn i16_le(&self, offset: usize) -> Option<i16> {
        self.u16_le(offset).map(|v| v as i16)
    }
}
