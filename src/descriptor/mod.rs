// descriptor/mod.rs
//! Binary descriptors: tag + 8-bit length + payload.
//!
//! A [`Descriptor`] is the unit of wire-format validity. The payload is a
//! [`Bytes`] handle, so cloning a descriptor or slicing one out of a
//! section buffer never copies the payload bytes, and the handle can be
//! shared between threads as-is.

pub mod ca;
pub mod list;
pub mod pds;
pub mod registry;
pub mod typed;

pub use ca::CaDescriptor;
pub use list::{DescriptorList, SerializeOutcome};
pub use pds::PrivateDataSpecifierDescriptor;
pub use registry::{DisplayFn, Registry, RegistryEntry};
pub use typed::TypedDescriptor;

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{DESCRIPTOR_HEADER_SIZE, DID_PRIVATE_FIRST, MAX_DESCRIPTOR_PAYLOAD};
use crate::error::{DescriptorError, Result};

/// An immutable, structurally valid binary descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    tag: u8,
    payload: Bytes,
}

impl Descriptor {
    /// Builds a descriptor from a tag and a payload of at most 255 bytes.
    pub fn new(tag: u8, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_DESCRIPTOR_PAYLOAD {
            return Err(DescriptorError::PayloadTooLong(payload.len()));
        }
        Ok(Self { tag, payload })
    }

    /// Builds a descriptor from its complete binary form. The buffer must
    /// hold exactly one descriptor: `2 + length` bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < DESCRIPTOR_HEADER_SIZE {
            return Err(DescriptorError::Truncated {
                needed: DESCRIPTOR_HEADER_SIZE,
                available: data.len(),
            });
        }
        let declared = data[1] as usize;
        let actual = data.len() - DESCRIPTOR_HEADER_SIZE;
        if declared != actual {
            return Err(DescriptorError::SizeMismatch { declared, actual });
        }
        Self::new(data[0], Bytes::copy_from_slice(&data[2..]))
    }

    /// Reads the descriptor at the start of `buf`, returning it with the
    /// number of bytes consumed. The payload shares `buf`'s storage.
    pub fn read(buf: &Bytes) -> Result<(Self, usize)> {
        if buf.len() < DESCRIPTOR_HEADER_SIZE {
            return Err(DescriptorError::Truncated {
                needed: DESCRIPTOR_HEADER_SIZE,
                available: buf.len(),
            });
        }
        let len = buf[1] as usize;
        let end = DESCRIPTOR_HEADER_SIZE + len;
        if end > buf.len() {
            return Err(DescriptorError::Truncated {
                needed: end,
                available: buf.len(),
            });
        }
        let desc = Self {
            tag: buf[0],
            payload: buf.slice(DESCRIPTOR_HEADER_SIZE..end),
        };
        Ok((desc, end))
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Tags in the private range are only meaningful with a PDS.
    pub fn is_private(&self) -> bool {
        Self::is_private_tag(self.tag)
    }

    pub fn is_private_tag(tag: u8) -> bool {
        tag >= DID_PRIVATE_FIRST
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Shared handle on the payload bytes.
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Total encoded size, header included (2..=257).
    pub fn size(&self) -> usize {
        DESCRIPTOR_HEADER_SIZE + self.payload.len()
    }

    /// Returns a new descriptor with the same tag and another payload.
    /// `self` and anything sharing its payload are left untouched.
    pub fn with_payload(&self, payload: impl Into<Bytes>) -> Result<Self> {
        Self::new(self.tag, payload)
    }

    /// Appends `[tag][length][payload]` to `out`.
    pub fn write_to(&self, out: &mut BytesMut) {
        out.reserve(self.size());
        out.put_u8(self.tag);
        out.put_u8(self.payload.len() as u8);
        out.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.size());
        self.write_to(&mut out);
        out.freeze()
    }
}
