//! Constants for descriptor processing (ISO/IEC 13818-1, ETSI EN 300 468)

/// Descriptor framing
pub const DESCRIPTOR_HEADER_SIZE: usize = 2; // tag + length
pub const MAX_DESCRIPTOR_PAYLOAD: usize = 255;
pub const MAX_DESCRIPTOR_SIZE: usize = DESCRIPTOR_HEADER_SIZE + MAX_DESCRIPTOR_PAYLOAD; // 257

/// Capacity of a long private section
pub const MAX_PRIVATE_SECTION_SIZE: usize = 4096;
/// 12-bit loop length field used in front of descriptor loops
pub const MAX_DESCRIPTOR_LOOP_LENGTH: usize = 0x0FFF;

/// Packet identifiers
pub const PID_BITS: u32 = 13;
pub const PID_MAX: u16 = 0x1FFF;

/// Descriptor tags
pub const DID_CA: u8 = 0x09;
pub const DID_PRIV_DATA_SPECIF: u8 = 0x5F;
/// Tags at or above this value are interpreted through the PDS
pub const DID_PRIVATE_FIRST: u8 = 0x80;

/// Table ids giving context to descriptor interpretation
pub const TID_CAT: u8 = 0x01;
pub const TID_PMT: u8 = 0x02;

/// Private data specifiers
pub const PDS_NULL: u32 = 0x0000_0000;
pub const PDS_EUTELSAT: u32 = 0x0000_0028;
pub const PDS_CANALPLUS: u32 = 0x0000_00C0;

/// CA descriptor layout
pub const CA_FIXED_SIZE: usize = 4; // CA_system_id + reserved/CA_PID
pub const CA_RESERVED_BITS: u16 = 0xE000; // top 3 bits of the PID word
pub const CA_MAX_PRIVATE_DATA: usize = MAX_DESCRIPTOR_PAYLOAD - CA_FIXED_SIZE; // 251
