// descriptor/ca.rs
//! CA_descriptor (tag 0x09), ISO/IEC 13818-1 §2.6.16.
//!
//! ```text
//! CA_system_id       16
//! reserved            3   always written as 0b111, ignored on read
//! CA_PID             13
//! private_data_byte   N   (N <= 251)
//! ```

use std::any::Any;
use std::str::FromStr;

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use bytes::Bytes;

use super::{Descriptor, DescriptorList, TypedDescriptor};
use crate::constants::{
    CA_FIXED_SIZE, CA_MAX_PRIVATE_DATA, CA_RESERVED_BITS, DID_CA, PID_BITS, PID_MAX, TID_CAT, TID_PMT,
};
use crate::display::TablesDisplay;
use crate::error::{DescriptorError, Result};
use crate::report::Report;
use crate::util::{self, decimal, hexa};
use crate::xml::Element;

const XML_NAME: &str = "CA_descriptor";

/// Generic CA_descriptor. The default value is the invalid state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaDescriptor {
    cas_id: u16,
    ca_pid: u16,
    private_data: Bytes,
    valid: bool,
}

impl CaDescriptor {
    pub const TAG: u8 = DID_CA;

    /// Valid descriptor without private data. `ca_pid` must fit in 13 bits.
    pub fn new(cas_id: u16, ca_pid: u16) -> Result<Self> {
        Self::with_private_data(cas_id, ca_pid, Bytes::new())
    }

    pub fn with_private_data(cas_id: u16, ca_pid: u16, private_data: impl Into<Bytes>) -> Result<Self> {
        check_pid(ca_pid as u64)?;
        let private_data = private_data.into();
        check_private_data(&private_data)?;
        Ok(Self {
            cas_id,
            ca_pid,
            private_data,
            valid: true,
        })
    }

    /// Decodes a binary descriptor; the result may be invalid.
    pub fn from_descriptor(desc: &Descriptor) -> Self {
        let mut ca = Self::default();
        ca.deserialize(desc);
        ca
    }

    pub fn cas_id(&self) -> u16 {
        self.cas_id
    }

    pub fn ca_pid(&self) -> u16 {
        self.ca_pid
    }

    pub fn private_data(&self) -> &[u8] {
        &self.private_data
    }

    pub fn set_cas_id(&mut self, cas_id: u16) {
        self.cas_id = cas_id;
    }

    /// Rejects PIDs wider than 13 bits instead of masking them.
    pub fn set_ca_pid(&mut self, ca_pid: u16) -> Result<()> {
        check_pid(ca_pid as u64)?;
        self.ca_pid = ca_pid;
        Ok(())
    }

    pub fn set_private_data(&mut self, data: impl Into<Bytes>) -> Result<()> {
        let data = data.into();
        check_private_data(&data)?;
        self.private_data = data;
        Ok(())
    }

    /// Parses `casid/pid[/hexdata]`. Both integers may be decimal or
    /// `0x` hex; digits that cannot be decimal (`6a01`) are read as bare
    /// hex. The optional data is an even-length hex string, no spaces.
    pub fn parse_command_line(value: &str) -> Result<Self> {
        let fields: Vec<&str> = value.split('/').collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(DescriptorError::InvalidToken(value.to_string()));
        }
        let cas_id = token_integer(fields[0])
            .ok_or_else(|| DescriptorError::InvalidToken(value.to_string()))?;
        if cas_id > u16::MAX as u64 {
            return Err(DescriptorError::OutOfRange {
                field: "CA_system_id",
                value: cas_id,
                max: u16::MAX as u64,
            });
        }
        let ca_pid = token_integer(fields[1])
            .ok_or_else(|| DescriptorError::InvalidToken(value.to_string()))?;
        check_pid(ca_pid)?;
        let private_data = match fields.get(2) {
            Some(hex) => util::hex_decode_strict(hex).ok_or_else(|| DescriptorError::InvalidHex(hex.to_string()))?,
            None => Vec::new(),
        };
        Self::with_private_data(cas_id as u16, ca_pid as u16, private_data)
    }

    /// Command-line form: on failure the error goes to `report`, `false`
    /// is returned and `self` is unchanged.
    pub fn from_command_line(&mut self, value: &str, report: &dyn Report) -> bool {
        match Self::parse_command_line(value) {
            Ok(ca) => {
                *self = ca;
                true
            }
            Err(e) => {
                report.error(&format!("invalid CA_descriptor \"{value}\": {e}"));
                false
            }
        }
    }

    /// Decodes every value and appends the valid ones to `list`. A bad
    /// value is reported and skipped; the others are still added. Returns
    /// `false` if any value failed.
    pub fn add_from_command_line<S: AsRef<str>>(list: &mut DescriptorList, values: &[S], report: &dyn Report) -> bool {
        let mut ok = true;
        for value in values {
            let mut ca = CaDescriptor::default();
            if !ca.from_command_line(value.as_ref(), report) {
                ok = false;
                continue;
            }
            if let Some(desc) = ca.serialize() {
                list.add(desc);
            }
        }
        ok
    }

    /// Display routine for raw payloads. Never reads past `payload`.
    pub fn display_descriptor(disp: &mut TablesDisplay, _did: u8, payload: &[u8], indent: usize, tid: u8, _pds: u32) {
        if payload.len() < CA_FIXED_SIZE {
            disp.line(indent, "- Invalid descriptor");
            disp.hex_dump(indent, payload);
            return;
        }
        let cas_id = u16::from_be_bytes([payload[0], payload[1]]);
        let pid = u16::from_be_bytes([payload[2], payload[3]]) & !CA_RESERVED_BITS;
        let kind = match tid {
            TID_CAT => "EMM",
            TID_PMT => "ECM",
            _ => "CA",
        };
        disp.line(
            indent,
            format!(
                "CA System Id: {} ({}), {kind} PID: {} ({})",
                hexa(cas_id, 4),
                cas_family_name(cas_id),
                decimal(pid),
                hexa(pid, 4)
            ),
        );
        let private = &payload[CA_FIXED_SIZE..];
        if !private.is_empty() {
            disp.line(indent, format!("Private CA data: {} bytes", decimal(private.len() as u64)));
            disp.hex_dump(indent + 2, private);
        }
    }
}

impl TypedDescriptor for CaDescriptor {
    fn tag(&self) -> u8 {
        DID_CA
    }

    fn xml_name(&self) -> &'static str {
        XML_NAME
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn serialize(&self) -> Option<Descriptor> {
        if !self.valid {
            return None;
        }
        let mut w = BitWriter::endian(Vec::with_capacity(CA_FIXED_SIZE + self.private_data.len()), BigEndian);
        w.write::<16, u16>(self.cas_id).ok()?;
        w.write::<3, u8>((CA_RESERVED_BITS >> PID_BITS) as u8).ok()?;
        w.write::<13, u16>(self.ca_pid).ok()?;
        w.write_bytes(&self.private_data).ok()?;
        Descriptor::new(DID_CA, w.into_writer()).ok()
    }

    fn deserialize(&mut self, desc: &Descriptor) {
        *self = decode(desc).unwrap_or_default();
    }

    fn build_xml(&self, root: &mut Element) {
        if !self.valid {
            return;
        }
        root.set_int_attribute("CA_system_id", self.cas_id, Some(4));
        root.set_int_attribute("CA_PID", self.ca_pid, Some(4));
        if !self.private_data.is_empty() {
            root.add_hex_text_child("private_data", &self.private_data);
        }
    }

    fn from_xml(&mut self, element: &Element, report: &dyn Report) -> bool {
        if !self.check_xml_name(element, report) {
            return false;
        }
        let parsed = element
            .int_attribute::<u16>("CA_system_id", true, 0, 0, u16::MAX)
            .and_then(|cas_id| {
                let ca_pid = element.int_attribute::<u16>("CA_PID", true, 0, 0, PID_MAX)?;
                let data = element.hex_text_child("private_data", false, 0, CA_MAX_PRIVATE_DATA)?;
                Self::with_private_data(cas_id, ca_pid, data)
            });
        match parsed {
            Ok(ca) => {
                *self = ca;
                true
            }
            Err(e) => {
                report.error(&e.to_string());
                false
            }
        }
    }
}

impl FromStr for CaDescriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_command_line(s)
    }
}

fn decode(desc: &Descriptor) -> Option<CaDescriptor> {
    if desc.tag() != DID_CA || desc.payload_size() < CA_FIXED_SIZE {
        return None;
    }
    let mut r = BitReader::endian(desc.payload(), BigEndian);
    let cas_id = r.read::<16, u16>().ok()?;
    r.skip(3).ok()?; // reserved, value not checked
    let ca_pid = r.read::<13, u16>().ok()?;
    Some(CaDescriptor {
        cas_id,
        ca_pid,
        private_data: desc.payload_bytes().slice(CA_FIXED_SIZE..),
        valid: true,
    })
}

fn token_integer(text: &str) -> Option<u64> {
    util::to_integer::<u64>(text).or_else(|| {
        let t = text.trim();
        if t.is_empty() || !t.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(t, 16).ok()
    })
}

fn check_pid(pid: u64) -> Result<()> {
    if pid > PID_MAX as u64 {
        return Err(DescriptorError::OutOfRange {
            field: "CA_PID",
            value: pid,
            max: PID_MAX as u64,
        });
    }
    Ok(())
}

fn check_private_data(data: &[u8]) -> Result<()> {
    if data.len() > CA_MAX_PRIVATE_DATA {
        return Err(DescriptorError::PrivateDataTooLong(data.len()));
    }
    Ok(())
}

/// Vendor family of a CA_system_id (ETSI TS 101 162 allocations).
pub fn cas_family_name(cas_id: u16) -> &'static str {
    match cas_id >> 8 {
        0x01 => "MediaGuard",
        0x05 => "Viaccess",
        0x06 => "Irdeto",
        0x09 => "NDS VideoGuard",
        0x0B => "Conax",
        0x0D => "CryptoWorks",
        0x17 | 0x18 => "Nagravision",
        0x26 => "BISS",
        0x4A if (0x4AD0..=0x4AD1).contains(&cas_id) => "SafeAccess",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_DESCRIPTOR_SIZE;
    use crate::report::{CollectReport, NullReport};
    use hex_literal::hex;

    #[test]
    fn test_serialize_layout() {
        let ca = CaDescriptor::with_private_data(0x0100, 0x0064, vec![0xAA, 0xBB]).unwrap();
        let desc = ca.serialize().unwrap();
        assert_eq!(desc.to_bytes().as_ref(), &hex!("0906 0100 E064 AABB"));
    }

    #[test]
    fn test_serialize_forces_reserved_bits() {
        let ca = CaDescriptor::new(0xFFFF, 0).unwrap();
        assert_eq!(ca.serialize().unwrap().payload(), &hex!("FFFF E000"));
        let ca = CaDescriptor::new(0, PID_MAX).unwrap();
        assert_eq!(ca.serialize().unwrap().payload(), &hex!("0000 FFFF"));
    }

    #[test]
    fn test_deserialize_masks_reserved_bits() {
        for word in [hex!("0500 0064"), hex!("0500 E064"), hex!("0500 4064")] {
            let desc = Descriptor::new(DID_CA, word.to_vec()).unwrap();
            let ca = CaDescriptor::from_descriptor(&desc);
            assert!(ca.is_valid());
            assert_eq!(ca.cas_id(), 0x0500);
            assert_eq!(ca.ca_pid(), 0x0064);
            assert!(ca.private_data().is_empty());
        }
    }

    #[test]
    fn test_deserialize_short_payload_invalidates() {
        let mut ca = CaDescriptor::with_private_data(1, 2, vec![3]).unwrap();
        ca.deserialize(&Descriptor::new(DID_CA, vec![0x01, 0x00, 0xE0]).unwrap());
        assert!(!ca.is_valid());
        assert_eq!(ca, CaDescriptor::default());
        assert!(ca.serialize().is_none());
        assert!(ca.to_xml().attributes().next().is_none());
    }

    #[test]
    fn test_deserialize_wrong_tag_invalidates() {
        let desc = Descriptor::new(0x48, vec![0x01, 0x00, 0xE0, 0x10]).unwrap();
        assert!(!CaDescriptor::from_descriptor(&desc).is_valid());
    }

    #[test]
    fn test_private_data_shares_payload() {
        let desc = Descriptor::new(DID_CA, vec![0x01, 0x00, 0xE0, 0x10, 0xDE, 0xAD]).unwrap();
        let ca = CaDescriptor::from_descriptor(&desc);
        assert_eq!(ca.private_data(), &[0xDE, 0xAD]);
        assert_eq!(ca.private_data().as_ptr(), desc.payload()[4..].as_ptr());
    }

    #[test]
    fn test_construction_range() {
        assert_eq!(
            CaDescriptor::new(1, 0x2000),
            Err(DescriptorError::OutOfRange { field: "CA_PID", value: 0x2000, max: 0x1FFF })
        );
        assert_eq!(
            CaDescriptor::with_private_data(1, 1, vec![0u8; 252]),
            Err(DescriptorError::PrivateDataTooLong(252))
        );
        let full = CaDescriptor::with_private_data(1, 1, vec![0u8; 251]).unwrap();
        assert_eq!(full.serialize().unwrap().size(), MAX_DESCRIPTOR_SIZE);

        let mut ca = CaDescriptor::new(1, 1).unwrap();
        assert!(ca.set_ca_pid(0x1FFF).is_ok());
        assert!(ca.set_ca_pid(0x2000).is_err());
        assert_eq!(ca.ca_pid(), 0x1FFF);
    }

    #[test]
    fn test_command_line() {
        let ca: CaDescriptor = "6a01/0x50".parse().unwrap();
        assert_eq!(ca.cas_id(), 0x6a01);
        assert_eq!(ca.cas_id(), 27137);
        assert_eq!(ca.ca_pid(), 0x50);
        assert!(ca.private_data().is_empty());

        let ca: CaDescriptor = "1/1/deadbeef".parse().unwrap();
        assert_eq!((ca.cas_id(), ca.ca_pid()), (1, 1));
        assert_eq!(ca.private_data(), &[0xDE, 0xAD, 0xBE, 0xEF]);

        let ca: CaDescriptor = "0x0100/0x1FFF/".parse().unwrap();
        assert_eq!(ca.ca_pid(), 0x1FFF);
    }

    #[test]
    fn test_command_line_failures_leave_object_unchanged() {
        let orig = CaDescriptor::with_private_data(7, 8, vec![9]).unwrap();
        let bad_tokens = [
            "1/1/xyz", "1/99999", "1/1/abc", "1/1/de ad", "1/1/de\tad", "1", "1/2/3/4", "x/1", "65536/1", "1/-1", "",
        ];
        for bad in bad_tokens {
            let mut ca = orig.clone();
            let rep = CollectReport::new();
            assert!(!ca.from_command_line(bad, &rep), "{bad} accepted");
            assert_eq!(ca, orig);
            assert_eq!(rep.error_count(), 1);
        }
        assert_eq!(
            "1/99999".parse::<CaDescriptor>(),
            Err(DescriptorError::OutOfRange { field: "CA_PID", value: 99999, max: 0x1FFF })
        );
        assert_eq!(
            "1/1/xyz".parse::<CaDescriptor>(),
            Err(DescriptorError::InvalidHex("xyz".into()))
        );
    }

    #[test]
    fn test_add_from_command_line_skips_bad_tokens() {
        let mut list = DescriptorList::new();
        let rep = CollectReport::new();
        let ok = CaDescriptor::add_from_command_line(&mut list, &["0x0100/0x20", "1/99999", "2/3/ABCD"], &rep);
        assert!(!ok);
        assert_eq!(list.len(), 2);
        assert_eq!(rep.error_count(), 1);
        assert_eq!(CaDescriptor::from_descriptor(list.get(1).unwrap()).private_data(), &[0xAB, 0xCD]);

        let mut list = DescriptorList::new();
        assert!(CaDescriptor::add_from_command_line(&mut list, &["1/2"], &NullReport));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_xml_round_trip() {
        let ca = CaDescriptor::with_private_data(0x0500, 0x0123, vec![0x01, 0xFE]).unwrap();
        let el = ca.to_xml();
        assert_eq!(el.name(), "CA_descriptor");
        assert_eq!(el.attribute("CA_system_id"), Some("0x0500"));
        assert_eq!(el.attribute("CA_PID"), Some("0x0123"));
        assert_eq!(el.child("private_data").unwrap().text(), "01FE");

        let mut back = CaDescriptor::default();
        assert!(back.from_xml(&el, &NullReport));
        assert_eq!(back, ca);
        assert_eq!(back.to_xml(), el);
    }

    #[test]
    fn test_from_xml_accepts_decimal() {
        let el = Element::parse(r#"<CA_descriptor CA_system_id="256" CA_PID="100"/>"#).unwrap();
        let mut ca = CaDescriptor::default();
        assert!(ca.from_xml(&el, &NullReport));
        assert_eq!((ca.cas_id(), ca.ca_pid()), (0x0100, 100));
        assert!(ca.private_data().is_empty());
    }

    #[test]
    fn test_from_xml_failures_leave_object_unchanged() {
        let orig = CaDescriptor::new(3, 4).unwrap();
        for text in [
            r#"<CA_descriptor CA_PID="100"/>"#,
            r#"<CA_descriptor CA_system_id="1" CA_PID="0x2000"/>"#,
            r#"<CA_descriptor CA_system_id="0x10000" CA_PID="1"/>"#,
            r#"<CA_descriptor CA_system_id="1" CA_PID="1"><private_data>ABC</private_data></CA_descriptor>"#,
            r#"<other_descriptor CA_system_id="1" CA_PID="1"/>"#,
        ] {
            let el = Element::parse(text).unwrap();
            let mut ca = orig.clone();
            let rep = CollectReport::new();
            assert!(!ca.from_xml(&el, &rep), "{text} accepted");
            assert_eq!(ca, orig);
            assert_eq!(rep.error_count(), 1);
        }
    }

    #[test]
    fn test_display() {
        let mut disp = TablesDisplay::new();
        CaDescriptor::display_descriptor(&mut disp, DID_CA, &hex!("0500 E064 0102"), 2, TID_PMT, 0);
        assert_eq!(
            disp.output(),
            "  CA System Id: 0x0500 (Viaccess), ECM PID: 100 (0x0064)\n  Private CA data: 2 bytes\n    01 02\n"
        );

        let mut disp = TablesDisplay::new();
        CaDescriptor::display_descriptor(&mut disp, DID_CA, &hex!("0500 FFFF"), 0, TID_CAT, 0);
        assert_eq!(disp.output(), "CA System Id: 0x0500 (Viaccess), EMM PID: 8,191 (0x1FFF)\n");
    }

    #[test]
    fn test_display_short_payload() {
        let mut disp = TablesDisplay::new();
        CaDescriptor::display_descriptor(&mut disp, DID_CA, &hex!("0500 E0"), 0, TID_PMT, 0);
        assert_eq!(disp.output(), "- Invalid descriptor\n05 00 E0\n");
    }

    #[test]
    fn test_cas_family_name() {
        assert_eq!(cas_family_name(0x0500), "Viaccess");
        assert_eq!(cas_family_name(0x1802), "Nagravision");
        assert_eq!(cas_family_name(0x4AD0), "SafeAccess");
        assert_eq!(cas_family_name(0x4AD1), "SafeAccess");
        assert_eq!(cas_family_name(0x4AD2), "unknown");
        assert_eq!(cas_family_name(0x4ACF), "unknown");
    }
}
