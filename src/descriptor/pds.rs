// descriptor/pds.rs
//! private_data_specifier_descriptor (tag 0x5F), ETSI EN 300 468 §6.2.31.

use std::any::Any;

use bytes::{BufMut, BytesMut};

use super::{Descriptor, TypedDescriptor};
use crate::constants::{DID_PRIV_DATA_SPECIF, PDS_CANALPLUS, PDS_EUTELSAT};
use crate::display::TablesDisplay;
use crate::report::Report;
use crate::util::hexa;
use crate::xml::Element;

const XML_NAME: &str = "private_data_specifier_descriptor";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrivateDataSpecifierDescriptor {
    pds: u32,
    valid: bool,
}

impl PrivateDataSpecifierDescriptor {
    pub const TAG: u8 = DID_PRIV_DATA_SPECIF;

    pub fn new(pds: u32) -> Self {
        Self { pds, valid: true }
    }

    pub fn from_descriptor(desc: &Descriptor) -> Self {
        let mut d = Self::default();
        d.deserialize(desc);
        d
    }

    pub fn pds(&self) -> u32 {
        self.pds
    }

    pub fn display_descriptor(disp: &mut TablesDisplay, _did: u8, payload: &[u8], indent: usize, _tid: u8, _pds: u32) {
        if payload.len() != 4 {
            disp.line(indent, "- Invalid descriptor");
            disp.hex_dump(indent, payload);
            return;
        }
        let pds = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        disp.line(indent, format!("Specifier: {} ({})", hexa(pds, 8), pds_name(pds)));
    }
}

impl TypedDescriptor for PrivateDataSpecifierDescriptor {
    fn tag(&self) -> u8 {
        DID_PRIV_DATA_SPECIF
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
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32(self.pds);
        Descriptor::new(DID_PRIV_DATA_SPECIF, payload.freeze()).ok()
    }

    fn deserialize(&mut self, desc: &Descriptor) {
        let p = desc.payload();
        *self = if desc.tag() == DID_PRIV_DATA_SPECIF && p.len() == 4 {
            Self::new(u32::from_be_bytes([p[0], p[1], p[2], p[3]]))
        } else {
            Self::default()
        };
    }

    fn build_xml(&self, root: &mut Element) {
        if self.valid {
            root.set_int_attribute("private_data_specifier", self.pds, Some(8));
        }
    }

    fn from_xml(&mut self, element: &Element, report: &dyn Report) -> bool {
        if !self.check_xml_name(element, report) {
            return false;
        }
        match element.int_attribute::<u32>("private_data_specifier", true, 0, 0, u32::MAX) {
            Ok(pds) => {
                *self = Self::new(pds);
                true
            }
            Err(e) => {
                report.error(&e.to_string());
                false
            }
        }
    }
}

fn pds_name(pds: u32) -> &'static str {
    match pds {
        PDS_EUTELSAT => "Eutelsat",
        PDS_CANALPLUS => "Canal+",
        0x0000_0002 => "BSkyB",
        0x0000_0016 => "Casema",
        0x0000_0029 => "Nordig",
        0x0000_233A => "DTG",
        _ => "unknown",
    }
}
