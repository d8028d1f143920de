// descriptor/registry.rs
//! Tag → descriptor type dispatch.
//!
//! A [`Registry`] is built once at start-up and passed by reference to
//! whatever needs to decode, display or convert descriptors.

use std::collections::HashMap;

use super::{
    CaDescriptor, Descriptor, DescriptorList, PrivateDataSpecifierDescriptor, TypedDescriptor,
};
use crate::constants::{DID_CA, DID_PRIV_DATA_SPECIF, PDS_NULL};
use crate::display::TablesDisplay;
use crate::error::DescriptorError;
use crate::report::Report;
use crate::util;
use crate::xml::Element;

/// Display routine: `(display, tag, payload, indent, table_id, pds)`.
pub type DisplayFn = fn(&mut TablesDisplay, u8, &[u8], usize, u8, u32);

/// Produces a fresh, invalid instance of a descriptor type.
pub type FactoryFn = fn() -> Box<dyn TypedDescriptor>;

/// Element name used for descriptors without a registered type.
pub const GENERIC_XML_NAME: &str = "generic_descriptor";

/// Applicability of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    pub tag: u8,
    /// Only for this private data specifier (private tags).
    pub pds: Option<u32>,
    /// Only inside tables with this table id.
    pub table_id: Option<u8>,
}

impl DescriptorKey {
    pub fn standard(tag: u8) -> Self {
        Self { tag, pds: None, table_id: None }
    }

    pub fn private(tag: u8, pds: u32) -> Self {
        Self { tag, pds: Some(pds), table_id: None }
    }

    pub fn table_specific(tag: u8, table_id: u8) -> Self {
        Self { tag, pds: None, table_id: Some(table_id) }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub xml_name: &'static str,
    pub factory: FactoryFn,
    pub display: DisplayFn,
}

#[derive(Debug, Default)]
pub struct Registry {
    by_key: HashMap<DescriptorKey, RegistryEntry>,
    by_xml: HashMap<String, RegistryEntry>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every descriptor type of this crate.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register(
            DescriptorKey::standard(DID_CA),
            RegistryEntry {
                xml_name: "CA_descriptor",
                factory: new_ca,
                display: CaDescriptor::display_descriptor,
            },
        );
        reg.register(
            DescriptorKey::standard(DID_PRIV_DATA_SPECIF),
            RegistryEntry {
                xml_name: "private_data_specifier_descriptor",
                factory: new_pds,
                display: PrivateDataSpecifierDescriptor::display_descriptor,
            },
        );
        reg
    }

    /// Adds or replaces a registration.
    pub fn register(&mut self, key: DescriptorKey, entry: RegistryEntry) {
        self.by_xml.insert(entry.xml_name.to_ascii_lowercase(), entry);
        self.by_key.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Most specific registration for a tag in its context. The PDS only
    /// takes part for private tags.
    pub fn lookup(&self, tag: u8, pds: u32, table_id: u8) -> Option<&RegistryEntry> {
        let private = Descriptor::is_private_tag(tag) && pds != PDS_NULL;
        let mut candidates = Vec::with_capacity(4);
        if private {
            candidates.push(DescriptorKey { tag, pds: Some(pds), table_id: Some(table_id) });
            candidates.push(DescriptorKey::private(tag, pds));
        }
        candidates.push(DescriptorKey::table_specific(tag, table_id));
        candidates.push(DescriptorKey::standard(tag));
        candidates.iter().find_map(|k| self.by_key.get(k))
    }

    pub fn lookup_xml(&self, name: &str) -> Option<&RegistryEntry> {
        self.by_xml.get(&name.to_ascii_lowercase())
    }

    /// Typed view of a binary descriptor, `None` for unknown tags.
    /// The returned instance may be invalid if the payload is malformed.
    pub fn decode(&self, desc: &Descriptor, pds: u32, table_id: u8) -> Option<Box<dyn TypedDescriptor>> {
        let entry = self.lookup(desc.tag(), pds, table_id)?;
        let mut typed = (entry.factory)();
        typed.deserialize(desc);
        Some(typed)
    }

    /// `<descriptors>` element with one child per descriptor. Unknown or
    /// malformed descriptors are exported as `<generic_descriptor>`.
    pub fn list_to_xml(&self, list: &DescriptorList, table_id: u8) -> Element {
        let mut root = Element::new("descriptors");
        for (desc, pds) in list.iter_with_pds() {
            let el = match self.decode(desc, pds, table_id) {
                Some(typed) if typed.is_valid() => typed.to_xml(),
                _ => generic_to_xml(desc),
            };
            root.add_child(el);
        }
        root
    }

    /// Rebuilds descriptors from the children of `root` and appends them
    /// to `list`. Invalid children are reported and skipped; returns
    /// `false` if there was any.
    pub fn list_from_xml(&self, root: &Element, list: &mut DescriptorList, report: &dyn Report) -> bool {
        let mut ok = true;
        for child in root.children() {
            match self.element_to_descriptor(child, report) {
                Some(desc) => list.add(desc),
                None => ok = false,
            }
        }
        ok
    }

    fn element_to_descriptor(&self, el: &Element, report: &dyn Report) -> Option<Descriptor> {
        if el.has_name(GENERIC_XML_NAME) {
            return match generic_from_xml(el) {
                Ok(desc) => Some(desc),
                Err(e) => {
                    report.error(&e.to_string());
                    None
                }
            };
        }
        let Some(entry) = self.lookup_xml(el.name()) else {
            report.error(&DescriptorError::UnknownDescriptor(format!("<{}>", el.name())).to_string());
            return None;
        };
        let mut typed = (entry.factory)();
        if !typed.from_xml(el, report) {
            return None;
        }
        typed.serialize()
    }
}

fn new_ca() -> Box<dyn TypedDescriptor> {
    Box::new(CaDescriptor::default())
}

fn new_pds() -> Box<dyn TypedDescriptor> {
    Box::new(PrivateDataSpecifierDescriptor::default())
}

fn generic_to_xml(desc: &Descriptor) -> Element {
    let mut el = Element::new(GENERIC_XML_NAME);
    el.set_int_attribute("tag", desc.tag(), Some(2));
    if desc.payload_size() > 0 {
        el.set_text(util::hex_encode(desc.payload()));
    }
    el
}

fn generic_from_xml(el: &Element) -> crate::error::Result<Descriptor> {
    let tag = el.int_attribute::<u8>("tag", true, 0, 0, u8::MAX)?;
    Descriptor::new(tag, el.hex_text()?)
}
