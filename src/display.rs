// src/display.rs
//! Human-readable dump of descriptors and descriptor lists.

use crate::descriptor::{Descriptor, DescriptorList, Registry};
use crate::util::{self, hexa};

const HEX_BYTES_PER_LINE: usize = 16;

/// Text sink for descriptor display routines.
#[derive(Debug, Default)]
pub struct TablesDisplay {
    out: String,
}

impl TablesDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one indented line.
    pub fn line(&mut self, indent: usize, text: impl AsRef<str>) {
        self.out.push_str(&" ".repeat(indent));
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    pub fn hex_dump(&mut self, indent: usize, data: &[u8]) {
        self.out.push_str(&util::hex_dump(data, indent, HEX_BYTES_PER_LINE));
    }

    /// Header line, then the registered display routine, or a hex dump
    /// of the payload for unknown tags.
    pub fn display_descriptor(
        &mut self,
        registry: &Registry,
        desc: &Descriptor,
        index: usize,
        indent: usize,
        table_id: u8,
        pds: u32,
    ) {
        let entry = registry.lookup(desc.tag(), pds, table_id);
        let name = entry.map_or("unknown", |e| e.xml_name);
        self.line(
            indent,
            format!(
                "- Descriptor {index}: {name}, Tag {} ({}), {} bytes",
                desc.tag(),
                hexa(desc.tag(), 2),
                desc.payload_size()
            ),
        );
        match entry {
            Some(e) => (e.display)(self, desc.tag(), desc.payload(), indent + 2, table_id, pds),
            None => self.hex_dump(indent + 2, desc.payload()),
        }
    }

    pub fn display_list(&mut self, registry: &Registry, list: &DescriptorList, indent: usize, table_id: u8) {
        for (index, (desc, pds)) in list.iter_with_pds().enumerate() {
            self.display_descriptor(registry, desc, index, indent, table_id, pds);
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}
