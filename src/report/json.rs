//! JSON summary of a descriptor list

use serde::Serialize;

use crate::descriptor::{
    CaDescriptor, DescriptorList, PrivateDataSpecifierDescriptor, Registry, TypedDescriptor,
};
use crate::util::hex_encode;

/// Decoded fields of the descriptor types known to this crate
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DescriptorFields {
    Ca {
        cas_id: u16,
        ca_pid: u16,
        #[serde(skip_serializing_if = "String::is_empty")]
        private_data: String,
    },
    PrivateDataSpecifier {
        private_data_specifier: u32,
    },
}

/// One descriptor of the summary
#[derive(Debug, Clone, Serialize)]
pub struct DescriptorJson {
    pub index: usize,
    pub tag: u8,
    pub name: &'static str,
    pub size: usize,
    pub pds: u32,
    pub valid: bool,
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<DescriptorFields>,
}

/// Complete summary
#[derive(Debug, Clone, Serialize)]
pub struct ListJson {
    pub table_id: u8,
    pub count: usize,
    pub binary_size: usize,
    pub descriptors: Vec<DescriptorJson>,
}

/// Builds the summary of `list` in the context of `table_id`. Name,
/// validity and fields all come from the registration in effect for each
/// descriptor.
pub fn summarize(registry: &Registry, list: &DescriptorList, table_id: u8) -> ListJson {
    let descriptors = list
        .iter_with_pds()
        .enumerate()
        .map(|(index, (desc, pds))| {
            let typed = registry.decode(desc, pds, table_id);
            let valid = typed.as_ref().is_some_and(|t| t.is_valid());
            DescriptorJson {
                index,
                tag: desc.tag(),
                name: registry
                    .lookup(desc.tag(), pds, table_id)
                    .map_or("unknown", |e| e.xml_name),
                size: desc.size(),
                pds,
                valid,
                payload: hex_encode(desc.payload()),
                fields: typed.as_deref().filter(|t| t.is_valid()).and_then(fields_of),
            }
        })
        .collect();

    ListJson {
        table_id,
        count: list.len(),
        binary_size: list.binary_size(),
        descriptors,
    }
}

fn fields_of(typed: &dyn TypedDescriptor) -> Option<DescriptorFields> {
    let any = typed.as_any();
    if let Some(ca) = any.downcast_ref::<CaDescriptor>() {
        return Some(DescriptorFields::Ca {
            cas_id: ca.cas_id(),
            ca_pid: ca.ca_pid(),
            private_data: hex_encode(ca.private_data()),
        });
    }
    if let Some(p) = any.downcast_ref::<PrivateDataSpecifierDescriptor>() {
        return Some(DescriptorFields::PrivateDataSpecifier {
            private_data_specifier: p.pds(),
        });
    }
    None
}

/// Pretty-printed JSON text of the summary
pub fn to_json(registry: &Registry, list: &DescriptorList, table_id: u8) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&summarize(registry, list, table_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DID_CA, TID_CAT, TID_PMT};
    use crate::descriptor::registry::{DescriptorKey, RegistryEntry};
    use hex_literal::hex;

    #[test]
    fn test_summary() {
        let reg = Registry::with_defaults();
        let mut list = DescriptorList::new();
        list.deserialize(hex!("0906 0100 E064 AABB 5F04 00000028 8101 FF").to_vec()).unwrap();

        let summary = summarize(&reg, &list, 0x02);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.binary_size, 8 + 6 + 3);
        assert_eq!(
            summary.descriptors[0].fields,
            Some(DescriptorFields::Ca { cas_id: 0x0100, ca_pid: 0x64, private_data: "AABB".into() })
        );
        assert_eq!(summary.descriptors[2].pds, 0x28);
        assert_eq!(summary.descriptors[2].name, "unknown");
        assert!(!summary.descriptors[2].valid);

        let v: serde_json::Value = serde_json::from_str(&to_json(&reg, &list, 0x02).unwrap()).unwrap();
        assert_eq!(v["descriptors"][0]["fields"]["ca_pid"], 100);
        assert_eq!(v["descriptors"][1]["fields"]["private_data_specifier"], 40);
        assert!(v["descriptors"][2].get("fields").is_none());
    }

    fn pmt_ca() -> Box<dyn TypedDescriptor> {
        Box::new(PrivateDataSpecifierDescriptor::default())
    }

    fn no_display(_: &mut crate::display::TablesDisplay, _: u8, _: &[u8], _: usize, _: u8, _: u32) {}

    #[test]
    fn test_summary_follows_registration() {
        let mut reg = Registry::with_defaults();
        reg.register(
            DescriptorKey::table_specific(DID_CA, TID_PMT),
            RegistryEntry {
                xml_name: "pmt_ca",
                factory: pmt_ca,
                display: no_display,
            },
        );
        let mut list = DescriptorList::new();
        list.deserialize(hex!("0904 0100 E064").to_vec()).unwrap();

        let in_pmt = summarize(&reg, &list, TID_PMT);
        assert_eq!(in_pmt.descriptors[0].name, "pmt_ca");
        assert!(!in_pmt.descriptors[0].valid);
        assert_eq!(in_pmt.descriptors[0].fields, None);

        let in_cat = summarize(&reg, &list, TID_CAT);
        assert_eq!(in_cat.descriptors[0].name, "CA_descriptor");
        assert!(in_cat.descriptors[0].valid);
        assert_eq!(
            in_cat.descriptors[0].fields,
            Some(DescriptorFields::Ca { cas_id: 0x0100, ca_pid: 0x64, private_data: String::new() })
        );
    }
}
