// descriptor/list.rs
//! Ordered descriptor loop with private-data-specifier tracking.

use bytes::{BufMut, Bytes, BytesMut};

use super::Descriptor;
use crate::constants::{DID_PRIV_DATA_SPECIF, MAX_DESCRIPTOR_LOOP_LENGTH, PDS_NULL};
use crate::error::{DescriptorError, Result};

/// One list entry: the descriptor and the PDS in effect at its position.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    desc: Descriptor,
    pds: u32,
}

/// Result of [`DescriptorList::serialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOutcome {
    /// Concatenated `[tag][length][payload]` triples, whole descriptors only.
    pub bytes: Bytes,
    /// Number of descriptors written.
    pub count: usize,
    /// Index of the first descriptor that was not written (`len()` when all fit).
    pub next_index: usize,
}

impl SerializeOutcome {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_complete(&self, list: &DescriptorList) -> bool {
        self.next_index >= list.len()
    }
}

/// Descriptors in wire order.
///
/// The list owns its entries; cloning it shares every payload. A
/// `private_data_specifier_descriptor` (tag 0x5F) changes the PDS for all
/// entries that follow it; before the first one, the list's ambient PDS
/// applies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorList {
    entries: Vec<Entry>,
    ambient_pds: u32,
}

impl DescriptorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty list interpreting private tags with `pds` until a PDS
    /// descriptor says otherwise.
    pub fn with_pds(pds: u32) -> Self {
        Self {
            entries: Vec::new(),
            ambient_pds: pds,
        }
    }

    pub fn ambient_pds(&self) -> u32 {
        self.ambient_pds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.entries.get(index).map(|e| &e.desc)
    }

    /// PDS in effect for the descriptor at `index`.
    pub fn private_data_specifier(&self, index: usize) -> Option<u32> {
        self.entries.get(index).map(|e| e.pds)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.entries.iter().map(|e| &e.desc)
    }

    /// Descriptors together with their PDS.
    pub fn iter_with_pds(&self) -> impl Iterator<Item = (&Descriptor, u32)> {
        self.entries.iter().map(|e| (&e.desc, e.pds))
    }

    /// Total encoded size of all descriptors.
    pub fn binary_size(&self) -> usize {
        self.entries.iter().map(|e| e.desc.size()).sum()
    }

    pub fn add(&mut self, desc: Descriptor) {
        let pds = match pds_of(&desc) {
            Some(pds) => pds,
            None => self.last_pds(),
        };
        self.entries.push(Entry { desc, pds });
    }

    /// Appends copies of another list's descriptors; their PDS is
    /// recomputed in the context of this list.
    pub fn add_list(&mut self, other: &DescriptorList) {
        for desc in other.iter() {
            self.add(desc.clone());
        }
    }

    /// Removes the descriptor at `index`, recomputing the PDS of the
    /// descriptors that follow it.
    pub fn remove(&mut self, index: usize) -> Option<Descriptor> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);
        self.recompute_pds(index);
        Some(removed.desc)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Index of the first descriptor at or after `from` with this tag.
    ///
    /// Tags below 0x80 match on the tag alone. Private tags additionally
    /// require the entry's PDS to equal `pds`, unless `pds` is zero.
    /// Repeated tags are found by searching again from `found + 1`.
    pub fn search(&self, tag: u8, pds: u32, from: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(from)
            .find(|(_, e)| {
                e.desc.tag() == tag
                    && (!e.desc.is_private() || pds == PDS_NULL || e.pds == pds)
            })
            .map(|(i, _)| i)
    }

    /// Serializes as many whole descriptors as fit in `max_size` bytes.
    pub fn serialize(&self, max_size: usize) -> SerializeOutcome {
        self.serialize_from(0, max_size)
    }

    /// Like [`serialize`](Self::serialize), starting at descriptor `start`.
    /// Stops at the first descriptor that does not fit, so the remainder
    /// can go into the next section starting at `next_index`.
    pub fn serialize_from(&self, start: usize, max_size: usize) -> SerializeOutcome {
        let mut out = BytesMut::new();
        let mut index = start.min(self.entries.len());
        while let Some(entry) = self.entries.get(index) {
            if out.len() + entry.desc.size() > max_size {
                log::debug!(
                    "descriptor list truncated at index {index}: {} + {} > {max_size}",
                    out.len(),
                    entry.desc.size()
                );
                break;
            }
            entry.desc.write_to(&mut out);
            index += 1;
        }
        SerializeOutcome {
            bytes: out.freeze(),
            count: index - start.min(self.entries.len()),
            next_index: index,
        }
    }

    /// Serializes with a leading 16-bit loop length word: 4 reserved bits
    /// set to 1, then a 12-bit byte count. `max_size` includes the 2-byte
    /// prefix.
    pub fn length_serialize(&self, max_size: usize) -> SerializeOutcome {
        if max_size < 2 {
            return SerializeOutcome {
                bytes: Bytes::new(),
                count: 0,
                next_index: 0,
            };
        }
        let body_max = (max_size - 2).min(MAX_DESCRIPTOR_LOOP_LENGTH);
        let body = self.serialize(body_max);
        let mut out = BytesMut::with_capacity(2 + body.size());
        out.put_u16(0xF000 | body.size() as u16);
        out.put_slice(&body.bytes);
        SerializeOutcome {
            bytes: out.freeze(),
            ..body
        }
    }

    /// Appends the descriptors found in `data`.
    ///
    /// Stops at the first descriptor whose declared length runs past the
    /// end of `data` and returns a structural error; the descriptors read
    /// before that point stay in the list.
    pub fn deserialize(&mut self, data: impl Into<Bytes>) -> Result<()> {
        let mut buf: Bytes = data.into();
        while !buf.is_empty() {
            match Descriptor::read(&buf) {
                Ok((desc, used)) => {
                    self.add(desc);
                    buf = buf.slice(used..);
                }
                Err(e) => {
                    log::debug!("descriptor loop stopped after {} entries: {e}", self.len());
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Reads a 12-bit loop length (the 4 bits above it are reserved and
    /// ignored) and then that many bytes of descriptors. Returns the total
    /// number of bytes consumed, prefix included.
    pub fn length_deserialize(&mut self, data: impl Into<Bytes>) -> Result<usize> {
        let data: Bytes = data.into();
        if data.len() < 2 {
            return Err(DescriptorError::Truncated {
                needed: 2,
                available: data.len(),
            });
        }
        let loop_len = (((data[0] & 0x0F) as usize) << 8) | data[1] as usize;
        let end = 2 + loop_len;
        if end > data.len() {
            // salvage what is actually there before reporting
            let _ = self.deserialize(data.slice(2..));
            return Err(DescriptorError::Truncated {
                needed: end,
                available: data.len(),
            });
        }
        self.deserialize(data.slice(2..end))?;
        Ok(end)
    }

    fn last_pds(&self) -> u32 {
        self.entries.last().map_or(self.ambient_pds, |e| e.pds)
    }

    fn recompute_pds(&mut self, from: usize) {
        let mut pds = match from.checked_sub(1) {
            Some(prev) => self.entries[prev].pds,
            None => self.ambient_pds,
        };
        for entry in self.entries.iter_mut().skip(from) {
            if let Some(p) = pds_of(&entry.desc) {
                pds = p;
            }
            entry.pds = pds;
        }
    }
}

/// PDS value carried by a private_data_specifier_descriptor.
fn pds_of(desc: &Descriptor) -> Option<u32> {
    if desc.tag() != DID_PRIV_DATA_SPECIF || desc.payload_size() < 4 {
        return None;
    }
    let p = desc.payload();
    Some(u32::from_be_bytes([p[0], p[1], p[2], p[3]]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DID_CA;
    use hex_literal::hex;

    fn sample() -> DescriptorList {
        let mut list = DescriptorList::new();
        list.deserialize(Bytes::from_static(&hex!(
            "0904 0100 E064"   // CA
            "4803 01 00 00"    // service
            "0906 0500 E1FF AABB" // CA with private data
        )))
        .unwrap();
        list
    }

    #[test]
    fn test_deserialize_preserves_order() {
        let list = sample();
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(0).unwrap().tag(), 0x09);
        assert_eq!(list.get(1).unwrap().tag(), 0x48);
        assert_eq!(list.get(2).unwrap().payload(), &hex!("0500 E1FF AABB"));
        assert_eq!(list.binary_size(), 6 + 5 + 8);
    }

    #[test]
    fn test_serialize_round_trip() {
        let wire = hex!("0904 0100 E064 4803 010000 0906 0500 E1FF AABB");
        let mut list = DescriptorList::new();
        list.deserialize(wire.to_vec()).unwrap();
        let out = list.serialize(4096);
        assert_eq!(out.bytes.as_ref(), &wire);
        assert_eq!(out.count, 3);
        assert!(out.is_complete(&list));
    }

    #[test]
    fn test_serialize_bounded() {
        let list = sample();
        let out = list.serialize(12);
        assert_eq!(out.count, 2);
        assert_eq!(out.size(), 11);
        assert_eq!(out.next_index, 2);

        let rest = list.serialize_from(out.next_index, 12);
        assert_eq!(rest.count, 1);
        assert_eq!(rest.size(), 8);
        assert_eq!(rest.next_index, 3);

        let none = list.serialize(5);
        assert_eq!(none.count, 0);
        assert!(none.bytes.is_empty());
    }

    #[test]
    fn test_deserialize_truncated_keeps_prefix() {
        let mut list = DescriptorList::new();
        let err = list
            .deserialize(hex!("0904 0100 E064 48 09 0102").to_vec())
            .unwrap_err();
        assert_eq!(err, DescriptorError::Truncated { needed: 11, available: 4 });
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(0).unwrap().tag(), DID_CA);
    }

    #[test]
    fn test_deserialize_lone_tag_byte() {
        let mut list = DescriptorList::new();
        assert!(list.deserialize(hex!("4800 09").to_vec()).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_search_repeated() {
        let list = sample();
        assert_eq!(list.search(DID_CA, 0, 0), Some(0));
        assert_eq!(list.search(DID_CA, 0, 1), Some(2));
        assert_eq!(list.search(DID_CA, 0, 3), None);
        assert_eq!(list.search(0x55, 0, 0), None);
        assert_eq!(list.search(DID_CA, 0, 99), None);
    }

    #[test]
    fn test_pds_tracking() {
        let mut list = DescriptorList::with_pds(0x28);
        list.deserialize(hex!("8101 AA 5F04 000000C0 8101 BB").to_vec())
            .unwrap();
        assert_eq!(list.private_data_specifier(0), Some(0x28));
        assert_eq!(list.private_data_specifier(1), Some(0xC0));
        assert_eq!(list.private_data_specifier(2), Some(0xC0));

        assert_eq!(list.search(0x81, 0x28, 0), Some(0));
        assert_eq!(list.search(0x81, 0xC0, 0), Some(2));
        assert_eq!(list.search(0x81, 0, 1), Some(2));
        assert_eq!(list.search(0x81, 0x1234, 0), None);

        // dropping the PDS descriptor restores the ambient value downstream
        list.remove(1).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.private_data_specifier(1), Some(0x28));
        assert!(list.remove(5).is_none());
    }

    #[test]
    fn test_length_serialize() {
        let list = sample();
        let out = list.length_serialize(1024);
        assert_eq!(&out.bytes[..2], &[0xF0, 19]);
        assert_eq!(out.size(), 21);

        let mut back = DescriptorList::new();
        let used = back.length_deserialize(out.bytes.clone()).unwrap();
        assert_eq!(used, 21);
        assert_eq!(back, list);
    }

    #[test]
    fn test_length_deserialize_masks_reserved_and_stops() {
        let mut list = DescriptorList::new();
        // reserved bits cleared, loop of 2 bytes, trailing data not consumed
        let used = list.length_deserialize(hex!("0002 4800 FFFF").to_vec()).unwrap();
        assert_eq!(used, 4);
        assert_eq!(list.len(), 1);

        let mut list = DescriptorList::new();
        assert!(list.length_deserialize(hex!("F00A 4800").to_vec()).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_clone_shares_payloads() {
        let list = sample();
        let copy = list.clone();
        assert_eq!(
            list.get(2).unwrap().payload().as_ptr(),
            copy.get(2).unwrap().payload().as_ptr()
        );
        let tags: Vec<u8> = copy.iter().map(|d| d.tag()).collect();
        assert_eq!(tags, vec![0x09, 0x48, 0x09]);
    }
}
