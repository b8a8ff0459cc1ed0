use crate::error::Error;
use crate::partition::consts::*;
use crate::partition::crc::{crc32, crc32_entry, crc32_page_header};
use crate::partition::namespace::NamespaceTable;
use crate::partition::Namespaces;
use crate::value::Value;

/// Encode `data` into an NVS partition binary of exactly `size` bytes.
///
/// `size` must be a positive multiple of 4096 (the ESP-IDF flash sector
/// size).
pub(crate) fn encode(data: &Namespaces, size: usize) -> Result<Vec<u8>, Error> {
    if size == 0 || !size.is_multiple_of(FLASH_SECTOR_SIZE) {
        return Err(Error::InvalidPartitionSize(size));
    }

    let mut writer = PartitionWriter::new(size);
    let mut namespaces = NamespaceTable::new();

    for (namespace, values) in data {
        if values.is_empty() {
            continue;
        }

        let ns_index = namespaces.assign(namespace)?;
        log::debug!("assigned namespace '{namespace}' index {ns_index}");
        writer.write_namespace_entry(namespace, ns_index)?;

        for (key, value) in values {
            log::debug!(
                "encoding key '{key}' in namespace '{namespace}' ({})",
                value.encoding_str()
            );
            writer.write_data_entry(ns_index, key, value)?;
        }
    }

    writer.seal_remaining()?;

    Ok(writer.data)
}

struct PartitionWriter {
    data: Vec<u8>,
    current_page: usize,
    current_slot: usize,
    num_pages: usize,
}

impl PartitionWriter {
    fn new(size: usize) -> Self {
        let num_pages = size / FLASH_SECTOR_SIZE;
        let mut data = vec![0xFF; size];
        stamp_bitmap(&mut data, 0);
        Self {
            data,
            current_page: 0,
            current_slot: 1,
            num_pages,
        }
    }

    /// Reserve `span` consecutive slots, advancing to a new page first if the
    /// current page cannot hold them.
    fn reserve(&mut self, span: usize) -> Result<(usize, usize), Error> {
        if self.current_slot + span > SLOTS_PER_PAGE {
            self.seal_page(PAGE_STATE_ACTIVE_SEALED)?;
            self.current_page += 1;
            if self.current_page >= self.num_pages {
                return Err(Error::PartitionTooSmall(self.num_pages * FLASH_SECTOR_SIZE));
            }
            stamp_bitmap(&mut self.data, self.current_page);
            self.current_slot = 1;
        }
        if span > SLOTS_PER_PAGE - 1 {
            return Err(Error::PartitionTooSmall(self.num_pages * FLASH_SECTOR_SIZE));
        }
        let page = self.current_page;
        let slot = self.current_slot;
        self.current_slot += span;
        Ok((page, slot))
    }

    fn write_namespace_entry(&mut self, name: &str, index: u8) -> Result<(), Error> {
        let (page, slot) = self.reserve(1)?;
        let mut payload = [0xFFu8; 8];
        payload[0] = index;
        self.write_slot(page, slot, 0, ITEM_TYPE_U8, 1, name, &payload)
    }

    fn write_data_entry(&mut self, ns_index: u8, key: &str, value: &Value) -> Result<(), Error> {
        match value {
            Value::U8(v) => self.write_numeric(ns_index, key, ITEM_TYPE_U8, &[*v]),
            Value::I8(v) => self.write_numeric(ns_index, key, ITEM_TYPE_I8, &v.to_le_bytes()),
            Value::U16(v) => self.write_numeric(ns_index, key, ITEM_TYPE_U16, &v.to_le_bytes()),
            Value::I16(v) => self.write_numeric(ns_index, key, ITEM_TYPE_I16, &v.to_le_bytes()),
            Value::U32(v) => self.write_numeric(ns_index, key, ITEM_TYPE_U32, &v.to_le_bytes()),
            Value::I32(v) => self.write_numeric(ns_index, key, ITEM_TYPE_I32, &v.to_le_bytes()),
            Value::Str(s) => {
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                self.write_span(ns_index, key, ITEM_TYPE_STR, &bytes)
            }
            Value::Blob(b) => self.write_span(ns_index, key, ITEM_TYPE_BLOB, b),
        }
    }

    fn write_numeric(
        &mut self,
        ns_index: u8,
        key: &str,
        item_type: u8,
        value_bytes: &[u8],
    ) -> Result<(), Error> {
        let (page, slot) = self.reserve(1)?;
        let mut payload = [0xFFu8; 8];
        payload[..value_bytes.len()].copy_from_slice(value_bytes);
        self.write_slot(page, slot, ns_index, item_type, 1, key, &payload)
    }

    fn write_span(&mut self, ns_index: u8, key: &str, item_type: u8, bytes: &[u8]) -> Result<(), Error> {
        let len = u16::try_from(bytes.len()).map_err(|_| Error::ValueTooLarge {
            key: key.to_string(),
            len: bytes.len(),
        })?;
        let span = 1 + bytes.len().div_ceil(ENTRY_SIZE);
        let span_u8 = u8::try_from(span).map_err(|_| Error::ValueTooLarge {
            key: key.to_string(),
            len: bytes.len(),
        })?;

        let (page, slot) = self.reserve(span)?;

        let mut header_payload = [0xFFu8; 8];
        header_payload[..2].copy_from_slice(&len.to_le_bytes());
        self.write_slot(page, slot, ns_index, item_type, span_u8, key, &header_payload)?;

        for (i, chunk) in bytes.chunks(ENTRY_SIZE).enumerate() {
            let offset = slot_offset(page, slot + 1 + i);
            self.data[offset..offset + 32].fill(0xFF);
            self.data[offset..offset + chunk.len()].copy_from_slice(chunk);
        }

        Ok(())
    }

    fn write_slot(
        &mut self,
        page: usize,
        slot: usize,
        ns_index: u8,
        item_type: u8,
        span: u8,
        key: &str,
        payload: &[u8; 8],
    ) -> Result<(), Error> {
        super::validate_key(key)?;

        let offset = slot_offset(page, slot);
        self.data[offset] = ns_index;
        self.data[offset + 1] = item_type;
        self.data[offset + 2] = span;
        self.data[offset + 3] = 0xFF;

        let key_bytes = key.as_bytes();
        self.data[offset + 8..offset + 8 + key_bytes.len()].copy_from_slice(key_bytes);
        self.data[offset + 8 + key_bytes.len()..offset + 24].fill(0);

        self.data[offset + 24..offset + 32].copy_from_slice(payload);

        let crc = crc32_entry(&self.data[offset..offset + ENTRY_SIZE]);
        self.data[offset + 4..offset + 8].copy_from_slice(&crc.to_le_bytes());

        Ok(())
    }

    /// Seal every page that has been touched so far (header + CRC).
    fn seal_remaining(&mut self) -> Result<(), Error> {
        self.seal_page(PAGE_STATE_ACTIVE_SEALED)
    }

    fn seal_page(&mut self, state: u32) -> Result<(), Error> {
        let page = self.current_page;
        let seq = u32::try_from(page).map_err(|_| Error::PartitionTooSmall(self.data.len()))?;
        write_page_header(&mut self.data, page, seq, state);
        Ok(())
    }
}

/// Stamp the cosmetic bitmap marker into slot 0 of `page`.
fn stamp_bitmap(data: &mut [u8], page: usize) {
    let offset = slot_offset(page, 0);
    data[offset] = BITMAP_MARKER[0];
    data[offset + 1] = BITMAP_MARKER[1];
}

fn slot_offset(page: usize, slot: usize) -> usize {
    page * FLASH_SECTOR_SIZE + PAGE_HEADER_SIZE + slot * ENTRY_SIZE
}

/// Encode always seals every touched page with `ACTIVE`; `FULL` is a
/// decode-time concept this codec never writes.
const PAGE_STATE_ACTIVE_SEALED: u32 = PAGE_STATE_ACTIVE;

fn write_page_header(data: &mut [u8], page_index: usize, sequence: u32, state: u32) {
    let offset = page_index * FLASH_SECTOR_SIZE;

    data[offset..offset + 4].copy_from_slice(&state.to_le_bytes());
    data[offset + 4..offset + 8].copy_from_slice(&sequence.to_le_bytes());
    data[offset + 8..offset + 12].copy_from_slice(&PAGE_FORMAT_VERSION.to_le_bytes());
    data[offset + 12..offset + 28].fill(0xFF);

    let crc = crc32_page_header(&data[offset..offset + 28]);
    data[offset + 28..offset + 32].copy_from_slice(&crc.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn singleton(namespace: &str, key: &str, value: Value) -> Namespaces {
        let mut inner = IndexMap::new();
        inner.insert(key.to_string(), value);
        let mut outer = IndexMap::new();
        outer.insert(namespace.to_string(), inner);
        outer
    }

    #[test]
    fn encode_rejects_non_multiple_of_sector_size() {
        let data = singleton("config", "port", Value::U16(1883));
        assert!(matches!(
            encode(&data, 100),
            Err(Error::InvalidPartitionSize(100))
        ));
    }

    #[test]
    fn encode_output_length_matches_requested_size() {
        let data = singleton("config", "port", Value::U16(1883));
        let out = encode(&data, 0x6000).unwrap();
        assert_eq!(out.len(), 0x6000);
    }

    #[test]
    fn empty_namespaces_produce_erased_image() {
        let data: Namespaces = IndexMap::new();
        let out = encode(&data, FLASH_SECTOR_SIZE).unwrap();
        // Page header gets written (state + seq + version + CRC); the rest stays erased.
        assert_eq!(out[32], 0xFF);
    }

    #[test]
    fn page_header_state_and_crc_are_consistent() {
        let data = singleton("config", "port", Value::U16(1883));
        let out = encode(&data, 0x6000).unwrap();
        let state = u32::from_le_bytes(out[0..4].try_into().unwrap());
        assert_eq!(state, PAGE_STATE_ACTIVE);
        let stored_crc = u32::from_le_bytes(out[28..32].try_into().unwrap());
        assert_eq!(stored_crc, crc32_page_header(&out[0..28]));
    }

    #[test]
    fn u16_value_matches_scenario_s1() {
        let data = singleton("config", "port", Value::U16(1883));
        let out = encode(&data, 0x6000).unwrap();
        // Slot 1: namespace def
        let ns_offset = slot_offset(0, 1);
        assert_eq!(out[ns_offset], 0);
        assert_eq!(out[ns_offset + 1], ITEM_TYPE_U8);
        assert_eq!(out[ns_offset + 24], 1);
        // Slot 2: data entry
        let data_offset = slot_offset(0, 2);
        assert_eq!(out[data_offset], 1);
        assert_eq!(out[data_offset + 1], ITEM_TYPE_U16);
        assert_eq!(out[data_offset + 2], 1);
        assert_eq!(&out[data_offset + 24..data_offset + 26], &[0x5B, 0x07]);
    }

    #[test]
    fn short_string_matches_scenario_s2() {
        let data = singleton("config", "ssid", Value::Str("HomeWiFi".to_string()));
        let out = encode(&data, 0x6000).unwrap();
        let header_offset = slot_offset(0, 2);
        assert_eq!(out[header_offset + 1], ITEM_TYPE_STR);
        assert_eq!(out[header_offset + 2], 2);
        assert_eq!(&out[header_offset + 24..header_offset + 26], &[0x09, 0x00]);
        let payload_offset = slot_offset(0, 3);
        assert_eq!(&out[payload_offset..payload_offset + 9], b"HomeWiFi\0");
        assert_eq!(out[payload_offset + 9], 0xFF);
    }

    #[test]
    fn key_too_long_is_rejected() {
        let data = singleton("config", "a_key_that_is_way_too_long", Value::U8(1));
        assert!(matches!(encode(&data, 0x6000), Err(Error::InvalidKey(_))));
    }

    #[test]
    fn overflow_yields_partition_too_small() {
        let mut inner = IndexMap::new();
        for i in 0..200u32 {
            inner.insert(format!("k{i}"), Value::U32(i));
        }
        let mut outer = IndexMap::new();
        outer.insert("config".to_string(), inner);
        assert!(matches!(
            encode(&outer, FLASH_SECTOR_SIZE),
            Err(Error::PartitionTooSmall(_))
        ));
    }

    #[test]
    fn multi_page_string_spans_correctly() {
        let long = "x".repeat(200);
        let data = singleton("config", "blob_key", Value::Str(long.clone()));
        let out = encode(&data, 0x6000).unwrap();
        let header_offset = slot_offset(0, 2);
        assert_eq!(out[header_offset + 2], 8); // 1 + ceil(201/32)
    }
}
