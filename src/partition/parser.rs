use indexmap::IndexMap;

use crate::error::Error;
use crate::partition::consts::*;
use crate::partition::crc::{crc32_entry, crc32_page_header};
use crate::partition::namespace::NamespaceTable;
use crate::partition::Namespaces;
use crate::value::Value;

/// A non-fatal CRC mismatch found by [`decode_verifying`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Page index the mismatch was found in.
    pub page: usize,
    /// Slot index within the page.
    pub slot: usize,
    /// What kind of CRC mismatched.
    pub kind: DiagnosticKind,
}

/// The kind of corruption a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An entry's CRC (bytes 4..8) didn't match the computed CRC of its
    /// 28-byte window.
    CorruptEntry,
    /// A page header's CRC (bytes 28..32) didn't match the computed CRC of
    /// its first 28 bytes.
    CorruptPageHeader,
}

/// Decode an NVS partition binary into its namespace → key → value mapping.
///
/// Per-entry and per-page anomalies (unknown type tags, unrecognized page
/// states, CRC mismatches) are logged via `log::warn!` and skipped rather
/// than treated as fatal; only structural issues (size not a multiple of
/// 4096) return an `Err`. Use [`decode_verifying`] to additionally collect
/// CRC mismatches as diagnostics.
pub(crate) fn decode(data: &[u8]) -> Result<Namespaces, Error> {
    let (namespaces, _) = walk(data, false)?;
    Ok(namespaces)
}

/// Like [`decode`], but also validates every entry and page-header CRC and
/// returns the mismatches as [`Diagnostic`] values alongside the
/// best-effort reconstructed mapping.
pub(crate) fn decode_verifying(data: &[u8]) -> Result<(Namespaces, Vec<Diagnostic>), Error> {
    walk(data, true)
}

fn walk(data: &[u8], verify: bool) -> Result<(Namespaces, Vec<Diagnostic>), Error> {
    if data.is_empty() || !data.len().is_multiple_of(FLASH_SECTOR_SIZE) {
        return Err(Error::InvalidPartitionSize(data.len()));
    }

    let mut namespaces: Namespaces = IndexMap::new();
    let mut table = NamespaceTable::new();
    let mut diagnostics = Vec::new();
    let num_pages = data.len() / FLASH_SECTOR_SIZE;

    for page_idx in 0..num_pages {
        let page_offset = page_idx * FLASH_SECTOR_SIZE;
        let page_data = &data[page_offset..page_offset + FLASH_SECTOR_SIZE];

        let state = read_u32(page_data, 0);
        if state != PAGE_STATE_ACTIVE && state != PAGE_STATE_FULL {
            if state != PAGE_STATE_EMPTY {
                log::warn!("page {page_idx}: unrecognized state 0x{state:08x}, skipping");
            }
            continue;
        }

        if verify {
            let stored = read_u32(page_data, 28);
            let computed = crc32_page_header(&page_data[0..28]);
            if stored != computed {
                diagnostics.push(Diagnostic {
                    page: page_idx,
                    slot: 0,
                    kind: DiagnosticKind::CorruptPageHeader,
                });
            }
        }

        walk_page(page_idx, page_data, verify, &mut table, &mut namespaces, &mut diagnostics)?;
    }

    Ok((namespaces, diagnostics))
}

fn walk_page(
    page_idx: usize,
    page_data: &[u8],
    verify: bool,
    table: &mut NamespaceTable,
    namespaces: &mut Namespaces,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), Error> {
    let mut slot = 1;
    while slot < SLOTS_PER_PAGE {
        let offset = PAGE_HEADER_SIZE + slot * ENTRY_SIZE;
        let entry = &page_data[offset..offset + ENTRY_SIZE];

        let ns_byte = entry[0];
        if ns_byte == 0xFF {
            slot += 1;
            continue;
        }

        let item_type = entry[1];
        let span = entry[2].max(1) as usize;
        let key = match extract_key(&entry[8..24]) {
            Ok(k) => k,
            Err(_) => {
                log::warn!("page {page_idx}, slot {slot}: invalid key, skipping");
                slot += 1;
                continue;
            }
        };
        let payload = &entry[24..32];

        if verify {
            let stored_crc = read_u32(entry, 4);
            let computed_crc = crc32_entry(entry);
            if stored_crc != computed_crc {
                diagnostics.push(Diagnostic {
                    page: page_idx,
                    slot,
                    kind: DiagnosticKind::CorruptEntry,
                });
            }
        }

        if ns_byte == 0 && item_type == ITEM_TYPE_U8 {
            table.record(payload[0], key);
            slot += span;
            continue;
        }

        let namespace = table.resolve(ns_byte);

        match item_type {
            ITEM_TYPE_U8 => insert(namespaces, &namespace, key, Value::U8(payload[0])),
            ITEM_TYPE_I8 => insert(namespaces, &namespace, key, Value::I8(payload[0] as i8)),
            ITEM_TYPE_U16 => insert(namespaces, &namespace, key, Value::U16(read_u16(payload, 0))),
            ITEM_TYPE_I16 => insert(
                namespaces,
                &namespace,
                key,
                Value::I16(read_u16(payload, 0) as i16),
            ),
            ITEM_TYPE_U32 => insert(namespaces, &namespace, key, Value::U32(read_u32(payload, 0))),
            ITEM_TYPE_I32 => insert(
                namespaces,
                &namespace,
                key,
                Value::I32(read_u32(payload, 0) as i32),
            ),
            ITEM_TYPE_STR => {
                let len = read_u16(payload, 0) as usize;
                let bytes = collect_span(page_data, slot, span, len);
                let s = match std::str::from_utf8(&bytes) {
                    Ok(s) => s.trim_end_matches('\0').to_string(),
                    Err(_) => {
                        log::warn!(
                            "page {page_idx}, slot {slot}: invalid UTF-8 in string '{key}', skipping"
                        );
                        slot += span;
                        continue;
                    }
                };
                insert(namespaces, &namespace, key, Value::Str(s));
            }
            ITEM_TYPE_BLOB => {
                let len = read_u16(payload, 0) as usize;
                let bytes = collect_span(page_data, slot, span, len);
                insert(namespaces, &namespace, key, Value::Blob(bytes));
            }
            _ => {
                log::warn!(
                    "page {page_idx}, slot {slot}: unknown type tag 0x{item_type:02x}, skipping"
                );
                slot += 1;
                continue;
            }
        }

        slot += span;
    }

    Ok(())
}

fn insert(namespaces: &mut Namespaces, namespace: &str, key: String, value: Value) {
    namespaces
        .entry(namespace.to_string())
        .or_default()
        .insert(key, value);
}

/// Collect up to `len` bytes from the `span - 1` slots following `slot`.
fn collect_span(page_data: &[u8], slot: usize, span: usize, len: usize) -> Vec<u8> {
    let num_payload_slots = span.saturating_sub(1);
    let mut collected = Vec::with_capacity(num_payload_slots * ENTRY_SIZE);
    for i in 0..num_payload_slots {
        let payload_slot = slot + 1 + i;
        if payload_slot >= SLOTS_PER_PAGE {
            break;
        }
        let offset = PAGE_HEADER_SIZE + payload_slot * ENTRY_SIZE;
        collected.extend_from_slice(&page_data[offset..offset + ENTRY_SIZE]);
    }
    collected.truncate(len.min(collected.len()));
    collected
}

fn extract_key(key_bytes: &[u8]) -> Result<String, Error> {
    let key_len = key_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(key_bytes.len());

    if key_len == 0 || key_len > super::MAX_KEY_LENGTH {
        return Err(Error::InvalidKey("entry has an invalid key length".to_string()));
    }

    let key_str = std::str::from_utf8(&key_bytes[..key_len])
        .map_err(|e| Error::InvalidKey(format!("invalid UTF-8 in key: {e}")))?;

    Ok(key_str.to_string())
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}
