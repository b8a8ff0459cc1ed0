/// Compute an NVS entry CRC over all bytes except the CRC field at offset 4..8,
/// i.e. the 28-byte window `{0..=3} ∪ {8..=31}`.
///
/// # Panics
/// Panics if `entry_data` is shorter than 32 bytes.
pub fn crc32_entry(entry_data: &[u8]) -> u32 {
    assert!(
        entry_data.len() >= 32,
        "crc32_entry requires at least 32 bytes, got {}",
        entry_data.len()
    );
    let mut combined = [0u8; 28];
    combined[..4].copy_from_slice(&entry_data[0..4]);
    combined[4..].copy_from_slice(&entry_data[8..32]);
    crc32(&combined)
}

/// Compute a page header CRC over bytes 0..=27 of the header (state,
/// sequence, version, and the reserved padding — everything but the CRC
/// field itself at offset 28).
///
/// # Panics
/// Panics if `header_data` is shorter than 28 bytes.
pub fn crc32_page_header(header_data: &[u8]) -> u32 {
    assert!(
        header_data.len() >= 28,
        "crc32_page_header requires at least 28 bytes, got {}",
        header_data.len()
    );
    crc32(&header_data[..28])
}

/// CRC32 using the IEEE 802.3 polynomial (0xEDB88320, bit-reversed 0x04C11DB7),
/// init `0xFFFFFFFF`, final XOR `0xFFFFFFFF`.
///
/// This function is intentionally public so that callers can verify or
/// compute CRCs over NVS data independently of the higher-level partition
/// APIs.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFFFFFF;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB88320;
            } else {
                crc >>= 1;
            }
        }
    }

    !crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_of_empty_slice() {
        assert_eq!(crc32(&[]), 0x0000_0000);
    }

    #[test]
    fn crc32_known_vector() {
        // CRC-32/ISO-HDLC of b"123456789" is the textbook check value.
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn entry_crc_excludes_its_own_field() {
        let mut entry = [0xFFu8; 32];
        entry[0] = 0x01;
        let crc_with_junk_in_field = crc32_entry(&entry);
        entry[4..8].copy_from_slice(&[0x11, 0x22, 0x33, 0x44]);
        let crc_with_different_junk = crc32_entry(&entry);
        assert_eq!(crc_with_junk_in_field, crc_with_different_junk);
    }
}
