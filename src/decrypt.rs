use std::borrow::Cow;
use std::io::Read;
use std::num::Wrapping;

use arrayvec::ArrayVec;
use flate2::read::DeflateDecoder;

use crate::error::ArchiveError;
use crate::zipfile::Entry;

pub const ENCRYPTION_HEADER_LEN: usize = 12;
pub const INITIAL_KEYS: [u32; 3] = [305419896, 591751049, 878082192];

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

const fn crc32_byte(mut byte: u8) -> u32 {
    byte = byte.reverse_bits();
    let mut value = (byte as u32) << 24;
    let mut i = 0;
    while i < 8 {
        value = (value << 1) ^ ((value >> 31) * 0x04c11db7);
        i += 1;
    }
    value = value.reverse_bits();
    value
}

const fn crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc32_byte(i as u8);
        i += 1;
    }
    table
}

const CRC_32_TAB: &[u32; 256] = &crc32_table();

/// One step of the raw CRC-32 register, without pre- and post-inversion.
pub const fn crc32(crc: u32, byte: u8) -> u32 {
    let index = crc as u8 ^ byte;
    CRC_32_TAB[index as usize] ^ (crc >> 8)
}

/// The CRC-32 checksum of a buffer as stored in ZIP headers.
pub fn crc32_of(data: &[u8]) -> u32 {
    !data.iter().fold(!0, |crc, &b| crc32(crc, b))
}

#[inline(always)]
pub fn update_keys(keys: &mut [u32; 3], c: u8) {
    keys[0] = crc32(keys[0], c);
    keys[1] = (Wrapping(keys[1]) + Wrapping(keys[0] & 0x000000ff)).0;
    keys[1] = (Wrapping(keys[1]) * Wrapping(134775813) + Wrapping(1)).0;
    keys[2] = crc32(keys[2], (keys[1] >> 24) as u8);
}

#[inline(always)]
pub fn decrypt_byte(key2: u32) -> u8 {
    let temp = key2 as u16 | 2;
    let res = (Wrapping(temp) * Wrapping(temp ^ 1)).0 >> 8;
    res as u8
}

/// 6.1.5 Initializing the encryption keys
pub fn init_keys(password: &[u8]) -> [u32; 3] {
    let mut keys = INITIAL_KEYS;
    for &c in password {
        update_keys(&mut keys, c);
    }
    keys
}

/// Decrypts the encryption header and compares its last byte to `check_byte`.
///
/// On a match, returns the keys advanced past the header, ready for the payload.
/// Roughly one wrong password in 256 passes this check.
pub fn header_matches(mut keys: [u32; 3], header: &[u8], check_byte: u8) -> Option<[u32; 3]> {
    // 6.1.6 Decrypting the encryption header
    let mut plain = ArrayVec::<u8, ENCRYPTION_HEADER_LEN>::new();
    for &b in header.iter().take(ENCRYPTION_HEADER_LEN) {
        let c = b ^ decrypt_byte(keys[2]);
        update_keys(&mut keys, c);
        plain.push(c);
    }
    if plain.is_full() && plain.last() == Some(&check_byte) {
        Some(keys)
    } else {
        None
    }
}

pub fn decrypt(mut keys: [u32; 3], data: &[u8]) -> Vec<u8> {
    data.iter()
        .map(|&b| {
            let c = b ^ decrypt_byte(keys[2]);
            update_keys(&mut keys, c);
            c
        })
        .collect()
}

fn inflate(data: &[u8], expected_len: u32) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    // One byte more than expected is enough to notice an oversized stream
    DeflateDecoder::new(data)
        .take(u64::from(expected_len) + 1)
        .read_to_end(&mut out)?;
    Ok(out)
}

/// Tries to fully decode an entry with the given password.
///
/// `Ok(true)` means the payload decrypted, decompressed and matched its size and
/// CRC-32. An entry that is not encrypted decodes under any password.
pub fn entry_decodes(entry: &Entry, password: &[u8]) -> Result<bool, ArchiveError> {
    if entry.compression_method != METHOD_STORED && entry.compression_method != METHOD_DEFLATED {
        return Err(ArchiveError::UnsupportedMethod(entry.compression_method));
    }

    let payload = if entry.is_encrypted() {
        if entry.data.len() < ENCRYPTION_HEADER_LEN {
            return Err(ArchiveError::Malformed(
                "encrypted entry is shorter than its header".into(),
            ));
        }
        let (header, data) = entry.data.split_at(ENCRYPTION_HEADER_LEN);
        match header_matches(init_keys(password), header, entry.check_byte()) {
            Some(keys) => Cow::Owned(decrypt(keys, data)),
            None => return Ok(false),
        }
    } else {
        Cow::Borrowed(&entry.data[..])
    };

    let content = if entry.compression_method == METHOD_DEFLATED {
        match inflate(&payload, entry.uncompressed_size) {
            Ok(content) => Cow::Owned(content),
            // Garbage from a wrong password rarely forms a valid deflate stream
            Err(_) => return Ok(false),
        }
    } else {
        payload
    };

    Ok(content.len() as u64 == u64::from(entry.uncompressed_size)
        && crc32_of(&content) == entry.crc32)
}
