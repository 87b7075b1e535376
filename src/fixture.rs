#![allow(dead_code)]

//! Builds small ZIP archives protected with traditional PKWARE encryption.
//!
//! Test-only. Kept free of crate imports so the integration tests can include it
//! as well, which also makes it an independent check of the decryption code.

use std::io::Write;
use std::path::Path;

use flate2::write::DeflateEncoder;
use flate2::Compression;

pub const MOD_TIME: u16 = 0x7d1c;
pub const MOD_DATE: u16 = 0x5a21;

fn crc32_update(mut crc: u32, byte: u8) -> u32 {
    crc ^= u32::from(byte);
    for _ in 0..8 {
        crc = if crc & 1 != 0 {
            (crc >> 1) ^ 0xedb8_8320
        } else {
            crc >> 1
        };
    }
    crc
}

pub fn crc32_of(data: &[u8]) -> u32 {
    !data.iter().fold(0xffff_ffff, |crc, &b| crc32_update(crc, b))
}

struct Keys([u32; 3]);

impl Keys {
    fn new(password: &[u8]) -> Self {
        let mut keys = Keys([0x1234_5678, 0x2345_6789, 0x3456_7890]);
        for &c in password {
            keys.update(c);
        }
        keys
    }

    fn update(&mut self, c: u8) {
        self.0[0] = crc32_update(self.0[0], c);
        self.0[1] = self.0[1]
            .wrapping_add(self.0[0] & 0xff)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.0[2] = crc32_update(self.0[2], (self.0[1] >> 24) as u8);
    }

    fn encrypt(&mut self, plain: u8) -> u8 {
        let temp = (self.0[2] & 0xffff) | 2;
        let cipher = plain ^ ((temp * (temp ^ 1)) >> 8) as u8;
        self.update(plain);
        cipher
    }
}

pub struct FixtureEntry {
    name: String,
    content: Vec<u8>,
    method: u16,
    payload: Vec<u8>,
    password: Option<Vec<u8>>,
    data_descriptor: bool,
}

impl FixtureEntry {
    pub fn stored(name: &str, content: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            content: content.to_vec(),
            method: 0,
            payload: content.to_vec(),
            password: None,
            data_descriptor: false,
        }
    }

    pub fn deflated(name: &str, content: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content).unwrap();
        Self {
            method: 8,
            payload: encoder.finish().unwrap(),
            ..Self::stored(name, content)
        }
    }

    /// Labels the stored payload with another compression method id.
    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn encrypted(mut self, password: &str) -> Self {
        self.password = Some(password.as_bytes().to_vec());
        self
    }

    pub fn with_data_descriptor(mut self) -> Self {
        self.data_descriptor = true;
        self
    }

    fn flags(&self) -> u16 {
        let mut flags = 0;
        if self.password.is_some() {
            flags |= 1;
        }
        if self.data_descriptor {
            flags |= 1 << 3;
        }
        flags
    }

    fn crc(&self) -> u32 {
        crc32_of(&self.content)
    }

    fn encoded_payload(&self, seed: u8) -> Vec<u8> {
        let password = match &self.password {
            Some(password) => password,
            None => return self.payload.clone(),
        };
        let mut header = [0u8; 12];
        for (i, b) in header.iter_mut().enumerate().take(11) {
            *b = seed.wrapping_mul(31).wrapping_add(i as u8 * 17) ^ 0x5a;
        }
        header[11] = if self.data_descriptor {
            (MOD_TIME >> 8) as u8
        } else {
            (self.crc() >> 24) as u8
        };
        let mut keys = Keys::new(password);
        header
            .iter()
            .chain(self.payload.iter())
            .map(|&b| keys.encrypt(b))
            .collect()
    }
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<FixtureEntry>,
    comment: Vec<u8>,
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: FixtureEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let offset = out.len() as u32;
            let data = entry.encoded_payload(index as u8);
            let crc = entry.crc();
            let compressed_size = data.len() as u32;
            let uncompressed_size = entry.content.len() as u32;

            out.extend_from_slice(b"PK\x03\x04");
            push_u16(&mut out, 20);
            push_u16(&mut out, entry.flags());
            push_u16(&mut out, entry.method);
            push_u16(&mut out, MOD_TIME);
            push_u16(&mut out, MOD_DATE);
            if entry.data_descriptor {
                push_u32(&mut out, 0);
                push_u32(&mut out, 0);
                push_u32(&mut out, 0);
            } else {
                push_u32(&mut out, crc);
                push_u32(&mut out, compressed_size);
                push_u32(&mut out, uncompressed_size);
            }
            push_u16(&mut out, entry.name.len() as u16);
            push_u16(&mut out, 0);
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&data);
            if entry.data_descriptor {
                out.extend_from_slice(b"PK\x07\x08");
                push_u32(&mut out, crc);
                push_u32(&mut out, compressed_size);
                push_u32(&mut out, uncompressed_size);
            }

            central.extend_from_slice(b"PK\x01\x02");
            push_u16(&mut central, 20);
            push_u16(&mut central, 20);
            push_u16(&mut central, entry.flags());
            push_u16(&mut central, entry.method);
            push_u16(&mut central, MOD_TIME);
            push_u16(&mut central, MOD_DATE);
            push_u32(&mut central, crc);
            push_u32(&mut central, compressed_size);
            push_u32(&mut central, uncompressed_size);
            push_u16(&mut central, entry.name.len() as u16);
            push_u16(&mut central, 0);
            push_u16(&mut central, 0);
            push_u16(&mut central, 0);
            push_u16(&mut central, 0);
            push_u32(&mut central, 0);
            push_u32(&mut central, offset);
            central.extend_from_slice(entry.name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(b"PK\x05\x06");
        push_u16(&mut out, 0);
        push_u16(&mut out, 0);
        push_u16(&mut out, self.entries.len() as u16);
        push_u16(&mut out, self.entries.len() as u16);
        push_u32(&mut out, central.len() as u32);
        push_u32(&mut out, cd_offset);
        push_u16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}
