use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32};
use nom::sequence::tuple;
use nom::IResult;

use crate::error::ArchiveError;

// Good introduction:
// https://games.greggman.com/game/zip-rant/

// To see info about an archive:
// unzip -Zv plaintext.zip

pub const FLAG_ENCRYPTED: u16 = 1;
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

const EOCD_SIGNATURE: &[u8; 4] = b"PK\x05\x06";
const EOCD_MIN_SIZE: usize = 22;
const CDFH_FIXED_SIZE: usize = 46;
const LFH_FIXED_SIZE: usize = 30;

#[derive(Debug)]
pub struct LocalFileHeader {
    pub general_purpose_bit_flag: u16,
    pub compression_method: u16,
}

pub fn parse_local_file_header(input: &[u8]) -> IResult<&[u8], LocalFileHeader> {
    let (input, _) = tag("PK\x03\x04")(input)?;
    // version, flags, method, time, date, crc, sizes
    let (input, fields) = tuple((
        le_u16, le_u16, le_u16, le_u16, le_u16, le_u32, le_u32, le_u32,
    ))(input)?;
    let (input, file_name_length) = le_u16(input)?;
    let (input, extra_field_length) = le_u16(input)?;
    // Skip the variable part so the remaining input starts at the file data
    let (input, _) = take(file_name_length)(input)?;
    let (input, _) = take(extra_field_length)(input)?;
    Ok((
        input,
        LocalFileHeader {
            general_purpose_bit_flag: fields.1,
            compression_method: fields.2,
        },
    ))
}

#[derive(Debug)]
pub struct CentralDirectoryFileHeader {
    pub general_purpose_bit_flag: u16,
    pub compression_method: u16,
    pub last_mod_file_time: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub relative_offset_of_local_header: u32,
    pub file_name: String,
}

pub fn parse_central_directory_file_header(
    input: &[u8],
) -> IResult<&[u8], CentralDirectoryFileHeader> {
    let (input, _) = tag("PK\x01\x02")(input)?;
    let (input, fields) = tuple((
        le_u16, le_u16, le_u16, le_u16, le_u16, le_u16, le_u32, le_u32, le_u32, le_u16, le_u16,
        le_u16, le_u16, le_u16, le_u32, le_u32,
    ))(input)?;
    let (input, file_name) = take(fields.9)(input)?;
    let (input, _extra_field) = take(fields.10)(input)?;
    let (input, _file_comment) = take(fields.11)(input)?;
    Ok((
        input,
        CentralDirectoryFileHeader {
            general_purpose_bit_flag: fields.2,
            compression_method: fields.3,
            last_mod_file_time: fields.4,
            crc32: fields.6,
            compressed_size: fields.7,
            uncompressed_size: fields.8,
            relative_offset_of_local_header: fields.15,
            file_name: String::from_utf8_lossy(file_name).into_owned(),
        },
    ))
}

#[derive(Debug)]
pub struct EndOfCentralDirectoryRecord {
    // total number of entries in the central directory
    pub cd_num_entries: u16,
    // size of the central directory
    pub cd_size: u32,
    // offset of start of central directory with respect to the starting disk number
    pub cd_offset: u32,
}

pub fn parse_end_of_central_directory_record(
    input: &[u8],
) -> IResult<&[u8], EndOfCentralDirectoryRecord> {
    let (input, _) = tag(&EOCD_SIGNATURE[..])(input)?;
    let (input, fields) = tuple((le_u16, le_u16, le_u16, le_u16, le_u32, le_u32))(input)?;
    Ok((
        input,
        EndOfCentralDirectoryRecord {
            cd_num_entries: fields.3,
            cd_size: fields.4,
            cd_offset: fields.5,
        },
    ))
}

/// The first entry of an archive, with its payload.
///
/// Sizes, CRC and flags come from the central directory, since the local header may
/// leave them zeroed when a data descriptor follows the payload.
pub struct Entry {
    pub file_name: String,
    pub general_purpose_bit_flag: u16,
    pub compression_method: u16,
    pub last_mod_file_time: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    /// Compressed payload. Starts with the 12-byte encryption header if encrypted.
    pub data: Vec<u8>,
}

impl Entry {
    pub fn is_encrypted(&self) -> bool {
        self.general_purpose_bit_flag & FLAG_ENCRYPTED == FLAG_ENCRYPTED
    }

    /// The byte the last decrypted header byte must equal for a candidate password.
    pub fn check_byte(&self) -> u8 {
        if self.general_purpose_bit_flag & FLAG_DATA_DESCRIPTOR != 0 {
            (self.last_mod_file_time >> 8) as u8
        } else {
            (self.crc32 >> 24) as u8
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File name: {}", self.file_name)?;
        writeln!(f, "Encrypted: {}", self.is_encrypted())?;
        writeln!(f, "Flags: {:#06x}", self.general_purpose_bit_flag)?;
        writeln!(f, "Compression method: {}", self.compression_method)?;
        writeln!(f, "CRC-32: {:#010x}", self.crc32)?;
        writeln!(f, "Compressed size: {}", self.compressed_size)?;
        write!(f, "Uncompressed size: {}", self.uncompressed_size)
    }
}

fn malformed(e: impl fmt::Display) -> ArchiveError {
    ArchiveError::Malformed(e.to_string())
}

/// Finds the end of central directory record. It is followed by a comment of at
/// most 64k whose length field must reach exactly to the end of the input.
fn find_eocd(input: &[u8]) -> Option<usize> {
    let last = input.len().checked_sub(EOCD_MIN_SIZE)?;
    let first = last.saturating_sub(usize::from(u16::MAX));
    (first..=last).rev().find(|&i| {
        let comment_length = u16::from_le_bytes([input[i + 20], input[i + 21]]);
        input[i..].starts_with(EOCD_SIGNATURE)
            && i + EOCD_MIN_SIZE + usize::from(comment_length) == input.len()
    })
}

fn length_field(record: &[u8], offset: usize) -> usize {
    usize::from(u16::from_le_bytes([record[offset], record[offset + 1]]))
}

/// Positioned reads that never go past the end of the archive.
struct ArchiveReader<'r, R> {
    inner: &'r mut R,
    len: u64,
}

impl<R: Read + Seek> ArchiveReader<'_, R> {
    fn read_at(&mut self, offset: u64, len: usize, what: &str) -> Result<Vec<u8>, ArchiveError> {
        let end = offset.checked_add(len as u64);
        if end.map_or(true, |end| end > self.len) {
            return Err(malformed(format_args!("{} is out of range", what)));
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0; len];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Reads a record made of a fixed part followed by variable-length fields
    /// whose lengths are stored in the fixed part.
    fn read_record(
        &mut self,
        offset: u64,
        fixed_len: usize,
        length_fields: &[usize],
        what: &str,
    ) -> Result<Vec<u8>, ArchiveError> {
        let mut record = self.read_at(offset, fixed_len, what)?;
        let variable_len = length_fields.iter().map(|&i| length_field(&record, i)).sum();
        let rest = self.read_at(offset + fixed_len as u64, variable_len, what)?;
        record.extend_from_slice(&rest);
        Ok(record)
    }
}

/// Reads the first entry of an archive.
///
/// Only the end of central directory record, the first central directory header and
/// the first entry itself are read, whatever the size of the archive.
pub fn first_entry<R: Read + Seek>(reader: &mut R) -> Result<Entry, ArchiveError> {
    let len = reader.seek(SeekFrom::End(0))?;
    let mut archive = ArchiveReader { inner: reader, len };

    let tail_len = len.min((EOCD_MIN_SIZE + usize::from(u16::MAX)) as u64);
    let tail = archive.read_at(len - tail_len, tail_len as usize, "archive")?;
    let eocd_start =
        find_eocd(&tail).ok_or_else(|| malformed("end of central directory not found"))?;
    let (_, eocd) = parse_end_of_central_directory_record(&tail[eocd_start..])
        .map_err(|_| malformed("invalid end of central directory record"))?;
    if eocd.cd_num_entries == 0 {
        return Err(ArchiveError::Empty);
    }
    if eocd.cd_num_entries == u16::MAX || eocd.cd_offset == u32::MAX || eocd.cd_size == u32::MAX {
        return Err(malformed("zip64 archives are not supported"));
    }

    let cd = archive.read_record(
        u64::from(eocd.cd_offset),
        CDFH_FIXED_SIZE,
        &[28, 30, 32],
        "central directory",
    )?;
    let (_, cdfh) = parse_central_directory_file_header(&cd)
        .map_err(|_| malformed("invalid central directory file header"))?;
    if cdfh.compressed_size == u32::MAX || cdfh.relative_offset_of_local_header == u32::MAX {
        return Err(malformed("zip64 entries are not supported"));
    }

    let local_offset = u64::from(cdfh.relative_offset_of_local_header);
    let local = archive.read_record(local_offset, LFH_FIXED_SIZE, &[26, 28], "local header")?;
    let (_, local_file_header) =
        parse_local_file_header(&local).map_err(|_| malformed("invalid local file header"))?;
    if local_file_header.compression_method != cdfh.compression_method
        || (local_file_header.general_purpose_bit_flag ^ cdfh.general_purpose_bit_flag)
            & FLAG_ENCRYPTED
            != 0
    {
        return Err(malformed("local and central headers disagree"));
    }
    let compressed_size = usize::try_from(cdfh.compressed_size).map_err(malformed)?;
    let data = archive.read_at(local_offset + local.len() as u64, compressed_size, "entry data")?;

    Ok(Entry {
        file_name: cdfh.file_name,
        general_purpose_bit_flag: cdfh.general_purpose_bit_flag,
        compression_method: cdfh.compression_method,
        last_mod_file_time: cdfh.last_mod_file_time,
        crc32: cdfh.crc32,
        compressed_size: cdfh.compressed_size,
        uncompressed_size: cdfh.uncompressed_size,
        data,
    })
}

/// Opens the archive at `path` and reads its first entry.
pub fn open_first_entry(path: &Path) -> Result<Entry, ArchiveError> {
    first_entry(&mut File::open(path)?)
}
