//! DBPF 2.1 package reading and writing.
//!
//! ```text
//! [header: 96 bytes]
//! [resource data ...]
//! [index: flags, constant fields, records]
//! ```

use crate::error::{CodecError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Cursor, Read, Write};
use tgi_model::ResourceKey;

const MAGIC: &[u8; 4] = b"DBPF";
const HEADER_SIZE: usize = 96;
const MAJOR_VERSION: u32 = 2;
const MINOR_VERSION: u32 = 1;
const INDEX_MINOR_VERSION: u32 = 3;

const FLAG_CONSTANT_TYPE: u32 = 0x1;
const FLAG_CONSTANT_GROUP: u32 = 0x2;
const FLAG_CONSTANT_INSTANCE_HIGH: u32 = 0x4;

const EXTENDED_COMPRESSION_BIT: u32 = 0x8000_0000;

pub const COMPRESSION_NONE: u16 = 0x0000;
pub const COMPRESSION_ZLIB: u16 = 0x5A42;
pub const COMPRESSION_REFPACK: u16 = 0xFFFF;
pub const COMPRESSION_DELETED: u16 = 0xFFE0;

/// One resource read out of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRecord {
    pub key: ResourceKey,
    /// Inflated bytes; the stored bytes when the entry could not be inflated.
    pub data: Vec<u8>,
    pub compression: u16,
    /// Set when `data` is still compressed (unsupported or failed inflate).
    pub inflate_error: Option<String>,
}

/// Cheap check for the package magic.
#[must_use]
pub fn is_container(bytes: &[u8]) -> bool {
    bytes.len() >= HEADER_SIZE && bytes.starts_with(MAGIC)
}

/// Read every live record from a package.
pub fn decode_container(bytes: &[u8]) -> Result<Vec<ContainerRecord>> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::truncated("package header"));
    }
    if !bytes.starts_with(MAGIC) {
        return Err(CodecError::InvalidMagic {
            expected: "DBPF",
            found: String::from_utf8_lossy(&bytes[..4]).into_owned(),
        });
    }

    let mut header = Cursor::new(&bytes[..HEADER_SIZE]);
    header.set_position(4);
    let major = header.read_u32::<LittleEndian>()?;
    if major != MAJOR_VERSION {
        return Err(CodecError::UnsupportedVersion {
            format: "DBPF",
            version: major,
        });
    }

    header.set_position(36);
    let entry_count = header.read_u32::<LittleEndian>()?;
    let legacy_index_position = header.read_u32::<LittleEndian>()?;
    header.set_position(64);
    let index_position = match header.read_u64::<LittleEndian>()? {
        0 => u64::from(legacy_index_position),
        position => position,
    };

    if entry_count == 0 {
        return Ok(Vec::new());
    }

    let index_start =
        usize::try_from(index_position).map_err(|_| CodecError::truncated("package index"))?;
    let index = bytes
        .get(index_start..)
        .ok_or_else(|| CodecError::truncated("package index"))?;
    let mut cursor = Cursor::new(index);

    let flags = cursor
        .read_u32::<LittleEndian>()
        .map_err(CodecError::eof("package index"))?;
    let constant_type = read_constant(&mut cursor, flags, FLAG_CONSTANT_TYPE)?;
    let constant_group = read_constant(&mut cursor, flags, FLAG_CONSTANT_GROUP)?;
    let constant_instance_high = read_constant(&mut cursor, flags, FLAG_CONSTANT_INSTANCE_HIGH)?;

    let mut records = Vec::with_capacity(entry_count.min(65_536) as usize);
    for _ in 0..entry_count {
        let type_id = read_field(&mut cursor, constant_type)?;
        let group = read_field(&mut cursor, constant_group)?;
        let instance_high = read_field(&mut cursor, constant_instance_high)?;
        let instance_low = read_field(&mut cursor, None)?;
        let position = read_field(&mut cursor, None)? as usize;
        let raw_size = read_field(&mut cursor, None)?;
        let memory_size = read_field(&mut cursor, None)? as usize;

        let compression = if raw_size & EXTENDED_COMPRESSION_BIT != 0 {
            let compression = cursor
                .read_u16::<LittleEndian>()
                .map_err(CodecError::eof("package index record"))?;
            let _committed = cursor
                .read_u16::<LittleEndian>()
                .map_err(CodecError::eof("package index record"))?;
            compression
        } else {
            COMPRESSION_NONE
        };

        if compression == COMPRESSION_DELETED {
            continue;
        }

        let key = ResourceKey::new(
            type_id,
            group,
            (u64::from(instance_high) << 32) | u64::from(instance_low),
        );
        let stored_size = (raw_size & !EXTENDED_COMPRESSION_BIT) as usize;
        let stored: &[u8] = match bytes.get(position..position.saturating_add(stored_size)) {
            Some(stored) => stored,
            None => {
                log::warn!("Resource {key} points outside the package; keeping it empty");
                &[]
            }
        };

        records.push(inflate_record(key, stored, compression, memory_size));
    }

    Ok(records)
}

fn read_constant(cursor: &mut Cursor<&[u8]>, flags: u32, bit: u32) -> Result<Option<u32>> {
    if flags & bit == 0 {
        return Ok(None);
    }
    cursor
        .read_u32::<LittleEndian>()
        .map(Some)
        .map_err(CodecError::eof("package index constants"))
}

fn read_field(cursor: &mut Cursor<&[u8]>, constant: Option<u32>) -> Result<u32> {
    match constant {
        Some(value) => Ok(value),
        None => cursor
            .read_u32::<LittleEndian>()
            .map_err(CodecError::eof("package index record")),
    }
}

fn inflate_record(
    key: ResourceKey,
    stored: &[u8],
    compression: u16,
    memory_size: usize,
) -> ContainerRecord {
    let (data, inflate_error) = match compression {
        COMPRESSION_NONE => (stored.to_vec(), None),
        COMPRESSION_ZLIB => match inflate_zlib(stored, memory_size) {
            Ok(data) => (data, None),
            Err(err) => {
                log::warn!("Failed to inflate {key}: {err}");
                (stored.to_vec(), Some(err.to_string()))
            }
        },
        other => {
            let err = CodecError::UnsupportedCompression(other);
            log::warn!("Cannot inflate {key}: {err}");
            (stored.to_vec(), Some(err.to_string()))
        }
    };

    ContainerRecord {
        key,
        data,
        compression,
        inflate_error,
    }
}

fn inflate_zlib(stored: &[u8], memory_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(memory_size.min(64 * 1024 * 1024));
    ZlibDecoder::new(stored).read_to_end(&mut out)?;
    if out.len() != memory_size {
        log::debug!(
            "Inflated size {} differs from recorded size {}",
            out.len(),
            memory_size
        );
    }
    Ok(out)
}

/// Write a DBPF 2.1 package holding `entries` in order.
pub fn encode_container(entries: &[(ResourceKey, Vec<u8>)], compress: bool) -> Result<Vec<u8>> {
    let mut out = vec![0u8; HEADER_SIZE];
    let mut records = Vec::with_capacity(entries.len());

    for (key, data) in entries {
        let position = to_u32(out.len(), "package size")?;
        let (stored, compression) = if compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            (encoder.finish()?, COMPRESSION_ZLIB)
        } else {
            (data.clone(), COMPRESSION_NONE)
        };
        records.push((
            *key,
            position,
            to_u32(stored.len(), "resource size")?,
            to_u32(data.len(), "resource size")?,
            compression,
        ));
        out.extend_from_slice(&stored);
    }

    let index_position = out.len();
    out.write_u32::<LittleEndian>(0)?;
    for (key, position, stored_size, memory_size, compression) in &records {
        out.write_u32::<LittleEndian>(key.type_id)?;
        out.write_u32::<LittleEndian>(key.group)?;
        out.write_u32::<LittleEndian>((key.instance >> 32) as u32)?;
        out.write_u32::<LittleEndian>(key.instance as u32)?;
        out.write_u32::<LittleEndian>(*position)?;
        out.write_u32::<LittleEndian>(stored_size | EXTENDED_COMPRESSION_BIT)?;
        out.write_u32::<LittleEndian>(*memory_size)?;
        out.write_u16::<LittleEndian>(*compression)?;
        out.write_u16::<LittleEndian>(1)?;
    }
    let index_size = to_u32(out.len() - index_position, "package index")?;

    let mut header = Cursor::new(&mut out[..HEADER_SIZE]);
    header.write_all(MAGIC)?;
    header.write_u32::<LittleEndian>(MAJOR_VERSION)?;
    header.write_u32::<LittleEndian>(MINOR_VERSION)?;
    header.set_position(36);
    header.write_u32::<LittleEndian>(to_u32(records.len(), "entry count")?)?;
    header.set_position(44);
    header.write_u32::<LittleEndian>(index_size)?;
    header.set_position(60);
    header.write_u32::<LittleEndian>(INDEX_MINOR_VERSION)?;
    header.write_u64::<LittleEndian>(index_position as u64)?;

    Ok(out)
}

fn to_u32(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| CodecError::TooLarge(what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_entries() -> Vec<(ResourceKey, Vec<u8>)> {
        vec![
            (
                ResourceKey::new(0x6017_E896, 0, 0x0123_4567_89AB_CDEF),
                b"<I n=\"buff\" />".to_vec(),
            ),
            (
                ResourceKey::new(0x2205_57DA, 0x8000_0000, 0x0700_0000_0000_0001),
                vec![7u8; 300],
            ),
        ]
    }

    #[test]
    fn compressed_package_reads_back() {
        let entries = sample_entries();
        let bytes = encode_container(&entries, true).expect("encode");
        assert!(is_container(&bytes));

        let records = decode_container(&bytes).expect("decode");
        assert_eq!(records.len(), 2);
        for (record, (key, data)) in records.iter().zip(&entries) {
            assert_eq!(record.key, *key);
            assert_eq!(&record.data, data);
            assert_eq!(record.compression, COMPRESSION_ZLIB);
            assert_eq!(record.inflate_error, None);
        }
    }

    #[test]
    fn reads_constant_type_index() {
        let payload = b"hello".to_vec();
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.extend_from_slice(&payload);
        let index_position = bytes.len() as u64;
        bytes.write_u32::<LittleEndian>(FLAG_CONSTANT_TYPE).unwrap();
        bytes.write_u32::<LittleEndian>(0x00B2_D882).unwrap();
        bytes.write_u32::<LittleEndian>(5).unwrap(); // group
        bytes.write_u32::<LittleEndian>(0).unwrap(); // instance high
        bytes.write_u32::<LittleEndian>(9).unwrap(); // instance low
        bytes.write_u32::<LittleEndian>(HEADER_SIZE as u32).unwrap();
        bytes.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        bytes.write_u32::<LittleEndian>(payload.len() as u32).unwrap();

        bytes[..4].copy_from_slice(MAGIC);
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());
        bytes[36..40].copy_from_slice(&1u32.to_le_bytes());
        bytes[64..72].copy_from_slice(&index_position.to_le_bytes());

        let records = decode_container(&bytes).expect("decode");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, ResourceKey::new(0x00B2_D882, 5, 9));
        assert_eq!(records[0].data, payload);
    }

    #[test]
    fn corrupt_zlib_keeps_stored_bytes() {
        let key = ResourceKey::new(0x2205_57DA, 0, 1);
        let mut bytes = encode_container(&[(key, b"string table".to_vec())], true).expect("encode");
        // Stomp on the zlib stream header.
        bytes[HEADER_SIZE] = 0xFF;
        bytes[HEADER_SIZE + 1] = 0xFF;

        let records = decode_container(&bytes).expect("decode");
        assert_eq!(records.len(), 1);
        assert!(records[0].inflate_error.is_some());
    }

    #[test]
    fn rejects_non_packages() {
        assert!(matches!(
            decode_container(b"DBPF"),
            Err(CodecError::Truncated(_))
        ));
        let not_a_package = vec![b'X'; HEADER_SIZE];
        assert!(matches!(
            decode_container(&not_a_package),
            Err(CodecError::InvalidMagic { .. })
        ));
    }
}
