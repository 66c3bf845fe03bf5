//! Little-endian framing helpers for the binary persistence format.
//!
//! The on-disk layout uses signed 32-bit counts and IEEE-754 f32 values
//! throughout (see the crate docs for the full layout). Length fields are
//! validated before any allocation so a corrupt file cannot request an
//! absurd buffer.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{ProximaError, Result};

/// Write a length or count as `i32`.
pub(crate) fn write_len(out: &mut dyn Write, len: usize) -> Result<()> {
    let v = i32::try_from(len).map_err(|_| {
        ProximaError::InvalidParameter(format!("length {len} exceeds the i32 wire range"))
    })?;
    out.write_i32::<LittleEndian>(v)?;
    Ok(())
}

/// Read a length or count written by [`write_len`]; negative values are
/// reported as corruption, naming the field in `what`.
pub(crate) fn read_len(input: &mut dyn Read, what: &str) -> Result<usize> {
    let v = input.read_i32::<LittleEndian>()?;
    if v < 0 {
        return Err(ProximaError::CorruptIndex(format!("negative {what}: {v}")));
    }
    Ok(v as usize)
}

pub(crate) fn write_f32(out: &mut dyn Write, value: f32) -> Result<()> {
    out.write_f32::<LittleEndian>(value)?;
    Ok(())
}

pub(crate) fn read_f32(input: &mut dyn Read) -> Result<f32> {
    Ok(input.read_f32::<LittleEndian>()?)
}

pub(crate) fn write_f32_slice(out: &mut dyn Write, values: &[f32]) -> Result<()> {
    for &v in values {
        out.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

pub(crate) fn read_f32_vec(input: &mut dyn Read, n: usize) -> Result<Vec<f32>> {
    let mut values = vec![0.0_f32; n];
    input.read_f32_into::<LittleEndian>(&mut values)?;
    Ok(values)
}

/// Write an id list as `(len: i32, ids: i32 × len)`.
pub(crate) fn write_ids(out: &mut dyn Write, ids: &[u32]) -> Result<()> {
    write_len(out, ids.len())?;
    for &id in ids {
        let v = i32::try_from(id).map_err(|_| {
            ProximaError::InvalidParameter(format!("id {id} exceeds the i32 wire range"))
        })?;
        out.write_i32::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Read an id list written by [`write_ids`].
pub(crate) fn read_ids(input: &mut dyn Read, what: &str) -> Result<Vec<u32>> {
    let len = read_len(input, what)?;
    let mut ids = Vec::with_capacity(len);
    for _ in 0..len {
        let v = input.read_i32::<LittleEndian>()?;
        if v < 0 {
            return Err(ProximaError::CorruptIndex(format!("negative id in {what}: {v}")));
        }
        ids.push(v as u32);
    }
    Ok(ids)
}

/// Write a bool as a single byte.
pub(crate) fn write_bool(out: &mut dyn Write, value: bool) -> Result<()> {
    out.write_u8(u8::from(value))?;
    Ok(())
}

/// Read a bool byte; anything outside `{0, 1}` is corruption.
pub(crate) fn read_bool(input: &mut dyn Read, what: &str) -> Result<bool> {
    match input.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        tag => Err(ProximaError::CorruptIndex(format!(
            "invalid {what} tag byte: {tag:#04x}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn len_round_trip() {
        let mut buf = Vec::new();
        write_len(&mut buf, 42).unwrap();
        assert_eq!(buf, 42_i32.to_le_bytes());
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_len(&mut cursor, "count").unwrap(), 42);
    }

    #[test]
    fn negative_len_is_corruption() {
        let mut cursor = Cursor::new((-3_i32).to_le_bytes().to_vec());
        let err = read_len(&mut cursor, "bucket size").unwrap_err();
        assert!(matches!(err, ProximaError::CorruptIndex(_)));
    }

    #[test]
    fn ids_round_trip() {
        let ids = vec![0_u32, 7, 123];
        let mut buf = Vec::new();
        write_ids(&mut buf, &ids).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_ids(&mut cursor, "bucket").unwrap(), ids);
    }

    #[test]
    fn bool_tag_validation() {
        let mut cursor = Cursor::new(vec![2_u8]);
        let err = read_bool(&mut cursor, "leaf").unwrap_err();
        assert!(matches!(err, ProximaError::CorruptIndex(_)));
    }

    #[test]
    fn truncated_f32_read_is_io_error() {
        let mut cursor = Cursor::new(vec![0_u8, 0]);
        let err = read_f32_vec(&mut cursor, 1).unwrap_err();
        assert!(matches!(err, ProximaError::Io(_)));
    }
}
