use core::mem::size_of;

use zerocopy::FromBytes;

use crate::errors::*;

/// Read one fixed-size record at `offset`. Fails with
/// [`SectionReadError::TruncatedInput`] when fewer than `size_of::<T>()`
/// bytes remain; short input never yields a zero-filled value.
pub(crate) fn read_at<T: FromBytes + Copy>(
    data: &[u8], offset: usize,
) -> Result<T, SectionReadError> {
    let tail = data.get(offset..).unwrap_or(&[]);
    T::read_from_prefix(tail).map(|(value, _)| value).map_err(|_| {
        SectionReadError::TruncatedInput {
            offset,
            needed: size_of::<T>(),
            available: tail.len(),
        }
    })
}

/// Borrow `len` raw bytes at `offset` with the same truncation discipline
/// as [`read_at`].
pub(crate) fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8], SectionReadError> {
    let end = offset.checked_add(len).ok_or(SectionReadError::TruncatedInput {
        offset,
        needed: len,
        available: data.len().saturating_sub(offset),
    })?;
    data.get(offset..end).ok_or(SectionReadError::TruncatedInput {
        offset,
        needed: len,
        available: data.len().saturating_sub(offset),
    })
}

/// Decode `units` UTF-16LE code units starting at `offset`. The length is
/// counted externally; there is no terminator.
pub(crate) fn read_utf16_at(
    data: &[u8], offset: usize, units: usize,
) -> Result<String, SectionReadError> {
    let bytes = slice_at(data, offset, units * 2)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| {
        SectionReadError::Malformed(format!("invalid utf-16 string at offset {offset:#x}"))
    })
}

/// Encode a string as UTF-16LE code units, no terminator.
pub(crate) fn utf16_bytes<S: AsRef<str>>(string: S) -> Vec<u8> {
    string.as_ref().encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// Number of UTF-16 code units the string encodes to.
pub(crate) fn utf16_units(string: &str) -> usize { string.encode_utf16().count() }

/// Narrow a value into a 16-bit field, failing instead of wrapping.
pub(crate) fn fit_u16(field: &'static str, value: u64) -> Result<u16, ValueOutOfRange> {
    u16::try_from(value).map_err(|_| ValueOutOfRange { field, width: 16, value })
}

/// Narrow a value into a 32-bit field, failing instead of wrapping.
pub(crate) fn fit_u32(field: &'static str, value: u64) -> Result<u32, ValueOutOfRange> {
    u32::try_from(value).map_err(|_| ValueOutOfRange { field, width: 32, value })
}

/// Narrow a value into an offset field whose high bit is reserved as the
/// subdirectory/name discriminator.
pub(crate) fn fit_offset31(field: &'static str, value: u64) -> Result<u32, ValueOutOfRange> {
    if value < u64::from(crate::constants::RESOURCE_FLAG_BIT) {
        Ok(value as u32)
    } else {
        Err(ValueOutOfRange { field, width: 31, value })
    }
}
