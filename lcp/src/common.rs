use crate::{LcpError, LcpErrorCode, Result};

pub(crate) fn read_i32_le(bytes: &[u8], offset: usize) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array(bytes, offset, "i32")?))
}

pub(crate) fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(bytes, offset, "u16")?))
}

pub(crate) fn read_f64_le(bytes: &[u8], offset: usize) -> Result<f64> {
    Ok(f64::from_le_bytes(read_array(bytes, offset, "f64")?))
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize, kind: &str) -> Result<[u8; N]> {
    let value_bytes = bytes.get(offset..offset + N).ok_or_else(|| {
        LcpError::new(
            LcpErrorCode::Format,
            format!("Could not read {kind} field at offset {offset}."),
        )
    })?;
    value_bytes.try_into().map_err(|_| {
        LcpError::new(
            LcpErrorCode::Format,
            format!("Could not parse {kind} field bytes at offset {offset}."),
        )
    })
}

/// Reads a null-terminated string from a fixed-width slot. The last byte of
/// the slot is always treated as a terminator.
pub(crate) fn read_fixed_str(bytes: &[u8], offset: usize, width: usize) -> Result<String> {
    let slot = bytes.get(offset..offset + width).ok_or_else(|| {
        LcpError::new(
            LcpErrorCode::Format,
            format!("Could not read {width} byte text field at offset {offset}."),
        )
    })?;
    let slot = &slot[..width - 1];
    let end = slot.iter().position(|byte| *byte == 0).unwrap_or(slot.len());
    Ok(String::from_utf8_lossy(&slot[..end]).into_owned())
}

/// Longest prefix of `value` that fits in `max_bytes` without splitting a
/// character.
pub(crate) fn truncate_to_bytes(value: &str, max_bytes: usize) -> &str {
    if value.len() <= max_bytes {
        return value;
    }
    let mut end = max_bytes;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value[..end]
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    I32(i32),
    U16(u16),
    F64(f64),
    I32s(Vec<i32>),
    /// Null-padded text filling a fixed-width slot. At most `width - 1`
    /// bytes of `value` are kept so the slot stays terminated.
    Text { value: String, width: usize },
}

impl FieldValue {
    pub fn byte_len(&self) -> usize {
        match self {
            Self::I32(_) => 4,
            Self::U16(_) => 2,
            Self::F64(_) => 8,
            Self::I32s(values) => values.len() * 4,
            Self::Text { width, .. } => *width,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    pub offset: usize,
    pub value: FieldValue,
}

impl FieldWrite {
    pub(crate) fn new(offset: usize, value: FieldValue) -> Self {
        Self { offset, value }
    }

    pub fn end(&self) -> usize {
        self.offset + self.byte_len()
    }

    pub fn byte_len(&self) -> usize {
        self.value.byte_len()
    }

    pub(crate) fn apply(&self, buffer: &mut [u8]) {
        let out = &mut buffer[self.offset..self.end()];
        match &self.value {
            FieldValue::I32(value) => out.copy_from_slice(&value.to_le_bytes()),
            FieldValue::U16(value) => out.copy_from_slice(&value.to_le_bytes()),
            FieldValue::F64(value) => out.copy_from_slice(&value.to_le_bytes()),
            FieldValue::I32s(values) => {
                for (chunk, value) in out.chunks_exact_mut(4).zip(values) {
                    chunk.copy_from_slice(&value.to_le_bytes());
                }
            }
            FieldValue::Text { value, width } => {
                let kept = truncate_to_bytes(value, width.saturating_sub(1)).as_bytes();
                out[..kept.len()].copy_from_slice(kept);
                out[kept.len()..].fill(0);
            }
        }
    }
}
