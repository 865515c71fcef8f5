// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

/// Largest number of bytes a `u64` occupies once encoded
pub const BEAM_VARINT_MAX_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const DIGIT_MASK: u8 = 0x7f;
const DIGIT_BITS: u32 = 7;

/// Unsigned integer stored as base-128 digits, least significant first.
///
/// The high bit of each byte flags that another digit follows, so `0`
/// encodes to a single zero byte and `128` to `[0x80, 0x01]`. Values are
/// limited to `u64`, which caps any declared block or header length at
/// `u64::MAX` bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BeamVarInt(pub u64);

impl BeamVarInt {
    /// Number of bytes [`BeamVarInt::encode`] will produce
    pub fn encoded_len(self) -> usize {
        let mut remaining = self.0 >> DIGIT_BITS;
        let mut len = 1;

        while remaining != 0 {
            remaining >>= DIGIT_BITS;
            len += 1;
        }

        len
    }

    pub fn encode(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut bytes);
        bytes
    }

    /// Append the encoded digits to `out`
    pub fn encode_into(self, out: &mut Vec<u8>) {
        let mut remaining = self.0;

        while remaining > u64::from(DIGIT_MASK) {
            out.push((remaining as u8 & DIGIT_MASK) | CONTINUATION);
            remaining >>= DIGIT_BITS;
        }

        out.push(remaining as u8);
    }

    /// Decode a value starting at `offset`.
    ///
    /// Returns the value together with the offset of the first byte after
    /// the terminating digit. Nothing past that digit is touched.
    pub fn decode(bytes: &[u8], offset: usize) -> Result<(Self, usize), BeamVarIntError> {
        let mut value = 0u64;
        let mut position = offset;

        for digit_index in 0..BEAM_VARINT_MAX_LEN {
            let byte = *bytes
                .get(position)
                .ok_or(BeamVarIntError::OutOfBounds { offset: position })?;
            position += 1;

            let digit = u64::from(byte & DIGIT_MASK);

            // The tenth digit only has room for the top bit of a u64
            if digit_index == BEAM_VARINT_MAX_LEN - 1 && digit > 1 {
                return Err(BeamVarIntError::Overflow { offset });
            }

            value |= digit << (DIGIT_BITS * digit_index as u32);

            if byte & CONTINUATION == 0 {
                return Ok((Self(value), position));
            }
        }

        Err(BeamVarIntError::Overflow { offset })
    }
}

impl From<u64> for BeamVarInt {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<usize> for BeamVarInt {
    fn from(value: usize) -> Self {
        Self(value as u64)
    }
}

impl From<BeamVarInt> for u64 {
    fn from(value: BeamVarInt) -> Self {
        value.0
    }
}

impl TryFrom<i64> for BeamVarInt {
    type Error = BeamVarIntError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| BeamVarIntError::InvalidValue(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BeamVarIntError {
    #[error("Cannot encode negative value {0}")]
    InvalidValue(i64),
    #[error("Buffer ends at offset {offset} before the varint terminates")]
    OutOfBounds { offset: usize },
    #[error("Varint at offset {offset} does not fit in 64 bits")]
    Overflow { offset: usize },
}
