// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor, Write};

use crate::varint::BEAM_VARINT_MAX_LEN;
use crate::{BeamDecodeError, BeamVarInt};

/// Bounds checked reads over an in-memory container.
///
/// Slices are borrowed straight from the underlying buffer and the cursor
/// only advances on success, so a failed read never leaves it past the end.
pub(crate) trait ReadExt<'a> {
    fn read_u8(&mut self) -> Result<u8, BeamDecodeError>;

    fn read_varint(&mut self) -> Result<u64, BeamDecodeError>;

    fn read_slice(&mut self, length: u64) -> Result<&'a [u8], BeamDecodeError>;

    fn offset(&self) -> usize;

    fn remaining(&self) -> usize;
}

impl<'a> ReadExt<'a> for Cursor<&'a [u8]> {
    fn read_u8(&mut self) -> Result<u8, BeamDecodeError> {
        let bytes = self.read_slice(1)?;
        Ok(bytes[0])
    }

    fn read_varint(&mut self) -> Result<u64, BeamDecodeError> {
        let bytes: &'a [u8] = *self.get_ref();
        let (value, next) = BeamVarInt::decode(bytes, self.offset())?;
        self.set_position(next as u64);
        Ok(value.0)
    }

    fn read_slice(&mut self, length: u64) -> Result<&'a [u8], BeamDecodeError> {
        let bytes: &'a [u8] = *self.get_ref();
        let start = self.offset();

        let end = usize::try_from(length)
            .ok()
            .and_then(|length| start.checked_add(length))
            .filter(|end| *end <= bytes.len())
            .ok_or(BeamDecodeError::OutOfBounds { offset: start, length })?;

        self.set_position(end as u64);
        Ok(&bytes[start..end])
    }

    fn offset(&self) -> usize {
        self.position() as usize
    }

    fn remaining(&self) -> usize {
        self.get_ref().len().saturating_sub(self.offset())
    }
}

pub(crate) trait WriteExt: Write {
    fn write_u8(&mut self, item: u8) -> io::Result<()> {
        self.write_array([item])
    }

    fn write_varint(&mut self, item: impl Into<BeamVarInt>) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(BEAM_VARINT_MAX_LEN);
        item.into().encode_into(&mut bytes);
        self.write_all(&bytes)
    }

    fn write_array<const N: usize>(&mut self, bytes: [u8; N]) -> io::Result<()> {
        self.write_all(&bytes)?;
        Ok(())
    }
}

impl<T: Write> WriteExt for T {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slice_reads_are_bounded() {
        let data = [1u8, 2, 3, 4];
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(cursor.read_slice(3).unwrap(), &[1, 2, 3]);
        assert_eq!(cursor.remaining(), 1);

        let error = cursor.read_slice(2).unwrap_err();
        assert!(matches!(error, BeamDecodeError::OutOfBounds { offset: 3, length: 2 }));
        // Failed read leaves the cursor untouched
        assert_eq!(cursor.offset(), 3);

        assert!(cursor.read_slice(u64::MAX).is_err());
        assert_eq!(cursor.read_u8().unwrap(), 4);
        assert!(cursor.read_u8().is_err());
    }

    #[test]
    fn varint_reads_advance() {
        let data = [0xac, 0x02, 0x07];
        let mut cursor = Cursor::new(&data[..]);

        assert_eq!(cursor.read_varint().unwrap(), 300);
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.read_varint().unwrap(), 7);
        assert!(cursor.read_varint().unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn write_helpers() {
        let mut out = vec![];
        out.write_u8(0x04).unwrap();
        out.write_varint(16_384u64).unwrap();
        out.write_array(*b"ok").unwrap();
        assert_eq!(out, [0x04, 0x80, 0x80, 0x01, b'o', b'k']);
    }
}
