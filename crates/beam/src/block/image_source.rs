// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;
use std::io::Cursor;

use super::{BeamBlockEncodeError, BeamDecodeError};
use crate::ext::ReadExt;
use crate::BeamVarInt;

/// Ids are prefixed by a single length byte
pub const BEAM_IMAGE_SOURCE_ID_MAX_LEN: usize = u8::MAX as usize;

/// One raster source inside the image source block, bound to the scene
/// element whose id matches `id`.
///
/// Encoded as `[id len: u8][id][varint data len][data]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamImageSource<'a> {
    pub id: Cow<'a, str>,
    pub data: Cow<'a, [u8]>,
}

impl<'a> BeamImageSource<'a> {
    /// Create a source, rejecting ids longer than [`BEAM_IMAGE_SOURCE_ID_MAX_LEN`] bytes
    pub fn new(id: impl Into<Cow<'a, str>>, data: impl Into<Cow<'a, [u8]>>) -> Result<Self, BeamBlockEncodeError> {
        let source = Self {
            id: id.into(),
            data: data.into(),
        };
        source.id_len()?;
        Ok(source)
    }

    pub fn into_owned(self) -> BeamImageSource<'static> {
        BeamImageSource {
            id: Cow::Owned(self.id.into_owned()),
            data: Cow::Owned(self.data.into_owned()),
        }
    }

    fn id_len(&self) -> Result<u8, BeamBlockEncodeError> {
        u8::try_from(self.id.len()).map_err(|_| BeamBlockEncodeError::IdTooLong {
            id: self.id.to_string(),
            len: self.id.len(),
        })
    }

    pub(super) fn decode(cursor: &mut Cursor<&'a [u8]>) -> Result<Self, BeamDecodeError> {
        let id_len = cursor.read_u8()?;
        let id = String::from_utf8_lossy(cursor.read_slice(u64::from(id_len))?);
        let data_len = cursor.read_varint()?;
        let data = cursor.read_slice(data_len)?;

        Ok(Self {
            id,
            data: Cow::Borrowed(data),
        })
    }

    pub(super) fn encode(&self, out: &mut Vec<u8>) -> Result<(), BeamBlockEncodeError> {
        out.push(self.id_len()?);
        out.extend_from_slice(self.id.as_bytes());
        BeamVarInt::from(self.data.len()).encode_into(out);
        out.extend_from_slice(&self.data);
        Ok(())
    }

    pub(super) fn size(&self) -> usize {
        1 + self.id.len() + BeamVarInt::from(self.data.len()).encoded_len() + self.data.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_length_limit() {
        let longest = "i".repeat(BEAM_IMAGE_SOURCE_ID_MAX_LEN);
        let source = BeamImageSource::new(longest.as_str(), vec![9u8; 3]).expect("255 byte id fits");

        let mut encoded = vec![];
        source.encode(&mut encoded).unwrap();
        assert_eq!(encoded[0], 0xff);
        assert_eq!(encoded.len(), source.size());

        let mut cursor = Cursor::new(encoded.as_slice());
        let decoded = BeamImageSource::decode(&mut cursor).unwrap();
        assert_eq!(decoded, source);

        let too_long = "i".repeat(BEAM_IMAGE_SOURCE_ID_MAX_LEN + 1);
        let error = BeamImageSource::new(too_long, Vec::<u8>::new()).unwrap_err();
        assert!(matches!(error, BeamBlockEncodeError::IdTooLong { len: 256, .. }));
    }

    #[test]
    fn id_length_counts_utf8_bytes() {
        // 128 two-byte characters
        let id = "é".repeat(128);
        assert!(matches!(
            BeamImageSource::new(id, Vec::<u8>::new()),
            Err(BeamBlockEncodeError::IdTooLong { len: 256, .. })
        ));
    }

    #[test]
    fn direct_construction_still_checked_on_encode() {
        let source = BeamImageSource {
            id: Cow::Owned("x".repeat(300)),
            data: Cow::Owned(vec![]),
        };
        assert!(source.encode(&mut vec![]).is_err());
    }
}
