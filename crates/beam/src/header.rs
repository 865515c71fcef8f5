// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io::{self, Cursor, Write};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ext::{ReadExt, WriteExt};
use crate::{BeamBlockKind, BeamDecodeError, BeamVarInt};

/// Well defined magic field for a beam container
pub const BEAM_MAGIC: &[u8; 4] = b"Beam";

/// Format generation written by this crate
pub const BEAM_FORMAT_VERSION: u8 = 2;

/// Magic plus a single version byte, always the first 5 bytes of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamSignature {
    pub magic: [u8; 4],
    pub version: u8,
}

impl BeamSignature {
    /// Size of the encoded signature in bytes
    pub const SIZE: usize = 5;

    pub fn current() -> Self {
        Self {
            magic: *BEAM_MAGIC,
            version: BEAM_FORMAT_VERSION,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BeamHeaderDecodeError> {
        let Some(signature) = bytes.get(..Self::SIZE) else {
            return Err(BeamHeaderDecodeError::NotEnoughBytes);
        };

        let (magic, version) = signature.split_at(4);

        if magic != BEAM_MAGIC {
            return Err(BeamHeaderDecodeError::InvalidMagic);
        }

        let version = version[0];

        if version > BEAM_FORMAT_VERSION {
            warn!("Beam format version {version} is newer than {BEAM_FORMAT_VERSION}, reading best-effort");
        }

        Ok(Self {
            magic: *BEAM_MAGIC,
            version,
        })
    }

    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), io::Error> {
        writer.write_array(self.magic)?;
        writer.write_u8(self.version)?;

        Ok(())
    }
}

/// Free-form description of the container stored at the start of the header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamMetadata {
    /// Block kinds the writer knows how to produce
    pub contents: Vec<u8>,
    /// Version of the host application that wrote the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl BeamMetadata {
    pub fn new(host_version: Option<String>) -> Self {
        Self {
            contents: BeamBlockKind::CONTENTS.iter().map(|kind| kind.tag()).collect(),
            version: host_version,
        }
    }
}

/// Metadata plus the framed length of each content block, in file order.
///
/// The lengths are advisory: the block stream is self framing and readers
/// only use them to flag disagreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamHeader {
    /// Metadata exactly as stored
    pub raw_metadata: String,
    /// `None` when the stored metadata is not JSON, as in early files
    pub metadata: Option<BeamMetadata>,
    pub svg_content_len: u64,
    pub image_source_len: u64,
    /// Zero when no thumbnail was written; absent from early files
    pub thumbnail_len: Option<u64>,
    /// Absent from early files
    pub misc_data_len: Option<u64>,
}

impl BeamHeader {
    pub fn new(
        metadata: BeamMetadata,
        svg_content_len: usize,
        image_source_len: usize,
        thumbnail_len: usize,
        misc_data_len: usize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            raw_metadata: serde_json::to_string(&metadata)?,
            metadata: Some(metadata),
            svg_content_len: svg_content_len as u64,
            image_source_len: image_source_len as u64,
            thumbnail_len: Some(thumbnail_len as u64),
            misc_data_len: Some(misc_data_len as u64),
        })
    }

    /// Declared framed length of the block `kind`, if the header carries one
    pub fn declared_len(&self, kind: BeamBlockKind) -> Option<u64> {
        match kind {
            BeamBlockKind::SvgContent => Some(self.svg_content_len),
            BeamBlockKind::ImageSource => Some(self.image_source_len),
            BeamBlockKind::Thumbnail => self.thumbnail_len,
            BeamBlockKind::MiscData => self.misc_data_len,
            BeamBlockKind::End => None,
        }
    }

    /// Encode the header body, without its own length prefix
    pub fn encode(&self) -> Vec<u8> {
        let mut header = vec![];

        BeamVarInt::from(self.raw_metadata.len()).encode_into(&mut header);
        header.extend_from_slice(self.raw_metadata.as_bytes());

        // Early generations stop after the image source length
        let lengths = [
            Some(self.svg_content_len),
            Some(self.image_source_len),
            self.thumbnail_len,
            self.misc_data_len,
        ];

        for len in lengths.into_iter().flatten() {
            BeamVarInt(len).encode_into(&mut header);
        }

        header
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BeamDecodeError> {
        let mut cursor = Cursor::new(bytes);

        let metadata_len = cursor.read_varint()?;
        let raw_metadata = String::from_utf8_lossy(cursor.read_slice(metadata_len)?).into_owned();

        debug!("Beam metadata: {raw_metadata}");

        let metadata = match serde_json::from_str(&raw_metadata) {
            Ok(metadata) => Some(metadata),
            Err(error) => {
                warn!("Failed to parse beam metadata: {error}");
                None
            }
        };

        let svg_content_len = cursor.read_varint()?;
        let image_source_len = cursor.read_varint()?;
        let thumbnail_len = (cursor.remaining() > 0).then(|| cursor.read_varint()).transpose()?;
        let misc_data_len = (cursor.remaining() > 0).then(|| cursor.read_varint()).transpose()?;

        Ok(Self {
            raw_metadata,
            metadata,
            svg_content_len,
            image_source_len,
            thumbnail_len,
            misc_data_len,
        })
    }
}

/// Decode signature and header, returning the offset of the first block
pub(crate) fn decode_prefix(bytes: &[u8]) -> Result<(BeamSignature, BeamHeader, usize), BeamHeaderDecodeError> {
    let signature = BeamSignature::decode(bytes)?;

    let mut cursor = Cursor::new(bytes);
    cursor.set_position(BeamSignature::SIZE as u64);

    let header_len = cursor.read_varint()?;
    let header = BeamHeader::decode(cursor.read_slice(header_len)?)?;

    Ok((signature, header, cursor.offset()))
}

#[derive(Debug, Error)]
pub enum BeamHeaderDecodeError {
    #[error("Signature must be {} bytes long", BeamSignature::SIZE)]
    NotEnoughBytes,
    #[error("Not a beam file: invalid magic")]
    InvalidMagic,
    #[error("header")]
    Decode(#[from] BeamDecodeError),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn signature() {
        let mut encoded = vec![];
        BeamSignature::current().encode(&mut encoded).unwrap();
        assert_eq!(encoded, [66, 101, 97, 109, 2]);
        assert_eq!(BeamSignature::decode(&encoded).unwrap(), BeamSignature::current());

        assert!(matches!(
            BeamSignature::decode(b"Beem\x02"),
            Err(BeamHeaderDecodeError::InvalidMagic)
        ));
        assert!(matches!(
            BeamSignature::decode(b"Bea"),
            Err(BeamHeaderDecodeError::NotEnoughBytes)
        ));
    }

    #[test]
    fn metadata_json() {
        let metadata = BeamMetadata::new(Some("2.3.1".to_owned()));
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"contents":[1,2,3,4],"version":"2.3.1"}"#
        );
        assert_eq!(
            serde_json::to_string(&BeamMetadata::new(None)).unwrap(),
            r#"{"contents":[1,2,3,4]}"#
        );
    }

    #[test]
    fn header_layout() {
        let header = BeamHeader::new(BeamMetadata::new(None), 8, 300, 0, 4).unwrap();
        let encoded = header.encode();

        let metadata = br#"{"contents":[1,2,3,4]}"#;
        let mut expected = vec![metadata.len() as u8];
        expected.extend_from_slice(metadata);
        expected.extend_from_slice(&[0x08, 0xac, 0x02, 0x00, 0x04]);
        assert_eq!(encoded, expected);

        assert_eq!(BeamHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn early_generation_header() {
        // Plain text metadata, no thumbnail or misc lengths
        let metadata = b"Hi, I am meta data O_<";
        let mut encoded = vec![metadata.len() as u8];
        encoded.extend_from_slice(metadata);
        encoded.extend_from_slice(&[0x10, 0x20]);

        let header = BeamHeader::decode(&encoded).unwrap();
        assert_eq!(header.raw_metadata, "Hi, I am meta data O_<");
        assert_eq!(header.metadata, None);
        assert_eq!(header.svg_content_len, 0x10);
        assert_eq!(header.image_source_len, 0x20);
        assert_eq!(header.thumbnail_len, None);
        assert_eq!(header.misc_data_len, None);
        assert_eq!(header.declared_len(BeamBlockKind::Thumbnail), None);

        // Re-encoding keeps the early layout
        assert_eq!(header.encode(), encoded);
    }

    #[test]
    fn truncated_header() {
        let header = BeamHeader::new(BeamMetadata::new(None), 8, 300, 0, 4).unwrap();
        let encoded = header.encode();

        // Cut inside the metadata string
        assert!(BeamHeader::decode(&encoded[..10]).unwrap_err().is_out_of_bounds());
        // Cut inside the image source length
        let cut = encoded.len() - 3;
        assert!(BeamHeader::decode(&encoded[..cut]).unwrap_err().is_out_of_bounds());
    }
}
