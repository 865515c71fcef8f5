// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

mod image_source;
mod misc;

use std::borrow::Cow;
use std::io::Cursor;

use log::{trace, warn};
use serde_json::Value;
use thiserror::Error;

use crate::ext::ReadExt;
use crate::{BeamVarInt, BeamVarIntError};

pub use self::image_source::{BeamImageSource, BEAM_IMAGE_SOURCE_ID_MAX_LEN};
pub use self::misc::BeamMiscData;

/// Type tag leading every block in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum BeamBlockKind {
    // Terminates the block stream, carries no length or payload
    End = 0,
    // UTF-8 SVG document
    SvgContent = 1,
    // Raster sources keyed by scene element id
    ImageSource = 2,
    // Preview image
    Thumbnail = 3,
    // JSON side channel (curve engraving, variable text, ...)
    MiscData = 4,
}

impl BeamBlockKind {
    /// Content kinds in the order they are written, as listed in the header metadata
    pub const CONTENTS: [BeamBlockKind; 4] = [
        BeamBlockKind::SvgContent,
        BeamBlockKind::ImageSource,
        BeamBlockKind::Thumbnail,
        BeamBlockKind::MiscData,
    ];

    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => BeamBlockKind::End,
            1 => BeamBlockKind::SvgContent,
            2 => BeamBlockKind::ImageSource,
            3 => BeamBlockKind::Thumbnail,
            4 => BeamBlockKind::MiscData,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A content block borrowed from the caller, ready to be framed as
/// `[kind][varint payload length][payload]`
#[derive(Debug, Clone, Copy)]
pub enum BeamBlock<'a> {
    SvgContent(&'a str),
    ImageSource(&'a [BeamImageSource<'a>]),
    Thumbnail(&'a [u8]),
    MiscData(&'a BeamMiscData),
}

impl BeamBlock<'_> {
    pub fn kind(&self) -> BeamBlockKind {
        match self {
            BeamBlock::SvgContent(_) => BeamBlockKind::SvgContent,
            BeamBlock::ImageSource(_) => BeamBlockKind::ImageSource,
            BeamBlock::Thumbnail(_) => BeamBlockKind::Thumbnail,
            BeamBlock::MiscData(_) => BeamBlockKind::MiscData,
        }
    }

    /// Encode the framed block
    pub fn encode(&self) -> Result<Vec<u8>, BeamBlockEncodeError> {
        let payload = self.payload()?;
        let length = BeamVarInt::from(payload.len());

        let mut block = Vec::with_capacity(1 + length.encoded_len() + payload.len());
        block.push(self.kind().tag());
        length.encode_into(&mut block);
        block.extend_from_slice(&payload);

        Ok(block)
    }

    fn payload(&self) -> Result<Cow<'_, [u8]>, BeamBlockEncodeError> {
        Ok(match self {
            BeamBlock::SvgContent(svg) => Cow::Borrowed(svg.as_bytes()),
            BeamBlock::ImageSource(sources) => {
                let mut payload = Vec::with_capacity(sources.iter().map(BeamImageSource::size).sum());

                for source in sources.iter() {
                    source.encode(&mut payload)?;
                }

                Cow::Owned(payload)
            }
            BeamBlock::Thumbnail(image) => Cow::Borrowed(*image),
            BeamBlock::MiscData(misc) => Cow::Owned(serde_json::to_vec(misc)?),
        })
    }
}

/// Placement of a decoded block within the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeamBlockFrame {
    pub kind: BeamBlockKind,
    /// Offset of the type tag
    pub offset: usize,
    /// Framed length: tag, length varint and payload
    pub len: usize,
    pub payload_len: usize,
}

#[derive(Debug, Clone)]
pub struct BeamDecodedBlock<'a> {
    pub frame: BeamBlockFrame,
    pub body: BeamDecodedBody<'a>,
}

#[derive(Debug, Clone)]
pub enum BeamDecodedBody<'a> {
    SvgContent(Cow<'a, str>),
    ImageSource(Vec<BeamImageSource<'a>>),
    Thumbnail(&'a [u8]),
    MiscData {
        raw: Cow<'a, str>,
        /// `None` when the payload is not valid misc data JSON
        data: Option<BeamMiscData>,
    },
}

impl<'a> BeamDecodedBlock<'a> {
    /// Decode the payload of a block whose tag and length were already read.
    ///
    /// `cursor` sits on the first payload byte; decoding of nested records
    /// never reads past `payload_len`.
    pub(crate) fn decode(
        cursor: &mut Cursor<&'a [u8]>,
        kind: BeamBlockKind,
        offset: usize,
        payload_len: u64,
    ) -> Result<Self, BeamDecodeError> {
        let payload_start = cursor.offset();
        let payload = cursor.read_slice(payload_len)?;

        let body = match kind {
            BeamBlockKind::SvgContent => BeamDecodedBody::SvgContent(String::from_utf8_lossy(payload)),
            BeamBlockKind::ImageSource => {
                let bytes: &'a [u8] = *cursor.get_ref();
                BeamDecodedBody::ImageSource(decode_image_sources(bytes, payload_start, payload.len())?)
            }
            BeamBlockKind::Thumbnail => BeamDecodedBody::Thumbnail(payload),
            BeamBlockKind::MiscData => {
                let raw = String::from_utf8_lossy(payload);
                let data = match serde_json::from_str::<Value>(&raw) {
                    Ok(value) => Some(BeamMiscData::from(value)),
                    Err(error) => {
                        warn!("Failed to parse misc data at offset {offset}: {error}");
                        None
                    }
                };

                BeamDecodedBody::MiscData { raw, data }
            }
            BeamBlockKind::End => return Err(BeamDecodeError::EndHasNoPayload { offset }),
        };

        Ok(Self {
            frame: BeamBlockFrame {
                kind,
                offset,
                len: cursor.offset() - offset,
                payload_len: payload.len(),
            },
            body,
        })
    }

    pub fn kind(&self) -> BeamBlockKind {
        self.frame.kind
    }

    pub fn svg_content(&self) -> Option<&str> {
        if let BeamDecodedBody::SvgContent(svg) = &self.body {
            Some(&**svg)
        } else {
            None
        }
    }

    pub fn image_sources(&self) -> Option<&[BeamImageSource<'a>]> {
        if let BeamDecodedBody::ImageSource(sources) = &self.body {
            Some(sources.as_slice())
        } else {
            None
        }
    }

    pub fn thumbnail(&self) -> Option<&'a [u8]> {
        if let BeamDecodedBody::Thumbnail(image) = &self.body {
            Some(*image)
        } else {
            None
        }
    }

    pub fn misc_data(&self) -> Option<&BeamMiscData> {
        if let BeamDecodedBody::MiscData { data, .. } = &self.body {
            data.as_ref()
        } else {
            None
        }
    }
}

/// Decode the `[idLen][id][varint imgLen][img]` entries packed in
/// `bytes[start..start + len]`, keeping error offsets absolute
fn decode_image_sources<'a>(
    bytes: &'a [u8],
    start: usize,
    len: usize,
) -> Result<Vec<BeamImageSource<'a>>, BeamDecodeError> {
    let mut cursor = Cursor::new(&bytes[..start + len]);
    cursor.set_position(start as u64);

    let mut sources = vec![];

    while cursor.remaining() > 0 {
        let source = BeamImageSource::decode(&mut cursor)?;
        trace!("Image source {} ({} bytes)", source.id, source.data.len());
        sources.push(source);
    }

    Ok(sources)
}

#[derive(Debug, Error)]
pub enum BeamBlockEncodeError {
    #[error("Image source id {id:?} is {len} bytes, at most 255 fit")]
    IdTooLong { id: String, len: usize },
    #[error("misc data")]
    MiscData(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BeamDecodeError {
    #[error("Read of {length} bytes at offset {offset} runs past the end of the buffer")]
    OutOfBounds { offset: usize, length: u64 },
    #[error("End block at offset {offset} has no payload to decode")]
    EndHasNoPayload { offset: usize },
    #[error("varint")]
    VarInt(#[from] BeamVarIntError),
}

impl BeamDecodeError {
    /// Whether the buffer ended before a complete value could be read
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            BeamDecodeError::OutOfBounds { .. } | BeamDecodeError::VarInt(BeamVarIntError::OutOfBounds { .. })
        )
    }
}
