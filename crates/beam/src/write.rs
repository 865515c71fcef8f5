// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;
use std::io::{self, Write};

use log::debug;
use thiserror::Error;

use crate::ext::WriteExt;
use crate::{
    BeamBlock, BeamBlockEncodeError, BeamBlockKind, BeamHeader, BeamImageSource, BeamMetadata, BeamMiscData,
    BeamSignature, BeamVarInt,
};

/// Compose a container in memory
pub fn write_bytes<'a>(
    svg_content: &'a str,
    image_sources: impl IntoIterator<Item = BeamImageSource<'a>>,
    thumbnail: Option<&'a [u8]>,
) -> Result<Vec<u8>, BeamWriteError> {
    let mut bytes = vec![];

    let mut writer = BeamWriter::new(&mut bytes, svg_content);
    writer.image_sources.extend(image_sources);
    writer.thumbnail = thumbnail;
    writer.finalize()?;

    Ok(bytes)
}

/// Collects the content of a container and writes it in one go on
/// [`BeamWriter::finalize`]. Every block is encoded before the first byte
/// reaches `writer`, so a failing block never leaves a partial file behind.
pub struct BeamWriter<'a, W> {
    writer: W,
    host_version: Option<String>,
    svg_content: &'a str,
    image_sources: Vec<BeamImageSource<'a>>,
    thumbnail: Option<&'a [u8]>,
    misc_data: BeamMiscData,
}

impl<'a, W: Write> BeamWriter<'a, W> {
    pub fn new(writer: W, svg_content: &'a str) -> Self {
        Self {
            writer,
            host_version: None,
            svg_content,
            image_sources: vec![],
            thumbnail: None,
            misc_data: BeamMiscData::default(),
        }
    }

    /// Version of the host application, recorded in the header metadata
    pub fn with_host_version(self, version: impl Into<String>) -> Self {
        Self {
            host_version: Some(version.into()),
            ..self
        }
    }

    pub fn with_thumbnail(self, image: &'a [u8]) -> Self {
        Self {
            thumbnail: Some(image),
            ..self
        }
    }

    pub fn with_misc_data(self, misc_data: BeamMiscData) -> Self {
        Self { misc_data, ..self }
    }

    /// Add a raster source for the image element `id`. Sources are written
    /// in the order they are added.
    pub fn add_image_source(
        &mut self,
        id: impl Into<Cow<'a, str>>,
        data: impl Into<Cow<'a, [u8]>>,
    ) -> Result<(), BeamWriteError> {
        self.image_sources.push(BeamImageSource::new(id, data)?);
        Ok(())
    }

    pub fn finalize(mut self) -> Result<(), BeamWriteError> {
        let bytes = self.encode()?;

        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>, BeamWriteError> {
        let svg_block = BeamBlock::SvgContent(self.svg_content).encode()?;
        let image_source_block = BeamBlock::ImageSource(&self.image_sources).encode()?;
        // No thumbnail, no block
        let thumbnail_block = match self.thumbnail {
            Some(image) => BeamBlock::Thumbnail(image).encode()?,
            None => vec![],
        };
        let misc_data_block = BeamBlock::MiscData(&self.misc_data).encode()?;

        let header = BeamHeader::new(
            BeamMetadata::new(self.host_version.clone()),
            svg_block.len(),
            image_source_block.len(),
            thumbnail_block.len(),
            misc_data_block.len(),
        )
        .map_err(BeamWriteError::Metadata)?
        .encode();

        let header_len = BeamVarInt::from(header.len());
        let blocks = [svg_block, image_source_block, thumbnail_block, misc_data_block];

        let mut bytes = Vec::with_capacity(
            BeamSignature::SIZE + header_len.encoded_len() + header.len() + blocks.iter().map(Vec::len).sum::<usize>() + 1,
        );

        BeamSignature::current().encode(&mut bytes)?;
        bytes.write_varint(header_len)?;
        bytes.extend_from_slice(&header);

        for block in &blocks {
            bytes.extend_from_slice(block);
        }

        bytes.push(BeamBlockKind::End.tag());

        debug!(
            "Encoded beam container: {} bytes, {} image sources",
            bytes.len(),
            self.image_sources.len()
        );

        Ok(bytes)
    }
}

#[derive(Debug, Error)]
pub enum BeamWriteError {
    #[error("block encode")]
    BlockEncode(#[from] BeamBlockEncodeError),
    #[error("header metadata")]
    Metadata(#[source] serde_json::Error),
    #[error("io")]
    Io(#[from] io::Error),
}
