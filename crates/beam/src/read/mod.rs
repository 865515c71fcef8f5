// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::fmt;
use std::io::{self, Cursor, Read};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::block::{BeamBlockFrame, BeamDecodedBlock, BeamDecodedBody};
use crate::ext::ReadExt;
use crate::header::{self, BeamHeaderDecodeError};
use crate::sink::{BeamDocumentSink, BEAM_LOAD_BATCH_LABEL};
use crate::{BeamBlockKind, BeamDecodeError, BeamHeader, BeamSignature};

pub use self::info::{read_file_info, read_svg_file_info, BeamFileInfo, BeamThumbnail};

mod info;

/// Read a whole container into memory and decode its signature and header
pub fn read<R: Read>(mut reader: R) -> Result<BeamReader<Vec<u8>>, BeamReadError> {
    let mut bytes = vec![];
    reader.read_to_end(&mut bytes)?;

    BeamReader::new(bytes)
}

pub fn read_bytes(bytes: &[u8]) -> Result<BeamReader<&[u8]>, BeamReadError> {
    BeamReader::new(bytes)
}

pub struct BeamReader<B> {
    pub signature: BeamSignature,
    pub header: BeamHeader,
    bytes: B,
    blocks_offset: usize,
}

impl<B: AsRef<[u8]>> BeamReader<B> {
    pub fn new(bytes: B) -> Result<Self, BeamReadError> {
        let (signature, header, blocks_offset) = header::decode_prefix(bytes.as_ref())?;

        debug!(
            "Beam container version {}, blocks start at offset {blocks_offset}",
            signature.version
        );

        Ok(Self {
            signature,
            header,
            bytes,
            blocks_offset,
        })
    }

    /// Walk the block stream from the first block up to the end block
    pub fn blocks(&self) -> BeamBlocks<'_> {
        BeamBlocks::new(self.bytes.as_ref(), self.blocks_offset)
    }

    /// Decode every block and apply its content to `sink`.
    ///
    /// Structural errors abort the load, leaving blocks dispatched so far
    /// applied, and the batch is handed to [`BeamDocumentSink::abandon`].
    /// Content anomalies are reported as warnings in the outcome and the
    /// batch is committed.
    pub fn load<S: BeamDocumentSink>(&self, sink: &mut S) -> Result<BeamLoadOutcome, BeamLoadError<S::Error>> {
        let mut batch = sink.begin_batch(BEAM_LOAD_BATCH_LABEL);

        match self.apply(sink, &mut batch) {
            Ok(outcome) => {
                sink.commit(batch).map_err(BeamLoadError::Sink)?;
                Ok(outcome)
            }
            Err(error) => {
                sink.abandon(batch);
                Err(error)
            }
        }
    }

    fn apply<S: BeamDocumentSink>(
        &self,
        sink: &mut S,
        batch: &mut S::Batch,
    ) -> Result<BeamLoadOutcome, BeamLoadError<S::Error>> {
        let mut outcome = BeamLoadOutcome::default();

        if self.header.metadata.is_none() {
            outcome.warnings.push(BeamReadWarning::MalformedMetadata);
        }

        let mut blocks = self.blocks();

        for block in &mut blocks {
            let block = block?;

            if let Some(warning) = self.check_declared_len(&block.frame) {
                warn!("{warning}");
                outcome.warnings.push(warning);
            }

            outcome.frames.push(block.frame);

            match block.body {
                BeamDecodedBody::SvgContent(svg) => {
                    sink.import_svg(&svg, batch).map_err(BeamLoadError::Sink)?;
                }
                BeamDecodedBody::ImageSource(sources) => {
                    for source in sources {
                        if sink.attach_image(&source.id, &source.data).map_err(BeamLoadError::Sink)? {
                            outcome.images_attached += 1;
                        } else {
                            trace!("No image element {}, skipping source", source.id);
                            outcome.images_skipped.push(source.id.into_owned());
                        }
                    }

                    sink.refresh_image_resolutions(true).map_err(BeamLoadError::Sink)?;
                }
                // Only consumed by file info scans
                BeamDecodedBody::Thumbnail(_) => {}
                BeamDecodedBody::MiscData { data: Some(misc), .. } => {
                    if let Some(curve_engraving) = misc.curve_engraving {
                        sink.load_curve_engraving(curve_engraving, batch)
                            .map_err(BeamLoadError::Sink)?;
                    }

                    if let Some(variable_text) = misc.variable_text {
                        sink.load_variable_text(variable_text).map_err(BeamLoadError::Sink)?;
                    }
                }
                BeamDecodedBody::MiscData { data: None, .. } => {
                    outcome.warnings.push(BeamReadWarning::MalformedMiscData {
                        offset: block.frame.offset,
                    });
                }
            }
        }

        outcome.state = blocks.state();

        if outcome.state == BeamScanState::DoneCorrupt {
            outcome.warnings.push(BeamReadWarning::MissingEndBlock {
                offset: self.bytes.as_ref().len(),
            });
        }

        Ok(outcome)
    }

    fn check_declared_len(&self, frame: &BeamBlockFrame) -> Option<BeamReadWarning> {
        let declared = self.header.declared_len(frame.kind)?;
        let actual = frame.len as u64;

        (declared != actual).then_some(BeamReadWarning::BlockLengthMismatch {
            kind: frame.kind,
            declared,
            actual,
        })
    }
}

/// States of the block stream walk. The stream is strictly forward only,
/// [`BeamScanState::DoneOk`] and [`BeamScanState::DoneCorrupt`] are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BeamScanState {
    #[default]
    Scanning,
    /// End block reached
    DoneOk,
    /// Buffer exhausted without an end block, or a block failed to decode
    DoneCorrupt,
}

pub struct BeamBlocks<'a> {
    cursor: Cursor<&'a [u8]>,
    state: BeamScanState,
}

impl<'a> BeamBlocks<'a> {
    pub(crate) fn new(bytes: &'a [u8], offset: usize) -> Self {
        let mut cursor = Cursor::new(bytes);
        cursor.set_position(offset as u64);

        Self {
            cursor,
            state: BeamScanState::Scanning,
        }
    }

    pub fn state(&self) -> BeamScanState {
        self.state
    }

    /// Offset of the next tag byte
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    fn next_block(&mut self) -> Result<Option<BeamDecodedBlock<'a>>, BeamReadError> {
        let offset = self.cursor.offset();
        let tag = self.cursor.read_u8()?;

        let kind = BeamBlockKind::from_tag(tag).ok_or(BeamReadError::UnknownBlockType { tag, offset })?;

        if kind == BeamBlockKind::End {
            debug!("End block at offset {offset}");
            return Ok(None);
        }

        let payload_len = self.cursor.read_varint()?;

        debug!("{kind} block at offset {offset}, {payload_len} bytes");

        Ok(Some(BeamDecodedBlock::decode(
            &mut self.cursor,
            kind,
            offset,
            payload_len,
        )?))
    }
}

impl<'a> Iterator for BeamBlocks<'a> {
    type Item = Result<BeamDecodedBlock<'a>, BeamReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != BeamScanState::Scanning {
            return None;
        }

        if self.cursor.remaining() == 0 {
            warn!(
                "Block stream ended at offset {} without an end block, file may be corrupted",
                self.cursor.offset()
            );
            self.state = BeamScanState::DoneCorrupt;
            return None;
        }

        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => {
                self.state = BeamScanState::DoneOk;
                None
            }
            Err(error) => {
                self.state = BeamScanState::DoneCorrupt;
                Some(Err(error))
            }
        }
    }
}

/// Summary of a successful [`BeamReader::load`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeamLoadOutcome {
    pub state: BeamScanState,
    /// Every block dispatched, in file order
    pub frames: Vec<BeamBlockFrame>,
    pub images_attached: usize,
    /// Image source ids with no matching scene element
    pub images_skipped: Vec<String>,
    pub warnings: Vec<BeamReadWarning>,
}

/// Anomalies that don't stop a load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeamReadWarning {
    MalformedMetadata,
    MalformedMiscData {
        offset: usize,
    },
    BlockLengthMismatch {
        kind: BeamBlockKind,
        declared: u64,
        actual: u64,
    },
    MissingEndBlock {
        offset: usize,
    },
}

impl fmt::Display for BeamReadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeamReadWarning::MalformedMetadata => write!(f, "header metadata is not valid JSON"),
            BeamReadWarning::MalformedMiscData { offset } => {
                write!(f, "misc data block at offset {offset} is not valid JSON, skipped")
            }
            BeamReadWarning::BlockLengthMismatch { kind, declared, actual } => {
                write!(f, "{kind} block is {actual} bytes but the header declares {declared}")
            }
            BeamReadWarning::MissingEndBlock { offset } => {
                write!(f, "no end block before offset {offset}, file may be corrupted")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BeamReadError {
    #[error("header decode")]
    HeaderDecode(#[from] BeamHeaderDecodeError),
    #[error("block decode")]
    BlockDecode(#[from] BeamDecodeError),
    #[error("Unknown block type {tag} at offset {offset}")]
    UnknownBlockType { tag: u8, offset: usize },
    #[error("io")]
    Io(#[from] io::Error),
}

impl BeamReadError {
    /// The signature is missing or wrong
    pub fn is_not_a_beam_file(&self) -> bool {
        matches!(
            self,
            BeamReadError::HeaderDecode(BeamHeaderDecodeError::InvalidMagic | BeamHeaderDecodeError::NotEnoughBytes)
        )
    }

    /// The buffer ended inside the header or a block
    pub fn is_out_of_bounds(&self) -> bool {
        match self {
            BeamReadError::HeaderDecode(BeamHeaderDecodeError::Decode(error)) | BeamReadError::BlockDecode(error) => {
                error.is_out_of_bounds()
            }
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum BeamLoadError<E: std::error::Error + 'static> {
    #[error("beam read")]
    Read(#[from] BeamReadError),
    #[error("document sink")]
    Sink(#[source] E),
}
