// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

pub(crate) mod ext;
mod block;
mod header;
mod read;
mod sink;
pub mod varint;
mod write;

pub use self::block::{
    BeamBlock, BeamBlockEncodeError, BeamBlockFrame, BeamBlockKind, BeamDecodeError, BeamDecodedBlock,
    BeamDecodedBody, BeamImageSource, BeamMiscData, BEAM_IMAGE_SOURCE_ID_MAX_LEN,
};
pub use self::header::{
    BeamHeader, BeamHeaderDecodeError, BeamMetadata, BeamSignature, BEAM_FORMAT_VERSION, BEAM_MAGIC,
};
pub use self::read::{
    read, read_bytes, read_file_info, read_svg_file_info, BeamBlocks, BeamFileInfo, BeamLoadError, BeamLoadOutcome,
    BeamReadError, BeamReadWarning, BeamReader, BeamScanState, BeamThumbnail,
};
pub use self::sink::{BeamDocumentSink, BEAM_LOAD_BATCH_LABEL};
pub use self::varint::{BeamVarInt, BeamVarIntError};
pub use self::write::{write_bytes, BeamWriteError, BeamWriter};

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn roundtrip() {
        let thumbnail = b"\x89PNG\r\n\x1a\nthumb";
        let image = vec![7u8; 1000];
        let misc_data = BeamMiscData {
            curve_engraving: Some(json!({"bbox": {"x": 0, "y": 0}, "data": [1, 2]})),
            variable_text: Some(json!({"start": 1, "end": 9})),
            ..Default::default()
        };

        let mut out_beam = vec![];
        let mut writer = BeamWriter::new(&mut out_beam, "<svg data-workarea=\"ado1\"/>")
            .with_host_version("2.4.0")
            .with_thumbnail(thumbnail)
            .with_misc_data(misc_data.clone());
        writer.add_image_source("svg_1", image.as_slice()).unwrap();
        writer.add_image_source("svg_2", &b"tiny"[..]).unwrap();
        writer.finalize().unwrap();

        let reader = read_bytes(&out_beam).unwrap();
        assert_eq!(reader.signature, BeamSignature::current());
        assert_eq!(
            reader.header.metadata,
            Some(BeamMetadata::new(Some("2.4.0".to_owned())))
        );

        let mut blocks = reader.blocks();
        let decoded = (&mut blocks).collect::<std::result::Result<Vec<_>, _>>().unwrap();
        assert_eq!(blocks.state(), BeamScanState::DoneOk);

        // Header lengths agree with the blocks
        for block in &decoded {
            assert_eq!(
                reader.header.declared_len(block.kind()),
                Some(block.frame.len as u64)
            );
        }

        let svg = decoded.iter().find_map(BeamDecodedBlock::svg_content).unwrap();
        let sources = decoded.iter().find_map(BeamDecodedBlock::image_sources).unwrap();
        let rt_thumbnail = decoded.iter().find_map(BeamDecodedBlock::thumbnail).unwrap();
        let rt_misc_data = decoded.iter().find_map(BeamDecodedBlock::misc_data).unwrap();

        assert_eq!(svg, "<svg data-workarea=\"ado1\"/>");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, "svg_1");
        assert_eq!(sources[0].data, image.as_slice());
        assert_eq!(sources[1].id, "svg_2");
        assert_eq!(&*sources[1].data, b"tiny");
        assert_eq!(rt_thumbnail, thumbnail);
        assert_eq!(rt_misc_data, &misc_data);

        let info = read_file_info(&out_beam).unwrap();
        assert_eq!(info.thumbnail, Some(BeamThumbnail::Raster(thumbnail)));
        assert_eq!(info.workarea.as_deref(), Some("ado1"));
    }
}
