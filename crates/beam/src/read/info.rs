// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use super::{BeamBlocks, BeamReadError};
use crate::header;

/// The workarea attribute sits on the root element, near the top of the document
const WORKAREA_SCAN_LEN: usize = 1000;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xff, 0xd8, 0xff];

/// What a file browser needs to preview a document without loading it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeamFileInfo<'a> {
    pub thumbnail: Option<BeamThumbnail<'a>>,
    /// Value of the `data-workarea` attribute of the saved document
    pub workarea: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeamThumbnail<'a> {
    /// Encoded raster, as stored in a thumbnail block
    Raster(&'a [u8]),
    /// Plain SVG documents preview as themselves
    Svg(Cow<'a, str>),
}

impl BeamThumbnail<'_> {
    pub fn mime_type(&self) -> &'static str {
        match self {
            BeamThumbnail::Raster(image) if image.starts_with(JPEG_SIGNATURE) => "image/jpeg",
            BeamThumbnail::Raster(image) if image.starts_with(PNG_SIGNATURE) => "image/png",
            // Thumbnails are rendered as PNG
            BeamThumbnail::Raster(_) => "image/png",
            BeamThumbnail::Svg(_) => "image/svg+xml",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BeamThumbnail::Raster(image) => image,
            BeamThumbnail::Svg(svg) => svg.as_bytes(),
        }
    }

    /// `data:` URL suitable for an `<img>` source
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), STANDARD.encode(self.as_bytes()))
    }
}

/// Pull the thumbnail and workarea out of a beam container.
///
/// Only blocks up to the thumbnail are decoded; a file that breaks
/// further down still yields its preview.
pub fn read_file_info(bytes: &[u8]) -> Result<BeamFileInfo<'_>, BeamReadError> {
    let (_, _, blocks_offset) = header::decode_prefix(bytes)?;

    let mut thumbnail = None;

    for block in BeamBlocks::new(bytes, blocks_offset) {
        if let Some(image) = block?.thumbnail() {
            thumbnail = Some(BeamThumbnail::Raster(image));
            break;
        }
    }

    Ok(BeamFileInfo {
        thumbnail,
        workarea: find_workarea(bytes),
    })
}

/// Preview info for a plain SVG document
pub fn read_svg_file_info(bytes: &[u8]) -> BeamFileInfo<'_> {
    BeamFileInfo {
        thumbnail: Some(BeamThumbnail::Svg(String::from_utf8_lossy(bytes))),
        workarea: find_workarea(bytes),
    }
}

fn find_workarea(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(WORKAREA_SCAN_LEN)]);
    let regex = Regex::new(r#"data-workarea="([^"]+)""#).ok()?;

    regex
        .captures(&head)
        .and_then(|captures| captures.get(1))
        .map(|workarea| workarea.as_str().to_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn workarea_in_head() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" data-workarea="fbm1" width="10"/>"#;
        let info = read_svg_file_info(svg);

        assert_eq!(info.workarea.as_deref(), Some("fbm1"));
        assert_eq!(
            info.thumbnail.map(|thumbnail| thumbnail.mime_type()),
            Some("image/svg+xml")
        );
    }

    #[test]
    fn workarea_past_scan_window() {
        let mut svg = format!("<svg><!-- {} -->", "x".repeat(WORKAREA_SCAN_LEN));
        svg.push_str(r#"<g data-workarea="fbb1b"/></svg>"#);

        assert_eq!(read_svg_file_info(svg.as_bytes()).workarea, None);
    }

    #[test]
    fn thumbnail_data_url() {
        let png = BeamThumbnail::Raster(b"\x89PNG\r\n\x1a\nrest");
        assert_eq!(png.data_url(), "data:image/png;base64,iVBORw0KGgpyZXN0");

        let jpeg = BeamThumbnail::Raster(&[0xff, 0xd8, 0xff, 0xe0]);
        assert_eq!(jpeg.mime_type(), "image/jpeg");

        let svg = BeamThumbnail::Svg(Cow::Borrowed("<svg/>"));
        assert_eq!(svg.data_url(), "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[test]
    fn not_a_beam_file() {
        let error = read_file_info(b"<svg/>").unwrap_err();
        assert!(error.is_not_a_beam_file());
    }
}
