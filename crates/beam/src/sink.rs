// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use serde_json::Value;

/// Label of the batch grouping every side effect of one load
pub const BEAM_LOAD_BATCH_LABEL: &str = "Load Beam File";

/// The live document a container is loaded into.
///
/// [`BeamReader::load`](crate::BeamReader::load) calls into the sink as it
/// walks the block stream. Scene and curve engraving changes are grouped
/// under a single `Batch` (typically an undo history command) which is
/// committed once the stream ends, or abandoned when decoding fails
/// part way through. Changes already applied at that point are the sink's to
/// roll back.
pub trait BeamDocumentSink {
    type Batch;
    type Error: std::error::Error + 'static;

    fn begin_batch(&mut self, label: &str) -> Self::Batch;

    /// Apply the SVG document to the scene
    fn import_svg(&mut self, svg: &str, batch: &mut Self::Batch) -> Result<(), Self::Error>;

    /// Set the backing raster of the image element `element_id`.
    ///
    /// Returns `false` if no such element exists; files can reference
    /// elements that were pruned since they were saved.
    fn attach_image(&mut self, element_id: &str, image: &[u8]) -> Result<bool, Self::Error>;

    /// Called once after all sources of an image source block are attached
    fn refresh_image_resolutions(&mut self, force_all: bool) -> Result<(), Self::Error>;

    fn load_curve_engraving(&mut self, data: Value, batch: &mut Self::Batch) -> Result<(), Self::Error>;

    fn load_variable_text(&mut self, _state: Value) -> Result<(), Self::Error> {
        Ok(())
    }

    fn commit(&mut self, batch: Self::Batch) -> Result<(), Self::Error>;

    fn abandon(&mut self, _batch: Self::Batch) {}
}
