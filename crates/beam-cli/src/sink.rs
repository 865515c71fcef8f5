// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use beam::BeamDocumentSink;
use fs_err as fs;
use log::debug;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

pub const SVG_FILE: &str = "content.svg";
pub const IMAGE_DIR: &str = "images";
pub const CURVE_ENGRAVING_FILE: &str = "curve-engraving.json";
pub const VARIABLE_TEXT_FILE: &str = "variable-text.json";

/// Materializes a loaded document as plain files under `root`.
///
/// Nothing touches the disk before [`BeamDocumentSink::commit`], and commit
/// checks every target before writing the first one, so a failed load leaves
/// `root` as it was.
pub struct DirectorySink {
    root: PathBuf,
    overwrite: bool,
    svg: Option<String>,
    images: Vec<(PathBuf, Vec<u8>)>,
    image_names: HashSet<String>,
    variable_text: Option<Value>,
    /// Files written by the last commit
    pub written: Vec<PathBuf>,
}

/// Files staged by the svg and curve engraving blocks
#[derive(Debug, Default)]
pub struct Batch {
    label: String,
    files: Vec<(PathBuf, Vec<u8>)>,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>, overwrite: bool) -> Self {
        Self {
            root: root.into(),
            overwrite,
            svg: None,
            images: vec![],
            image_names: HashSet::new(),
            variable_text: None,
            written: vec![],
        }
    }

    /// Image file name for `id`, distinct from every name staged so far
    fn image_name(&mut self, id: &str) -> String {
        let base = file_name(id);
        let mut name = base.clone();
        let mut index = 1;

        while self.image_names.contains(&name) {
            name = format!("{base}_{index}");
            index += 1;
        }

        self.image_names.insert(name.clone());
        name
    }
}

impl BeamDocumentSink for DirectorySink {
    type Batch = Batch;
    type Error = Error;

    fn begin_batch(&mut self, label: &str) -> Batch {
        Batch {
            label: label.to_owned(),
            files: vec![],
        }
    }

    fn import_svg(&mut self, svg: &str, batch: &mut Batch) -> Result<(), Error> {
        batch.files.push((SVG_FILE.into(), svg.as_bytes().to_vec()));
        self.svg = Some(svg.to_owned());
        Ok(())
    }

    fn attach_image(&mut self, element_id: &str, image: &[u8]) -> Result<bool, Error> {
        let exists = self.svg.as_deref().is_some_and(|svg| has_element(svg, element_id));

        if exists {
            let name = self.image_name(element_id);
            self.images.push((Path::new(IMAGE_DIR).join(name), image.to_vec()));
        }

        Ok(exists)
    }

    fn refresh_image_resolutions(&mut self, force_all: bool) -> Result<(), Error> {
        debug!("{} images staged (force all: {force_all})", self.images.len());
        Ok(())
    }

    fn load_curve_engraving(&mut self, data: Value, batch: &mut Batch) -> Result<(), Error> {
        batch
            .files
            .push((CURVE_ENGRAVING_FILE.into(), serde_json::to_vec_pretty(&data)?));
        Ok(())
    }

    fn load_variable_text(&mut self, state: Value) -> Result<(), Error> {
        self.variable_text = Some(state);
        Ok(())
    }

    fn commit(&mut self, batch: Batch) -> Result<(), Error> {
        debug!("Commit {:?}: {} files", batch.label, batch.files.len());

        self.written.clear();
        self.image_names.clear();

        let mut files = batch.files;
        files.append(&mut self.images);
        if let Some(state) = self.variable_text.take() {
            files.push((VARIABLE_TEXT_FILE.into(), serde_json::to_vec_pretty(&state)?));
        }

        let files = files
            .into_iter()
            .map(|(relative, contents)| (self.root.join(relative), contents))
            .collect::<Vec<_>>();

        if !self.overwrite {
            if let Some((path, _)) = files.iter().find(|(path, _)| path.exists()) {
                return Err(Error::Exists(path.clone()));
            }
        }

        for (path, contents) in files {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents)?;

            self.written.push(path);
        }

        Ok(())
    }

    fn abandon(&mut self, batch: Batch) {
        debug!("Abandon {:?}", batch.label);

        self.images.clear();
        self.image_names.clear();
        self.variable_text = None;
    }
}

/// Whether `svg` carries an element with the exact `id` attribute
fn has_element(svg: &str, id: &str) -> bool {
    Regex::new(&format!(r#"\sid="{}""#, regex::escape(id))).is_ok_and(|pattern| pattern.is_match(svg))
}

/// Element ids are free-form, keep them inside the image directory
fn file_name(id: &str) -> String {
    let name = id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        format!("_{name}")
    } else {
        name
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?} already exists, pass --overwrite to replace it")]
    Exists(PathBuf),
    #[error("serialize")]
    Json(#[from] serde_json::Error),
    #[error("io")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod test {
    use beam::{BeamLoadError, BeamMiscData, BeamWriter};
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn document(svg: &str, images: &[(&str, &str)], misc_data: BeamMiscData) -> Vec<u8> {
        let mut bytes = vec![];
        let mut writer = BeamWriter::new(&mut bytes, svg).with_misc_data(misc_data);
        for (id, data) in images {
            writer.add_image_source(*id, data.as_bytes()).unwrap();
        }
        writer.finalize().unwrap();
        bytes
    }

    #[test]
    fn file_names() {
        assert_eq!(file_name("svg_12"), "svg_12");
        assert_eq!(file_name("../etc/passwd"), ".._etc_passwd");
        assert_eq!(file_name(".."), "_..");
        assert_eq!(file_name(""), "_");
    }

    #[test]
    fn element_ids_match_exactly() {
        let svg = r##"<svg><g data-id="a"/><image id="b"/><use xlink:href="#c" id="c.d"/></svg>"##;

        assert!(!has_element(svg, "a"));
        assert!(has_element(svg, "b"));
        assert!(has_element(svg, "c.d"));
        assert!(!has_element(svg, "c"));
        assert!(!has_element(svg, "cxd"));
    }

    #[test]
    fn extract_document() {
        let svg = r#"<svg><image id="svg_3"/></svg>"#;
        let misc_data = BeamMiscData {
            curve_engraving: Some(json!({"bbox": [0, 0, 1, 1]})),
            variable_text: Some(json!({"current": 2})),
            ..Default::default()
        };
        let bytes = document(svg, &[("svg_3", "png"), ("svg_9", "orphan")], misc_data);

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let mut sink = DirectorySink::new(root, false);
        let outcome = beam::read_bytes(&bytes).unwrap().load(&mut sink).unwrap();

        assert_eq!(outcome.images_skipped, ["svg_9"]);
        assert_eq!(fs::read_to_string(root.join(SVG_FILE)).unwrap(), svg);
        assert_eq!(fs::read(root.join(IMAGE_DIR).join("svg_3")).unwrap(), b"png");
        assert!(!root.join(IMAGE_DIR).join("svg_9").exists());
        assert!(root.join(CURVE_ENGRAVING_FILE).exists());
        assert!(root.join(VARIABLE_TEXT_FILE).exists());
        assert_eq!(sink.written.len(), 4);

        // Existing output is kept unless overwriting
        let mut sink = DirectorySink::new(root, false);
        let error = beam::read_bytes(&bytes).unwrap().load(&mut sink).unwrap_err();
        assert!(matches!(error, BeamLoadError::Sink(Error::Exists(_))));

        let mut sink = DirectorySink::new(root, true);
        beam::read_bytes(&bytes).unwrap().load(&mut sink).unwrap();
        assert_eq!(sink.written.len(), 4);
    }

    #[test]
    fn conflict_writes_nothing() {
        let svg = r#"<svg><image id="svg_3"/></svg>"#;
        let misc_data = BeamMiscData {
            curve_engraving: Some(json!({"bbox": [0, 0, 1, 1]})),
            ..Default::default()
        };
        let bytes = document(svg, &[("svg_3", "png")], misc_data);

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(IMAGE_DIR)).unwrap();
        fs::write(root.join(IMAGE_DIR).join("svg_3"), b"keep").unwrap();

        let mut sink = DirectorySink::new(root, false);
        let error = beam::read_bytes(&bytes).unwrap().load(&mut sink).unwrap_err();

        assert!(matches!(error, BeamLoadError::Sink(Error::Exists(path)) if path.ends_with("svg_3")));
        assert!(!root.join(SVG_FILE).exists());
        assert!(!root.join(CURVE_ENGRAVING_FILE).exists());
        assert_eq!(fs::read(root.join(IMAGE_DIR).join("svg_3")).unwrap(), b"keep");
        assert!(sink.written.is_empty());
    }

    #[test]
    fn colliding_ids_get_distinct_files() {
        let svg = r#"<svg><image id="a:b"/><image id="a_b"/><image id="a_b_1"/></svg>"#;
        let bytes = document(
            svg,
            &[("a:b", "first"), ("a_b", "second"), ("a_b_1", "third")],
            BeamMiscData::default(),
        );

        let dir = TempDir::new().unwrap();
        let images = dir.path().join(IMAGE_DIR);
        let mut sink = DirectorySink::new(dir.path(), false);
        let outcome = beam::read_bytes(&bytes).unwrap().load(&mut sink).unwrap();

        assert_eq!(outcome.images_attached, 3);
        assert_eq!(fs::read(images.join("a_b")).unwrap(), b"first");
        assert_eq!(fs::read(images.join("a_b_1")).unwrap(), b"second");
        assert_eq!(fs::read(images.join("a_b_1_1")).unwrap(), b"third");
        assert_eq!(fs::read_dir(&images).unwrap().count(), 3);
    }
}
