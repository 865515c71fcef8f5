// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::PathBuf;

use beam::{BeamMiscData, BeamWriteError, BeamWriter};
use clap::Parser;
use fs_err as fs;
use thiserror::Error;

use crate::config::Settings;

#[derive(Debug, Parser)]
#[command(about = "Build a `.beam` document from plain files")]
pub struct Command {
    #[arg(long, help = "svg document")]
    svg: PathBuf,
    #[arg(
        long = "image",
        value_parser = parse_image,
        help = "image source for an element, can be passed multiple times",
        long_help = "image source for an element, can be passed multiple times\n\nExample: --image svg_3=photo.png"
    )]
    images: Vec<(String, PathBuf)>,
    #[arg(long, help = "preview image")]
    thumbnail: Option<PathBuf>,
    #[arg(long, help = "misc data JSON")]
    misc: Option<PathBuf>,
    #[arg(short, long, help = "output file")]
    output: PathBuf,
    #[arg(long, help = "Replace an existing output file", default_value = "false")]
    overwrite: bool,
}

/// Parse a single `id=path` pair
fn parse_image(s: &str) -> Result<(String, PathBuf), String> {
    let (id, path) = s.split_once('=').ok_or("expected ID=FILE")?;

    if id.is_empty() {
        return Err("missing element id".to_owned());
    }

    Ok((id.to_owned(), PathBuf::from(path)))
}

pub fn handle(command: Command, settings: &Settings) -> Result<(), Error> {
    if command.output.exists() && !(command.overwrite || settings.overwrite()) {
        return Err(Error::Exists(command.output));
    }

    let svg = fs::read_to_string(&command.svg)?;
    let images = command
        .images
        .iter()
        .map(|(id, path)| Ok((id.as_str(), fs::read(path)?)))
        .collect::<Result<Vec<_>, io::Error>>()?;
    let thumbnail = command.thumbnail.as_ref().map(fs::read).transpose()?;
    let misc_data = match &command.misc {
        Some(path) => serde_json::from_slice::<BeamMiscData>(&fs::read(path)?)?,
        None => BeamMiscData::default(),
    };

    let mut bytes = vec![];

    let mut writer = BeamWriter::new(&mut bytes, &svg)
        .with_host_version(settings.host_version())
        .with_misc_data(misc_data);
    if let Some(thumbnail) = &thumbnail {
        writer = writer.with_thumbnail(thumbnail);
    }
    for (id, image) in &images {
        writer.add_image_source(*id, image.as_slice())?;
    }
    writer.finalize()?;

    fs::write(&command.output, &bytes)?;

    println!("Packed {:?} ({} bytes)", command.output, bytes.len());

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?} already exists, pass --overwrite to replace it")]
    Exists(PathBuf),
    #[error("misc data")]
    MiscData(#[from] serde_json::Error),
    #[error("io")]
    Io(#[from] io::Error),
    #[error("beam format")]
    Write(#[from] BeamWriteError),
}
