// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::{Path, PathBuf};

use beam::{BeamFileInfo, BeamReadError, BeamThumbnail, BEAM_MAGIC};
use clap::Parser;
use fs_err as fs;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(
    about = "Show preview info of a document",
    long_about = "Print the workarea and thumbnail of a `.beam` or plain `.svg` document"
)]
pub struct Command {
    #[arg(help = "document to examine")]
    path: PathBuf,
    #[arg(long, help = "Print the thumbnail as a data URL", default_value = "false")]
    data_url: bool,
}

pub fn handle(command: Command) -> Result<(), Error> {
    let bytes = fs::read(&command.path)?;

    let info = if bytes.starts_with(BEAM_MAGIC) {
        beam::read_file_info(&bytes)?
    } else if is_svg(&command.path) {
        beam::read_svg_file_info(&bytes)
    } else {
        return Err(Error::UnknownFormat(command.path));
    };

    print(&info, command.data_url);

    Ok(())
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
}

fn print(info: &BeamFileInfo<'_>, data_url: bool) {
    println!("Workarea: {}", info.workarea.as_deref().unwrap_or("-"));

    match &info.thumbnail {
        Some(thumbnail) if data_url => println!("{}", thumbnail.data_url()),
        Some(thumbnail @ BeamThumbnail::Raster(image)) => {
            println!("Thumbnail: {} ({} bytes)", thumbnail.mime_type(), image.len());
        }
        Some(thumbnail @ BeamThumbnail::Svg(_)) => println!("Thumbnail: {}", thumbnail.mime_type()),
        None => println!("Thumbnail: -"),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0:?} is neither a beam file nor an svg document")]
    UnknownFormat(PathBuf),
    #[error("io")]
    Io(#[from] io::Error),
    #[error("beam format")]
    Format(#[from] BeamReadError),
}
