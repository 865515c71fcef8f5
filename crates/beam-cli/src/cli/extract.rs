// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::PathBuf;

use beam::{BeamLoadError, BeamReadError};
use clap::Parser;
use crossterm::style::Stylize;
use fs_err as fs;
use thiserror::Error;

use crate::config::Settings;
use crate::sink::{self, DirectorySink};

#[derive(Debug, Parser)]
#[command(
    about = "Extract a `.beam` document to disk",
    long_about = "Load a `.beam` document and write its svg content, image sources and misc data as plain files"
)]
pub struct Command {
    #[arg(help = "document to extract")]
    path: PathBuf,
    #[arg(
        short,
        long,
        help = "Output directory, defaults to the document name without extension"
    )]
    output: Option<PathBuf>,
    #[arg(long, help = "Replace existing files", default_value = "false")]
    overwrite: bool,
}

/// Handle the `extract` command
pub fn handle(command: Command, settings: &Settings) -> Result<(), Error> {
    let output = match command.output {
        Some(output) => output,
        None => PathBuf::from(command.path.file_stem().ok_or(Error::NoOutput)?),
    };

    println!("Extract: {:?} -> {output:?}", command.path);

    let reader = beam::read(fs::File::open(&command.path)?)?;

    let mut sink = DirectorySink::new(output, command.overwrite || settings.overwrite());
    let outcome = reader.load(&mut sink).map_err(|error| match error {
        BeamLoadError::Read(error) => Error::Format(error),
        BeamLoadError::Sink(error) => Error::Sink(error),
    })?;

    for path in &sink.written {
        println!(" - {path:?}");
    }
    if !outcome.images_skipped.is_empty() {
        println!(
            "Skipped image sources with no element: {}",
            outcome.images_skipped.join(", ")
        );
    }
    for warning in &outcome.warnings {
        println!("{}: {warning}", "Warning".yellow());
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot derive an output directory, pass --output")]
    NoOutput,
    #[error("io")]
    Io(#[from] io::Error),
    #[error("beam format")]
    Format(#[from] BeamReadError),
    #[error("write document")]
    Sink(#[from] sink::Error),
}
