// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::io;
use std::path::PathBuf;

use beam::{BeamBlockKind, BeamDecodedBody, BeamReadError, BeamScanState};
use clap::Parser;
use crossterm::style::Stylize;
use fs_err::File;
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(
    about = "Examine raw beam files",
    long_about = "Show detailed (debug) information on local `.beam` files"
)]
pub struct Command {
    #[arg(required = true, help = "files to inspect")]
    paths: Vec<PathBuf>,
}

/// Inspect the given .beam files and print results
pub fn handle(command: Command) -> Result<(), Error> {
    for path in command.paths {
        let reader = beam::read(File::open(&path)?)?;

        println!("{path:?} = beam container version {}", reader.signature.version);

        match &reader.header.metadata {
            Some(metadata) => {
                println!("Contents: {:?}", metadata.contents);
                if let Some(version) = &metadata.version {
                    println!("Written by: {version}");
                }
            }
            None => println!("Metadata: {:?}", reader.header.raw_metadata),
        }

        for kind in BeamBlockKind::CONTENTS {
            if let Some(len) = reader.header.declared_len(kind) {
                println!("Declared {kind}: {len} bytes");
            }
        }

        let mut blocks = reader.blocks();

        for block in &mut blocks {
            let block = block?;

            println!(
                " - {} @ {} [{} bytes]",
                block.kind(),
                block.frame.offset,
                block.frame.payload_len
            );

            match &block.body {
                BeamDecodedBody::ImageSource(sources) => {
                    for source in sources {
                        println!("     {} ({} bytes)", source.id, source.data.len());
                    }
                }
                BeamDecodedBody::MiscData { data: Some(misc), .. } => {
                    println!("     keys: {}", misc.keys().collect::<Vec<_>>().join(", "));
                }
                BeamDecodedBody::MiscData { data: None, raw } => {
                    println!("     malformed: {raw:?}");
                }
                BeamDecodedBody::SvgContent(_) | BeamDecodedBody::Thumbnail(_) => {}
            }
        }

        if blocks.state() == BeamScanState::DoneCorrupt {
            println!("{}: no end block, file may be corrupted", "Warning".yellow());
        }
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io")]
    Io(#[from] io::Error),
    #[error("beam format")]
    Format(#[from] BeamReadError),
}
