// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use beam::{BeamBlockKind, BEAM_FORMAT_VERSION, BEAM_IMAGE_SOURCE_ID_MAX_LEN, BEAM_MAGIC};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(about = "Print version info and exit")]
pub struct Command {
    #[arg(
        long = "full",
        help = "Also print the container format this build reads and writes",
        default_value = "false"
    )]
    full: bool,
}

pub fn handle(command: Command) {
    print();

    if command.full {
        for line in format_lines() {
            println!("  {line}");
        }
    }
}

/// Print program version
pub fn print() {
    println!("beam {}", env!("CARGO_PKG_VERSION"));
}

/// Container format details
fn format_lines() -> Vec<String> {
    let kinds = BeamBlockKind::CONTENTS
        .iter()
        .map(|kind| format!("{kind}={}", kind.tag()))
        .collect::<Vec<_>>();

    vec![
        format!(
            "magic: {:?}, writes version {BEAM_FORMAT_VERSION}, reads newer versions best-effort",
            String::from_utf8_lossy(BEAM_MAGIC)
        ),
        format!("blocks: {}", kinds.join(", ")),
        format!("image source ids: at most {BEAM_IMAGE_SOURCE_ID_MAX_LEN} bytes"),
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_summary() {
        let lines = format_lines();

        assert_eq!(lines[0], "magic: \"Beam\", writes version 2, reads newer versions best-effort");
        assert_eq!(
            lines[1],
            "blocks: svg-content=1, image-source=2, thumbnail=3, misc-data=4"
        );
        assert_eq!(lines[2], "image source ids: at most 255 bytes");
    }
}
