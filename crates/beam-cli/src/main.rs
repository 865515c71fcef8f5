// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::error::Error;
use std::iter;

use crossterm::style::Stylize;

mod cli;
mod config;
mod logger;
mod sink;

fn main() {
    if let Err(error) = cli::process() {
        eprintln!("{}: {}", "Error".red(), chain(&error));
        std::process::exit(1);
    }
}

/// `error` followed by each of its sources, joined with `: `
fn chain(error: &(dyn Error + 'static)) -> String {
    iter::successors(Some(error), |&error| error.source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
