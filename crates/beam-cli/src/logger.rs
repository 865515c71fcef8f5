// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use tracing_subscriber::EnvFilter;

/// Default filter directive. Warnings surface through load outcomes already,
/// so only `--verbose` lowers the level below errors.
pub fn directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "error"
    }
}

/// Install the stderr subscriber. `RUST_LOG` overrides the verbosity
/// derived default, and library `log` records are bridged in.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(verbose)));

    // Fails only when a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
