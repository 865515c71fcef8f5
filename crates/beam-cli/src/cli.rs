// SPDX-FileCopyrightText: Copyright © 2020-2025 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser};
use clap_complete::{
    generate_to,
    shells::{Bash, Fish, Zsh},
};
use clap_mangen::Man;
use fs_err::{self as fs, File};
use thiserror::Error;

use crate::config::{self, Settings};
use crate::logger;

mod extract;
mod info;
mod inspect;
mod pack;
mod version;

#[derive(Debug, Parser)]
#[command(name = "beam", about = "Inspect, unpack and build beam documents")]
pub struct Command {
    #[command(flatten)]
    pub global: Global,
    #[command(subcommand)]
    pub subcommand: Option<Subcommand>,
}

#[derive(Debug, Args)]
pub struct Global {
    #[arg(
        short,
        long = "verbose",
        help = "Prints additional information about what beam is doing",
        default_value = "false",
        global = true
    )]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
    #[arg(long, global = true, hide = true)]
    pub generate_manpages: Option<PathBuf>,
    #[arg(long, global = true, hide = true)]
    pub generate_completions: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    Extract(extract::Command),
    Info(info::Command),
    Inspect(inspect::Command),
    Pack(pack::Command),
    Version(version::Command),
}

pub fn process() -> Result<(), Error> {
    let Command { global, subcommand } = Command::parse();

    logger::init(global.verbose);

    if let Some(dir) = global.generate_manpages {
        fs::create_dir_all(&dir)?;
        let main_cmd = Command::command();
        let main_man = Man::new(main_cmd.clone());
        let mut buffer = File::create(dir.join("beam.1"))?;
        main_man.render(&mut buffer)?;

        for sub in main_cmd.get_subcommands() {
            let sub_man = Man::new(sub.clone());
            let name = format!("beam-{}.1", sub.get_name());
            let mut buffer = File::create(dir.join(&name))?;
            sub_man.render(&mut buffer)?;
        }
        return Ok(());
    }

    if let Some(dir) = global.generate_completions {
        fs::create_dir_all(&dir)?;
        let mut cmd = Command::command();
        generate_to(Bash, &mut cmd, "beam", &dir)?;
        generate_to(Fish, &mut cmd, "beam", &dir)?;
        generate_to(Zsh, &mut cmd, "beam", &dir)?;
        return Ok(());
    }

    let manager = match global.config_dir {
        Some(dir) => config::Manager::custom(dir),
        None => config::Manager::user("beam")?,
    };
    let settings = manager.load::<Settings>().unwrap_or_default();

    if global.verbose {
        match subcommand {
            Some(Subcommand::Version(_)) => (),
            _ => version::print(),
        }
        println!("{settings:?}");
    }

    match subcommand {
        Some(Subcommand::Extract(command)) => extract::handle(command, &settings)?,
        Some(Subcommand::Info(command)) => info::handle(command)?,
        Some(Subcommand::Inspect(command)) => inspect::handle(command)?,
        Some(Subcommand::Pack(command)) => pack::handle(command, &settings)?,
        Some(Subcommand::Version(command)) => version::handle(command),
        None => (),
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("extract")]
    Extract(#[from] extract::Error),
    #[error("info")]
    Info(#[from] info::Error),
    #[error("inspect")]
    Inspect(#[from] inspect::Error),
    #[error("pack")]
    Pack(#[from] pack::Error),
    #[error("config")]
    Config(#[from] config::CreateUserError),
    #[error("io error")]
    Io(#[from] std::io::Error),
}
