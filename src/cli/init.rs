// SPDX-License-Identifier: MPL-2.0

use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::paths::Layout;

pub fn command() -> Command {
    Command::new("init").about("Create the root directory tree").long_about(
        "Create cache/, store/, Cellar/, bin/, db/ and the other directories a fresh root needs",
    )
}

pub fn handle(_args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.init()?;
    println!("initialized {}", layout.root().display());
    Ok(true)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
