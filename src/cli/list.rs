// SPDX-License-Identifier: MPL-2.0

use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::paths::{ConfigError, Layout};

pub fn command() -> Command {
    Command::new("list").visible_alias("ls").about("List installed packages and casks")
}

pub fn handle(_args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;

    for keg in db.list() {
        let pin = if keg.pinned { " [pinned]" } else { "" };
        println!("{} {}{pin}", keg.name, keg.version);
    }
    for cask in db.list_casks() {
        println!("{} {} (cask)", cask.token, cask.version);
    }

    Ok(true)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
}
