// SPDX-License-Identifier: MPL-2.0

use clap::{ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::doctor;
use crate::paths::{ConfigError, Layout};

pub fn command() -> Command {
    Command::new("doctor").about("Diagnose divergence between the database and the on-disk tree")
}

pub fn handle(_args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;
    let issues = doctor::run(layout, &db);

    if issues.is_empty() {
        println!("no issues found");
        return Ok(true);
    }

    for issue in &issues {
        println!("{issue}");
    }
    Ok(false)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
}
