// SPDX-License-Identifier: MPL-2.0

//! `rollback <name>...` (B4, S5): pop the most recent history entry
//! back into the active slot and re-link `prefix/bin` at it. The old
//! Cellar directory is assumed still present — rollback never
//! re-downloads or re-extracts, it only repoints what's already on
//! disk.

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::link;
use crate::paths::{ConfigError, Layout};

const ARG_NAME: &str = "NAME";

pub fn command() -> Command {
    Command::new("rollback")
        .about("Roll a package back to its previous installed version")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let mut db = Database::open(layout)?;
    let mut all_ok = true;

    for name in args.get_many::<String>(ARG_NAME).into_iter().flatten() {
        match rollback_one(&mut db, layout, name) {
            Ok(version) => println!("Rolled back {name} to {version}"),
            Err(e) => {
                eprintln!("nanobrew: {name}: {e}");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

fn rollback_one(db: &mut Database, layout: &Layout, name: &str) -> Result<String, Error> {
    if db.find(name).is_none() {
        return Err(Error::NotInstalled(name.to_string()));
    }

    let previous = db.rollback(name)?.ok_or_else(|| Error::EmptyHistory(name.to_string()))?;
    link::link(layout, name, &previous.version)?;
    Ok(previous.version)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("link: {0}")]
    Link(#[from] link::Error),
    #[error("{0} is not installed")]
    NotInstalled(String),
    #[error("{0} has no prior version to roll back to")]
    EmptyHistory(String),
}
