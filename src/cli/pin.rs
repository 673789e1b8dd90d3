// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::paths::{ConfigError, Layout};

const ARG_NAME: &str = "NAME";

pub fn command() -> Command {
    Command::new("pin")
        .about("Pin packages against upgrades")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
}

pub fn unpin_command() -> Command {
    Command::new("unpin")
        .about("Unpin packages, allowing them to upgrade again")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
}

pub fn handle(args: &ArgMatches, layout: &Layout, pinned: bool) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let mut db = Database::open(layout)?;
    let mut all_ok = true;

    for name in args.get_many::<String>(ARG_NAME).into_iter().flatten() {
        if db.find(name).is_none() {
            eprintln!("nanobrew: {name}: not installed");
            all_ok = false;
            continue;
        }
        db.set_pinned(name, pinned)?;
        println!("{}{name}", if pinned { "Pinned " } else { "Unpinned " });
    }

    Ok(all_ok)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
}
