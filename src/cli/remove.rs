// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::link;
use crate::paths::{ConfigError, Layout};

const ARG_NAME: &str = "NAME";
const FLAG_CASK: &str = "cask";

pub fn command() -> Command {
    Command::new("remove")
        .about("Remove packages")
        .long_about("Remove packages by name, unlinking them from the prefix")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
        .arg(Arg::new(FLAG_CASK).long("cask").action(ArgAction::SetTrue))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let names: Vec<&String> = args.get_many::<String>(ARG_NAME).into_iter().flatten().collect();
    let mut db = Database::open(layout)?;
    let mut all_ok = true;

    if args.get_flag(FLAG_CASK) {
        for name in names {
            if db.find_cask(name).is_some() {
                db.record_cask_removal(name)?;
                println!("Removed {name}");
            } else {
                eprintln!("nanobrew: {name}: no such cask installed");
                all_ok = false;
            }
        }
        return Ok(all_ok);
    }

    for name in names {
        let Some(record) = db.find(name).cloned() else {
            eprintln!("nanobrew: {name}: not installed");
            all_ok = false;
            continue;
        };
        match link::unlink(layout, &record.name, &record.version) {
            Ok(()) => {
                db.record_removal(&record.name)?;
                println!("Removed {} {}", record.name, record.version);
            }
            Err(e) => {
                eprintln!("nanobrew: {name}: {e}");
                all_ok = false;
            }
        }
    }

    Ok(all_ok)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("link: {0}")]
    Link(#[from] link::Error),
}
