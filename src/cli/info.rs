// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::db::Database;
use crate::metadata::formula;
use crate::paths::{ConfigError, Layout};

const ARG_NAME: &str = "NAME";

pub fn command() -> Command {
    Command::new("info")
        .about("Query packages")
        .long_about("Show detailed information for one or more packages")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;
    let mut all_ok = true;

    for name in args.get_many::<String>(ARG_NAME).into_iter().flatten() {
        if let Some(record) = db.find(name) {
            let pin = if record.pinned { ", pinned" } else { "" };
            println!("{} (installed: {}{pin})", record.name, record.version);
            continue;
        }
        if let Some(cask) = db.find_cask(name) {
            println!("{} (installed cask: {})", cask.token, cask.version);
            continue;
        }

        match formula::fetch_descriptor(layout, name) {
            Ok(descriptor) => {
                println!("{} {}: {}", descriptor.name, descriptor.effective_version(), descriptor.desc);
                if !descriptor.dependencies.is_empty() {
                    println!("  depends on: {}", descriptor.dependencies.join(", "));
                }
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
}
