// SPDX-License-Identifier: MPL-2.0

use clap::{Arg, ArgAction, ArgMatches, Command as ClapCommand};
use thiserror::Error;

use crate::db::Database;
use crate::paths::{ConfigError, Layout};
use crate::services;

const ARG_NAME: &str = "NAME";

pub fn command() -> ClapCommand {
    ClapCommand::new("services")
        .about("Manage service units bundled with installed kegs")
        .subcommand_required(true)
        .subcommand(ClapCommand::new("list"))
        .subcommand(ClapCommand::new("start").arg(name_arg()))
        .subcommand(ClapCommand::new("stop").arg(name_arg()))
        .subcommand(ClapCommand::new("restart").arg(name_arg()))
}

fn name_arg() -> Arg {
    Arg::new(ARG_NAME).num_args(1).action(ArgAction::Set)
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let db = Database::open(layout)?;

    match args.subcommand() {
        Some(("list", _)) => {
            for service in services::discover(layout, &db, None) {
                println!("{}", service.name);
            }
            Ok(true)
        }
        Some((action @ ("start" | "stop" | "restart"), sub)) => {
            let name = sub.get_one::<String>(ARG_NAME).map(String::as_str);
            let matches = services::discover(layout, &db, name);
            if matches.is_empty() {
                eprintln!("nanobrew: no service unit found{}", name.map(|n| format!(" for {n}")).unwrap_or_default());
                return Ok(false);
            }

            let mut all_ok = true;
            for service in &matches {
                let result = match action {
                    "start" => services::start(service),
                    "stop" => services::stop(service),
                    "restart" => services::restart(service),
                    _ => unreachable!(),
                };
                let verb = match action {
                    "start" => "Started",
                    "stop" => "Stopped",
                    _ => "Restarted",
                };
                match result {
                    Ok(()) => println!("{verb} {}", service.name),
                    Err(e) => {
                        eprintln!("nanobrew: {}: {e}", service.name);
                        all_ok = false;
                    }
                }
            }
            Ok(all_ok)
        }
        _ => unreachable!("clap enforces subcommand_required"),
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
}
