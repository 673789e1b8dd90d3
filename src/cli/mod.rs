// SPDX-License-Identifier: MPL-2.0

//! Command-line surface (§6): one module per top-level subcommand,
//! dispatched from a single [`clap::Command`] tree. Each `handle`
//! returns whether its batch had any per-package failure so `process`
//! can map that to the exit code §6 specifies (0 clean, 1 otherwise).

mod bundle;
mod cleanup;
mod completions;
mod deps;
mod doctor;
mod info;
mod init;
mod install;
mod list;
mod pin;
mod remove;
mod rollback;
mod search;
mod services;
mod update;
mod upgrade;

use std::process::ExitCode;

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::paths::Layout;

const ARG_ROOT: &str = "root";

fn command() -> Command {
    Command::new("nanobrew")
        .about("A homebrew-flavored package manager client")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new(ARG_ROOT)
                .long("root")
                .global(true)
                .help("Root directory (defaults to $NANOBREW_ROOT, else a compiled-in path)")
                .action(ArgAction::Set),
        )
        .subcommand(init::command())
        .subcommand(install::command())
        .subcommand(remove::command())
        .subcommand(list::command())
        .subcommand(info::command())
        .subcommand(search::command())
        .subcommand(upgrade::command())
        .subcommand(upgrade::outdated_command())
        .subcommand(update::command())
        .subcommand(doctor::command())
        .subcommand(cleanup::command())
        .subcommand(pin::command())
        .subcommand(pin::unpin_command())
        .subcommand(rollback::command())
        .subcommand(bundle::command())
        .subcommand(deps::command())
        .subcommand(services::command())
        .subcommand(completions::command())
}

fn layout_from(matches: &ArgMatches) -> Layout {
    Layout::resolve(matches.get_one::<String>(ARG_ROOT).map(String::as_str))
}

/// Epoch seconds for a fresh `KegRecord::installed_at`.
pub(crate) fn now_epoch() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Parse argv, dispatch to the matched subcommand, and translate its
/// outcome into a process exit code: 0 on full success, 1 on a usage
/// error or any per-package failure (§6).
pub fn process() -> Result<ExitCode, Error> {
    let matches = command().get_matches();
    let layout = layout_from(&matches);

    let ok = match matches.subcommand() {
        Some(("init", args)) => init::handle(args, &layout).map_err(Error::Init)?,
        Some(("install", args)) => install::handle(args, &layout).map_err(Error::Install)?,
        Some(("remove", args)) => remove::handle(args, &layout).map_err(Error::Remove)?,
        Some(("list", args)) => list::handle(args, &layout).map_err(Error::List)?,
        Some(("info", args)) => info::handle(args, &layout).map_err(Error::Info)?,
        Some(("search", args)) => search::handle(args, &layout),
        Some(("upgrade", args)) => upgrade::handle(args, &layout).map_err(Error::Upgrade)?,
        Some(("update", args)) => update::handle(args, &layout).map_err(Error::Update)?,
        Some(("outdated", args)) => upgrade::handle_outdated(args, &layout).map_err(Error::Upgrade)?,
        Some(("doctor", args)) => doctor::handle(args, &layout).map_err(Error::Doctor)?,
        Some(("cleanup", args)) => cleanup::handle(args, &layout).map_err(Error::Cleanup)?,
        Some(("pin", args)) => pin::handle(args, &layout, true).map_err(Error::Pin)?,
        Some(("unpin", args)) => pin::handle(args, &layout, false).map_err(Error::Pin)?,
        Some(("rollback", args)) => rollback::handle(args, &layout).map_err(Error::Rollback)?,
        Some(("bundle", args)) => bundle::handle(args, &layout).map_err(Error::Bundle)?,
        Some(("deps", args)) => deps::handle(args, &layout).map_err(Error::Deps)?,
        Some(("services", args)) => services::handle(args, &layout).map_err(Error::Services)?,
        Some(("completions", args)) => {
            completions::handle(args, command());
            true
        }
        _ => unreachable!("clap enforces subcommand_required"),
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("init: {0}")]
    Init(#[from] init::Error),
    #[error("install: {0}")]
    Install(#[from] install::Error),
    #[error("remove: {0}")]
    Remove(#[from] remove::Error),
    #[error("list: {0}")]
    List(#[from] list::Error),
    #[error("info: {0}")]
    Info(#[from] info::Error),
    #[error("upgrade: {0}")]
    Upgrade(#[from] upgrade::Error),
    #[error("update: {0}")]
    Update(#[from] update::Error),
    #[error("doctor: {0}")]
    Doctor(#[from] doctor::Error),
    #[error("cleanup: {0}")]
    Cleanup(#[from] cleanup::Error),
    #[error("pin: {0}")]
    Pin(#[from] pin::Error),
    #[error("rollback: {0}")]
    Rollback(#[from] rollback::Error),
    #[error("bundle: {0}")]
    Bundle(#[from] bundle::Error),
    #[error("deps: {0}")]
    Deps(#[from] deps::Error),
    #[error("services: {0}")]
    Services(#[from] services::Error),
}
