// SPDX-License-Identifier: MPL-2.0

//! `install [--cask|--deb] <name>...` (§6): resolves each requested
//! name's transitive closure independently so one bad name (B2) or one
//! cask in a mixed batch doesn't abort the rest, then drives the
//! formula/deb path through [`crate::install::Orchestrator`] or the
//! cask path through [`crate::cask::materialize`].

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::cask;
use crate::config::{self, Settings};
use crate::db::Database;
use crate::extract;
use crate::http::{self, Headers};
use crate::install::Orchestrator;
use crate::metadata::cask as cask_metadata;
use crate::paths::{ConfigError, Layout};
use crate::resolver::{self, DescriptorSource};
use crate::source::{AptSource, FormulaSource};

const ARG_NAME: &str = "NAME";
const FLAG_CASK: &str = "cask";
const FLAG_DEB: &str = "deb";

pub fn command() -> Command {
    Command::new("install")
        .about("Install packages")
        .long_about("Install the requested software (and its dependencies) to the local system")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1..).action(ArgAction::Append))
        .arg(Arg::new(FLAG_CASK).long("cask").action(ArgAction::SetTrue).help("Install as a cask (app bundle / binary)"))
        .arg(Arg::new(FLAG_DEB).long("deb").action(ArgAction::SetTrue).help("Resolve against an APT Packages index instead of Homebrew formulae"))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;

    let names: Vec<&String> = args.get_many::<String>(ARG_NAME).into_iter().flatten().collect();
    let mut all_ok = true;
    let mut any_work = false;

    if args.get_flag(FLAG_CASK) {
        for name in names {
            match install_cask(layout, name) {
                Ok(()) => any_work = true,
                Err(e) => {
                    eprintln!("nanobrew: {name}: {e}");
                    all_ok = false;
                }
            }
        }
    } else {
        let settings: Settings = config::load(layout);
        let apt_source = if args.get_flag(FLAG_DEB) {
            Some(AptSource::load(layout, settings.apt_mirror(), settings.apt_dist(), settings.apt_component(), settings.apt_arch())?)
        } else {
            None
        };
        let formula_source = FormulaSource::new(layout);
        let source: &dyn DescriptorSource = match &apt_source {
            Some(s) => s,
            None => &formula_source,
        };

        let mut db = Database::open(layout)?;

        for name in names {
            match resolver::resolve(std::slice::from_ref(name), source) {
                Ok(descriptors) => {
                    let outcomes = Orchestrator::new(layout).install(&descriptors);
                    for outcome in &outcomes {
                        if outcome.succeeded() {
                            if !outcome.skipped {
                                any_work = true;
                            }
                            if let Some(actual_version) = &outcome.actual_version {
                                if !outcome.already_recorded(&db) {
                                    db.record_install(&outcome.name, actual_version, &outcome.sha256, super::now_epoch())?;
                                }
                            }
                            let verb = if outcome.skipped { "Already installed" } else { "Installed" };
                            println!("{verb} {} {}", outcome.name, outcome.actual_version.as_deref().unwrap_or(""));
                        } else {
                            eprintln!("nanobrew: {}: {}", outcome.name, outcome.error.as_deref().unwrap_or("install failed"));
                            all_ok = false;
                        }
                    }
                }
                Err(e) => {
                    eprintln!("nanobrew: {e}");
                    all_ok = false;
                }
            }
        }
    }

    if all_ok && !any_work {
        println!("already up to date");
    }

    Ok(all_ok)
}

fn install_cask(layout: &Layout, token: &str) -> Result<(), Error> {
    let descriptor = cask_metadata::fetch_cask(layout, token)?;

    let download_path = layout.tmp_dir().join(format!("{token}-{}.download", descriptor.version));
    let expected = match &descriptor.sha256 {
        cask::Sha256Check::Hash(h) => Some(h.as_str()),
        cask::Sha256Check::NoCheck => None,
    };
    http::get_to_file(&descriptor.url, &download_path, &Headers::default(), expected)?;

    let payload_dir = layout.tmp_dir().join(format!("{token}-{}.payload", descriptor.version));
    if payload_dir.is_dir() {
        std::fs::remove_dir_all(&payload_dir)?;
    }
    extract::extract(&download_path, &payload_dir)?;

    cask::materialize(layout, &descriptor, &payload_dir)?;

    let apps: Vec<String> = descriptor
        .artifacts
        .iter()
        .filter_map(|a| match a {
            cask::Artifact::App { target } => Some(target.clone()),
            _ => None,
        })
        .collect();
    let binaries: Vec<String> = descriptor
        .artifacts
        .iter()
        .filter_map(|a| match a {
            cask::Artifact::Binary { symlink: Some(link), .. } => Some(link.clone()),
            _ => None,
        })
        .collect();

    let mut db = Database::open(layout)?;
    db.record_cask_install(token, &descriptor.version, apps, binaries)?;

    println!("Installed {token} {}", descriptor.version);
    Ok(())
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("metadata: {0}")]
    Metadata(#[from] crate::metadata::Error),
    #[error("resolve: {0}")]
    Resolve(#[from] resolver::Error),
    #[error("network: {0}")]
    Network(#[from] http::Error),
    #[error("extract: {0}")]
    Extract(#[from] extract::Error),
    #[error("cask: {0}")]
    Cask(#[from] cask::Error),
    #[error("db: {0}")]
    Db(#[from] crate::db::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
