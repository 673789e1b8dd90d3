// SPDX-License-Identifier: MPL-2.0

//! `deps [--tree] <name>`: without `--tree`, the flat topological
//! install order the resolver would use; with it, a recursive
//! indented dependency tree straight off the fetched descriptors.

use std::collections::HashMap;

use clap::{Arg, ArgAction, ArgMatches, Command};
use thiserror::Error;

use crate::descriptor::Descriptor;
use crate::paths::{ConfigError, Layout};
use crate::resolver;
use crate::source::FormulaSource;

const ARG_NAME: &str = "NAME";
const FLAG_TREE: &str = "tree";

pub fn command() -> Command {
    Command::new("deps")
        .about("Show a package's dependencies")
        .arg(Arg::new(ARG_NAME).required(true).num_args(1))
        .arg(Arg::new(FLAG_TREE).long("tree").action(ArgAction::SetTrue))
}

pub fn handle(args: &ArgMatches, layout: &Layout) -> Result<bool, Error> {
    layout.ensure_initialized()?;
    let name = args.get_one::<String>(ARG_NAME).unwrap();
    let source = FormulaSource::new(layout);
    let descriptors = resolver::resolve(std::slice::from_ref(name), &source)?;

    if args.get_flag(FLAG_TREE) {
        let by_name: HashMap<&str, &Descriptor> = descriptors.iter().map(|d| (d.name.as_str(), d)).collect();
        print_tree(&by_name, name, 0);
    } else {
        for descriptor in &descriptors {
            println!("{} {}", descriptor.name, descriptor.effective_version());
        }
    }

    Ok(true)
}

fn print_tree(by_name: &HashMap<&str, &Descriptor>, name: &str, depth: usize) {
    println!("{}{}", "  ".repeat(depth), name);
    if let Some(descriptor) = by_name.get(name) {
        for dep in &descriptor.dependencies {
            print_tree(by_name, dep, depth + 1);
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("resolve: {0}")]
    Resolve(#[from] resolver::Error),
}
