// SPDX-License-Identifier: MPL-2.0

use std::io;

use clap::{arg, ArgMatches, Command};
use clap_complete::{generate, Shell};

pub fn command() -> Command {
    Command::new("completions")
        .about("Generate shell completions")
        .arg(arg!(<SHELL> ... "Shell to generate completions for: bash, zsh, or fish").value_parser(clap::value_parser!(Shell)))
}

pub fn handle(args: &ArgMatches, mut cli: Command) {
    let shell = *args.get_one::<Shell>("SHELL").unwrap();
    generate(shell, &mut cli, "nanobrew", &mut io::stdout());
}
