// SPDX-License-Identifier: MPL-2.0

use clap::builder::NonEmptyStringValueParser;
use clap::{Arg, ArgMatches, Command};

use crate::metadata;
use crate::paths::Layout;

const ARG_QUERY: &str = "QUERY";

pub fn command() -> Command {
    Command::new("search")
        .visible_alias("sr")
        .about("Search packages")
        .long_about("Search packages by looking into package names and summaries")
        .arg(Arg::new(ARG_QUERY).required(true).num_args(1).value_parser(NonEmptyStringValueParser::new()))
}

/// Best-effort by design (`metadata::search` skips failing backends
/// rather than erroring), so this always exits 0.
pub fn handle(args: &ArgMatches, layout: &Layout) -> bool {
    let query = args.get_one::<String>(ARG_QUERY).unwrap();
    let hits = metadata::search(layout, query);

    if hits.is_empty() {
        println!("no matches for {query}");
        return true;
    }

    for hit in hits {
        println!("{} {} [{:?}] {}", hit.name, hit.version, hit.kind, hit.desc);
    }
    true
}
