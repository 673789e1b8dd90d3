// SPDX-License-Identifier: MPL-2.0

//! `bundle dump`/`bundle install`: a Brewfile-style manifest of the
//! active install set, for the L1 round-trip ("dump then install
//! yields the same active keg names").

use std::fs;
use std::path::Path;

use crate::db::Database;

pub const DEFAULT_FILENAME: &str = "Brewfile";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub formulae: Vec<String>,
    pub casks: Vec<String>,
}

/// Render `db`'s active kegs and casks as `brew "name"` / `cask "token"`
/// lines, one per line, in database insertion order.
pub fn dump(db: &Database) -> String {
    let mut out = String::new();
    for keg in db.list() {
        out.push_str(&format!("brew \"{}\"\n", keg.name));
    }
    for cask in db.list_casks() {
        out.push_str(&format!("cask \"{}\"\n", cask.token));
    }
    out
}

pub fn write(path: &Path, db: &Database) -> Result<(), std::io::Error> {
    fs::write(path, dump(db))
}

/// Parse a Brewfile-style manifest: `brew "name"` and `cask "token"`
/// lines; anything else (blank lines, comments, unrecognized
/// directives) is ignored.
pub fn parse(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    for line in text.lines() {
        let line = line.trim();
        if let Some(name) = directive(line, "brew") {
            manifest.formulae.push(name);
        } else if let Some(token) = directive(line, "cask") {
            manifest.casks.push(token);
        }
    }
    manifest
}

fn directive(line: &str, keyword: &str) -> Option<String> {
    let rest = line.strip_prefix(keyword)?.trim_start();
    let quoted = rest.strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some(quoted[..end].to_string())
}

pub fn read(path: &Path) -> Result<Manifest, std::io::Error> {
    Ok(parse(&fs::read_to_string(path)?))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::paths::Layout;

    #[test]
    fn dump_then_parse_round_trips_names() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let mut db = Database::open(&layout).unwrap();
        db.record_install("tree", "2.1.1", &"a".repeat(64), 1).unwrap();
        db.record_install("jq", "1.7", &"b".repeat(64), 2).unwrap();
        db.record_cask_install("some-app", "1.0", vec!["Some App.app".into()], vec![]).unwrap();

        let text = dump(&db);
        let manifest = parse(&text);

        assert_eq!(manifest.formulae, vec!["tree".to_string(), "jq".to_string()]);
        assert_eq!(manifest.casks, vec!["some-app".to_string()]);
    }

    #[test]
    fn parse_ignores_comments_and_blank_lines() {
        let manifest = parse("# a comment\n\nbrew \"tree\"\n");
        assert_eq!(manifest.formulae, vec!["tree".to_string()]);
    }
}
