// SPDX-License-Identifier: MPL-2.0

//! Shallow services controller (§4.16): inspects kegs for a service
//! unit file and shells out to the platform service manager. No
//! supervision, retry, or log capture — "acknowledged but not
//! specified in depth" per §1.

use std::path::PathBuf;
use std::process::Command;

use crate::db::Database;
use crate::paths::Layout;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no service unit found for {0}")]
    NoUnit(String),
    #[error("failed to invoke service manager: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    pub unit_path: PathBuf,
}

#[cfg(target_os = "macos")]
fn unit_path_for(layout: &Layout, name: &str, version: &str) -> PathBuf {
    layout.keg_dir(name, version).join(format!("homebrew.mxcl.{name}.plist"))
}

#[cfg(not(target_os = "macos"))]
fn unit_path_for(layout: &Layout, name: &str, version: &str) -> PathBuf {
    layout.keg_dir(name, version).join("lib/systemd/system").join(format!("{name}.service"))
}

/// Every installed keg that carries a recognized service unit file,
/// optionally filtered to one `name`.
pub fn discover(layout: &Layout, db: &Database, name: Option<&str>) -> Vec<Service> {
    db.list()
        .iter()
        .filter(|keg| name.map_or(true, |n| n == keg.name))
        .filter_map(|keg| {
            let unit_path = unit_path_for(layout, &keg.name, &keg.version);
            unit_path.is_file().then(|| Service { name: keg.name.clone(), unit_path })
        })
        .collect()
}

#[cfg(target_os = "macos")]
fn manager_command(action: &str, service: &Service) -> Command {
    let mut cmd = Command::new("launchctl");
    match action {
        "start" => {
            cmd.arg("load").arg(&service.unit_path);
        }
        "stop" => {
            cmd.arg("unload").arg(&service.unit_path);
        }
        _ => unreachable!("restart is decomposed into stop+start"),
    }
    cmd
}

#[cfg(not(target_os = "macos"))]
fn manager_command(action: &str, service: &Service) -> Command {
    let mut cmd = Command::new("systemctl");
    cmd.arg(action).arg(&service.name);
    cmd
}

fn invoke(action: &str, service: &Service) -> Result<(), Error> {
    manager_command(action, service).status().map_err(Error::Spawn)?;
    Ok(())
}

pub fn start(service: &Service) -> Result<(), Error> {
    invoke("start", service)
}

pub fn stop(service: &Service) -> Result<(), Error> {
    invoke("stop", service)
}

pub fn restart(service: &Service) -> Result<(), Error> {
    stop(service)?;
    start(service)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discover_finds_only_kegs_with_a_unit_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let mut db = Database::open(&layout).unwrap();
        db.record_install("tree", "2.1.1", &"a".repeat(64), 1).unwrap();
        db.record_install("redis", "7.0", &"b".repeat(64), 2).unwrap();

        let unit = unit_path_for(&layout, "redis", "7.0");
        std::fs::create_dir_all(unit.parent().unwrap()).unwrap();
        std::fs::write(&unit, "unit").unwrap();

        let services = discover(&layout, &db, None);
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].name, "redis");
    }

    #[test]
    fn discover_filters_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::resolve(Some(dir.path().to_str().unwrap()));
        layout.init().unwrap();

        let mut db = Database::open(&layout).unwrap();
        db.record_install("redis", "7.0", &"b".repeat(64), 2).unwrap();
        let unit = unit_path_for(&layout, "redis", "7.0");
        std::fs::create_dir_all(unit.parent().unwrap()).unwrap();
        std::fs::write(&unit, "unit").unwrap();

        assert_eq!(discover(&layout, &db, Some("nginx")).len(), 0);
        assert_eq!(discover(&layout, &db, Some("redis")).len(), 1);
    }
}
