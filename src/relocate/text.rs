// SPDX-License-Identifier: MPL-2.0

//! Plain byte-level search-and-replace for `.pc`/`.cmake`/`.la` and
//! similar text configuration files. No size constraint applies since
//! the whole file is rewritten, not patched in a fixed-size field.

use std::fs;
use std::path::Path;

use super::{rewrite_placeholder, Error};

pub fn patch(path: &Path, prefix: &Path, cellar: &Path) -> Result<(), Error> {
    let Ok(content) = fs::read_to_string(path) else {
        // Binary content masquerading under a text extension; skip.
        return Ok(());
    };

    if !content.contains(super::PREFIX_TOKEN) && !content.contains(super::CELLAR_TOKEN) {
        return Ok(());
    }

    let prefix_str = prefix.to_string_lossy();
    let cellar_str = cellar.to_string_lossy();
    let rewritten = rewrite_placeholder(&content, &prefix_str, &cellar_str);

    if rewritten != content {
        fs::write(path, rewritten)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rewrites_pkgconfig_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.pc");
        fs::write(&path, "prefix=@@PREFIX@@\nlibdir=@@CELLAR@@/tree/2.1.1/lib\n").unwrap();

        patch(&path, Path::new("/opt/nanobrew/prefix"), Path::new("/opt/nanobrew/prefix/Cellar")).unwrap();

        let out = fs::read_to_string(&path).unwrap();
        assert_eq!(out, "prefix=/opt/nanobrew/prefix\nlibdir=/opt/nanobrew/prefix/Cellar/tree/2.1.1/lib\n");
    }

    #[test]
    fn leaves_files_without_placeholders_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.cmake");
        fs::write(&path, "set(FOO bar)\n").unwrap();

        patch(&path, Path::new("/opt/nanobrew/prefix"), Path::new("/opt/nanobrew/prefix/Cellar")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "set(FOO bar)\n");
    }
}
