// SPDX-License-Identifier: MPL-2.0

//! Rewrite the `@@PREFIX@@`/`@@CELLAR@@` placeholders embedded in
//! installed artifacts so inter-library references resolve into the
//! local installation. Two passes: native-binary load-command / dynamic
//! section rewriting, and plain text-file search-and-replace.

pub mod elf;
pub mod macho;
mod text;

use std::fs;
use std::io::Read;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use crate::paths::Layout;

pub const PREFIX_TOKEN: &str = "@@PREFIX@@";
pub const CELLAR_TOKEN: &str = "@@CELLAR@@";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    MachO,
    Elf64,
    Text,
    Skip,
}

const MACHO_MAGICS: [u32; 5] = [0xfeedface, 0xfeedfacf, 0xcafebabe, 0xcffaedfe, 0xcefaedfe];
const TEXT_EXTENSIONS: [&str; 3] = ["pc", "cmake", "la"];

fn sniff(path: &Path, header: &[u8]) -> Kind {
    if header.len() >= 4 {
        let be = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if MACHO_MAGICS.contains(&be) {
            return Kind::MachO;
        }
    }
    if header.len() >= 5 && &header[0..4] == b"\x7fELF" && header[4] == 2 {
        return Kind::Elf64;
    }
    if path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e))
        .unwrap_or(false)
    {
        return Kind::Text;
    }
    Kind::Skip
}

/// Walk `keg_dir` rewriting placeholders in every relocatable artifact.
/// Per-file failures are logged and do not abort the pass: materialization
/// and linking proceed regardless (§4.9's failure policy).
pub fn relocate(layout: &Layout, keg_dir: &Path) -> Result<(), Error> {
    let prefix = layout.prefix_dir();
    let cellar = layout.cellar_dir();
    let mut touched_macho = Vec::new();

    for entry in walkdir::WalkDir::new(keg_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();

        let header = match read_header(path) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("relocate: failed to read {}: {e}", path.display());
                continue;
            }
        };

        let kind = sniff(path, &header);
        if kind == Kind::Skip {
            continue;
        }

        if let Err(e) = break_sharing(path) {
            log::warn!("relocate: failed to break sharing for {}: {e}", path.display());
            continue;
        }

        let outcome = match kind {
            Kind::MachO => macho::patch(path, &prefix, &cellar).map(Some),
            Kind::Elf64 => elf::patch(path, &prefix, &cellar).map(|_| None),
            Kind::Text => text::patch(path, &prefix, &cellar).map(|_| None),
            Kind::Skip => unreachable!(),
        };

        match outcome {
            Ok(Some(changed)) if changed => touched_macho.push(path.to_path_buf()),
            Ok(_) => {}
            Err(e) => log::warn!("relocate: failed to patch {}: {e}", path.display()),
        }
    }

    if !touched_macho.is_empty() {
        macho::codesign_batch(&touched_macho);
    }

    Ok(())
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut buf = [0u8; 8];
    let n = file.read(&mut buf)?;
    Ok(buf[..n].to_vec())
}

/// Replace `path` with a private copy if it is a hardlink (refcount > 1)
/// so in-place edits don't leak into the store or a sibling keg. Plain
/// symlinks inside a keg point at other keg members, not the store, and
/// are left alone — only their eventual target file gets patched.
fn break_sharing(path: &Path) -> std::io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() || meta.nlink() <= 1 {
        return Ok(());
    }

    let contents = fs::read(path)?;
    let mode = meta.permissions().mode();
    fs::remove_file(path)?;
    fs::write(path, &contents)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// `CELLAR` replaced before `PREFIX` — longest-match-first avoids the
/// cellar path (which lives under the prefix) being partially consumed
/// by a naive prefix-only replace.
pub(crate) fn rewrite_placeholder(input: &str, prefix: &str, cellar: &str) -> String {
    input.replace(CELLAR_TOKEN, cellar).replace(PREFIX_TOKEN, prefix)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sniffs_macho_64() {
        assert_eq!(sniff(Path::new("a"), &0xfeedfacf_u32.to_be_bytes()), Kind::MachO);
    }

    #[test]
    fn sniffs_elf64() {
        let mut header = vec![0x7f, b'E', b'L', b'F', 2];
        header.resize(8, 0);
        assert_eq!(sniff(Path::new("a"), &header), Kind::Elf64);
    }

    #[test]
    fn sniffs_text_by_extension() {
        assert_eq!(sniff(Path::new("foo.pc"), &[0, 0]), Kind::Text);
        assert_eq!(sniff(Path::new("foo.bin"), &[0, 0]), Kind::Skip);
    }

    #[test]
    fn cellar_replaced_before_prefix() {
        let out = rewrite_placeholder("@@CELLAR@@/tree/2.1.1", "/opt/nanobrew/prefix", "/opt/nanobrew/prefix/Cellar");
        assert_eq!(out, "/opt/nanobrew/prefix/Cellar/tree/2.1.1");
    }
}
