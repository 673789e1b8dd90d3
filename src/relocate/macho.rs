// SPDX-License-Identifier: MPL-2.0

//! Mach-O load-command string rewriting: dylib id, linked-library, and
//! rpath strings are patched in place when the replacement fits in the
//! command's existing byte span; otherwise the rewrite is deferred to a
//! batched `install_name_tool` invocation.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{rewrite_placeholder, Error};

const FAT_MAGIC: u32 = 0xcafebabe;
const FAT_CIGAM: u32 = 0xbebafeca;
const MH_MAGIC_64: u32 = 0xfeedfacf;

const LC_ID_DYLIB: u32 = 0xd;
const LC_LOAD_DYLIB: u32 = 0xc;
const LC_LOAD_WEAK_DYLIB: u32 = 0x18;
const LC_REEXPORT_DYLIB: u32 = 0x1f;
const LC_RPATH: u32 = 0x1c;

struct ToolOp {
    kind: ToolOpKind,
    old: String,
    new: String,
}

enum ToolOpKind {
    Id,
    Change,
    Rpath,
}

/// Patch `path` in place, returning whether any bytes were modified.
/// Strings that don't fit their original allotted space are collected
/// and applied afterward via `install_name_tool`.
pub fn patch(path: &Path, prefix: &Path, cellar: &Path) -> Result<bool, Error> {
    let prefix_str = prefix.to_string_lossy().to_string();
    let cellar_str = cellar.to_string_lossy().to_string();

    let mut buf = fs::read(path)?;
    if buf.len() < 4 {
        return Ok(false);
    }

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let mut tool_ops = Vec::new();
    let mut changed = false;

    if magic == FAT_MAGIC || magic == FAT_CIGAM {
        let nfat = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as usize;
        let mut slices = Vec::new();
        for i in 0..nfat {
            let entry = 8 + i * 20;
            if entry + 20 > buf.len() {
                break;
            }
            let offset = u32::from_be_bytes(buf[entry + 8..entry + 12].try_into().unwrap()) as usize;
            slices.push(offset);
        }
        for offset in slices {
            changed |= patch_region(&mut buf, offset, &prefix_str, &cellar_str, &mut tool_ops)?;
        }
    } else if magic == MH_MAGIC_64 {
        changed |= patch_region(&mut buf, 0, &prefix_str, &cellar_str, &mut tool_ops)?;
    } else {
        // 32-bit or foreign-endian Mach-O: recognized but out of scope.
        return Ok(false);
    }

    if changed {
        let tmp = path.with_extension("nanobrew-relocate-tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, path)?;
    }

    if !tool_ops.is_empty() {
        apply_tool_ops(path, &tool_ops);
        changed = true;
    }

    Ok(changed)
}

/// Parse and patch the load commands of the 64-bit Mach-O header
/// starting at `region_start` within `buf`. Returns whether any
/// in-place edit was made; strings too long to fit are pushed onto
/// `tool_ops` for the `install_name_tool` fallback.
fn patch_region(
    buf: &mut [u8],
    region_start: usize,
    prefix: &str,
    cellar: &str,
    tool_ops: &mut Vec<ToolOp>,
) -> Result<bool, Error> {
    if region_start + 32 > buf.len() {
        return Ok(false);
    }
    let magic = u32::from_le_bytes(buf[region_start..region_start + 4].try_into().unwrap());
    if magic != MH_MAGIC_64 {
        // A fat slice holding a 32-bit architecture; skip it.
        return Ok(false);
    }

    let ncmds = u32::from_le_bytes(buf[region_start + 16..region_start + 20].try_into().unwrap()) as usize;
    let sizeofcmds = u32::from_le_bytes(buf[region_start + 20..region_start + 24].try_into().unwrap()) as usize;

    let cmds_start = region_start + 32;
    let mut cursor = cmds_start;
    let cmds_end = (cmds_start + sizeofcmds).min(buf.len());
    let mut changed = false;

    for _ in 0..ncmds {
        if cursor + 8 > cmds_end {
            break;
        }
        let cmd = u32::from_le_bytes(buf[cursor..cursor + 4].try_into().unwrap());
        let cmdsize = u32::from_le_bytes(buf[cursor + 4..cursor + 8].try_into().unwrap()) as usize;
        if cmdsize < 8 || cursor + cmdsize > cmds_end {
            break;
        }

        let (name_offset, tool_kind) = match cmd {
            LC_ID_DYLIB => (24usize, Some(ToolOpKind::Id)),
            LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB => (24usize, Some(ToolOpKind::Change)),
            LC_RPATH => (12usize, Some(ToolOpKind::Rpath)),
            _ => (0, None),
        };

        if let Some(kind) = tool_kind {
            let str_start = cursor + name_offset;
            let str_end = cursor + cmdsize;
            if str_start < str_end && str_end <= buf.len() {
                let raw = &buf[str_start..str_end];
                let nul_pos = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                let original = String::from_utf8_lossy(&raw[..nul_pos]).to_string();

                if original.contains(super::PREFIX_TOKEN) || original.contains(super::CELLAR_TOKEN) {
                    let rewritten = rewrite_placeholder(&original, prefix, cellar);
                    let available = str_end - str_start;

                    if rewritten.len() + 1 <= available {
                        let bytes = rewritten.as_bytes();
                        buf[str_start..str_start + bytes.len()].copy_from_slice(bytes);
                        for b in &mut buf[str_start + bytes.len()..str_end] {
                            *b = 0;
                        }
                        changed = true;
                    } else {
                        tool_ops.push(ToolOp {
                            kind,
                            old: original,
                            new: rewritten,
                        });
                    }
                }
            }
        }

        cursor += cmdsize;
    }

    Ok(changed)
}

fn apply_tool_ops(path: &Path, ops: &[ToolOp]) {
    let path_str = path.to_string_lossy();
    for op in ops {
        let result = match op.kind {
            ToolOpKind::Id => Command::new("install_name_tool").args(["-id", &op.new, &path_str]).output(),
            ToolOpKind::Change => Command::new("install_name_tool")
                .args(["-change", &op.old, &op.new, &path_str])
                .output(),
            ToolOpKind::Rpath => Command::new("install_name_tool")
                .args(["-rpath", &op.old, &op.new, &path_str])
                .output(),
        };
        if let Err(e) = result {
            log::warn!("install_name_tool failed for {}: {e}", path.display());
        }
    }
}

/// Binaries whose load commands were rewritten need a fresh ad-hoc
/// signature; batched into one `codesign` invocation per relocation
/// pass. A signing failure is logged, not propagated — the keg may
/// still run unsigned or under Gatekeeper warnings.
pub fn codesign_batch(paths: &[PathBuf]) {
    if !cfg!(target_os = "macos") {
        return;
    }
    let mut cmd = Command::new("codesign");
    cmd.args(["--force", "--sign", "-"]);
    for path in paths {
        cmd.arg(path);
    }
    if let Err(e) = cmd.output() {
        log::warn!("codesign batch failed for {} binaries: {e}", paths.len());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn dylib_command(cmd: u32, cmdsize: u32, name: &str) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&cmd.to_le_bytes());
        out.extend_from_slice(&cmdsize.to_le_bytes());
        out.extend_from_slice(&24u32.to_le_bytes()); // name.offset
        out.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        out.extend_from_slice(&0u32.to_le_bytes()); // current_version
        out.extend_from_slice(&0u32.to_le_bytes()); // compatibility_version
        let mut name_bytes = name.as_bytes().to_vec();
        name_bytes.resize(cmdsize as usize - 24, 0);
        out.extend_from_slice(&name_bytes);
        out
    }

    fn build_macho(name: &str, field_len: usize) -> Vec<u8> {
        let cmdsize = (24 + field_len) as u32;
        let cmd_bytes = dylib_command(LC_ID_DYLIB, cmdsize, name);

        let mut out = Vec::new();
        out.extend_from_slice(&MH_MAGIC_64.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes()); // cputype
        out.extend_from_slice(&0i32.to_le_bytes()); // cpusubtype
        out.extend_from_slice(&0u32.to_le_bytes()); // filetype
        out.extend_from_slice(&1u32.to_le_bytes()); // ncmds
        out.extend_from_slice(&(cmd_bytes.len() as u32).to_le_bytes()); // sizeofcmds
        out.extend_from_slice(&0u32.to_le_bytes()); // flags
        out.extend_from_slice(&0u32.to_le_bytes()); // reserved
        out.extend_from_slice(&cmd_bytes);
        out
    }

    #[test]
    fn in_place_rewrite_when_it_fits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libfoo.dylib");
        let buf = build_macho("@@PREFIX@@/lib/libfoo.dylib\0\0\0\0\0\0\0\0", 96);
        fs::File::create(&path).unwrap().write_all(&buf).unwrap();

        let changed = patch(&path, Path::new("/opt/nanobrew/prefix"), Path::new("/opt/nanobrew/prefix/Cellar")).unwrap();
        assert!(changed);

        let patched = fs::read(&path).unwrap();
        let raw = &patched[32 + 24..32 + 24 + 96];
        let nul = raw.iter().position(|&b| b == 0).unwrap();
        assert_eq!(&raw[..nul], b"/opt/nanobrew/prefix/lib/libfoo.dylib");
    }

    #[test]
    fn untouched_when_no_placeholder_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libbar.dylib");
        let buf = build_macho("/usr/lib/libbar.dylib\0\0\0\0\0\0\0\0\0\0\0\0\0\0", 96);
        fs::File::create(&path).unwrap().write_all(&buf).unwrap();

        let changed = patch(&path, Path::new("/opt/nanobrew/prefix"), Path::new("/opt/nanobrew/prefix/Cellar")).unwrap();
        assert!(!changed);
    }
}
