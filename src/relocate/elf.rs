// SPDX-License-Identifier: MPL-2.0

//! ELF64 `.dynamic` section string rewriting: `DT_NEEDED`, `DT_SONAME`,
//! `DT_RPATH`, and `DT_RUNPATH` entries point into `.dynstr`; rewritten
//! in place when the replacement fits in the original string's span.

use std::fs;
use std::path::Path;

use super::{rewrite_placeholder, Error};

const SHT_DYNAMIC: u32 = 6;
const DT_NEEDED: i64 = 1;
const DT_SONAME: i64 = 14;
const DT_RPATH: i64 = 15;
const DT_RUNPATH: i64 = 29;
const DT_NULL: i64 = 0;

pub fn patch(path: &Path, prefix: &Path, cellar: &Path) -> Result<(), Error> {
    let prefix_str = prefix.to_string_lossy().to_string();
    let cellar_str = cellar.to_string_lossy().to_string();

    let mut buf = fs::read(path)?;
    if buf.len() < 64 || &buf[0..4] != b"\x7fELF" || buf[4] != 2 || buf[5] != 1 {
        // Only native 64-bit little-endian ELF is handled in place.
        return Ok(());
    }

    let Some((dyn_off, dyn_size, dynstr_off, dynstr_size)) = locate_dynamic(&buf) else {
        return Ok(());
    };

    let mut changed = false;
    let mut cursor = dyn_off;
    while cursor + 16 <= dyn_off + dyn_size && cursor + 16 <= buf.len() {
        let tag = i64::from_le_bytes(buf[cursor..cursor + 8].try_into().unwrap());
        if tag == DT_NULL {
            break;
        }
        if matches!(tag, DT_NEEDED | DT_SONAME | DT_RPATH | DT_RUNPATH) {
            let val = u64::from_le_bytes(buf[cursor + 8..cursor + 16].try_into().unwrap()) as usize;
            let str_start = dynstr_off + val;
            if str_start < dynstr_off + dynstr_size && str_start < buf.len() {
                let region_end = (dynstr_off + dynstr_size).min(buf.len());
                let raw = &buf[str_start..region_end];
                let nul = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                let original = String::from_utf8_lossy(&raw[..nul]).to_string();

                // Space for the rewritten string extends through any zero
                // padding up to the next string (or end of the section);
                // only the final byte of that run must stay a terminator.
                let mut zero_run = 0usize;
                while nul + zero_run < raw.len() && raw[nul + zero_run] == 0 {
                    zero_run += 1;
                }
                let available = nul + zero_run.saturating_sub(1);

                if original.contains(super::PREFIX_TOKEN) || original.contains(super::CELLAR_TOKEN) {
                    let rewritten = rewrite_placeholder(&original, &prefix_str, &cellar_str);
                    if rewritten.len() <= available {
                        let bytes = rewritten.as_bytes();
                        buf[str_start..str_start + bytes.len()].copy_from_slice(bytes);
                        for b in &mut buf[str_start + bytes.len()..str_start + nul + zero_run] {
                            *b = 0;
                        }
                        changed = true;
                    } else {
                        log::warn!(
                            "relocate: {} string {:?} too long to rewrite in place, leaving as-is",
                            path.display(),
                            original
                        );
                    }
                }
            }
        }
        cursor += 16;
    }

    if changed {
        let tmp = path.with_extension("nanobrew-relocate-tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, path)?;
    }

    Ok(())
}

/// Returns `(dynamic_offset, dynamic_size, dynstr_offset, dynstr_size)`.
fn locate_dynamic(buf: &[u8]) -> Option<(usize, usize, usize, usize)> {
    let e_shoff = u64::from_le_bytes(buf[40..48].try_into().ok()?) as usize;
    let e_shentsize = u16::from_le_bytes(buf[58..60].try_into().ok()?) as usize;
    let e_shnum = u16::from_le_bytes(buf[60..62].try_into().ok()?) as usize;

    for i in 0..e_shnum {
        let entry = e_shoff + i * e_shentsize;
        if entry + 64 > buf.len() {
            break;
        }
        let sh_type = u32::from_le_bytes(buf[entry + 4..entry + 8].try_into().ok()?);
        if sh_type != SHT_DYNAMIC {
            continue;
        }
        let sh_offset = u64::from_le_bytes(buf[entry + 24..entry + 32].try_into().ok()?) as usize;
        let sh_size = u64::from_le_bytes(buf[entry + 32..entry + 40].try_into().ok()?) as usize;
        let sh_link = u32::from_le_bytes(buf[entry + 40..entry + 44].try_into().ok()?) as usize;

        let str_entry = e_shoff + sh_link * e_shentsize;
        if str_entry + 64 > buf.len() {
            return None;
        }
        let dynstr_offset = u64::from_le_bytes(buf[str_entry + 24..str_entry + 32].try_into().ok()?) as usize;
        let dynstr_size = u64::from_le_bytes(buf[str_entry + 32..str_entry + 40].try_into().ok()?) as usize;

        return Some((sh_offset, sh_size, dynstr_offset, dynstr_size));
    }

    None
}
