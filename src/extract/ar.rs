// SPDX-License-Identifier: MPL-2.0

//! `ar` archive container (`!<arch>\n` magic, 60-byte ASCII member
//! headers), used to unwrap `.deb` packages down to their `data.tar*`
//! member.

use std::io::{BufRead, Read};

use super::Error;

const GLOBAL_MAGIC: &[u8; 8] = b"!<arch>\n";
const HEADER_LEN: usize = 60;

struct Member {
    name: String,
    data: Vec<u8>,
}

fn read_members(mut reader: impl BufRead) -> Result<Vec<Member>, Error> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic).map_err(Error::Io)?;
    if &magic != GLOBAL_MAGIC {
        return Err(Error::MalformedAr("missing global header".into()));
    }

    let mut members = Vec::new();

    loop {
        let mut header = [0u8; HEADER_LEN];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(Error::Io(e)),
        }

        if &header[58..60] != b"`\n" {
            return Err(Error::MalformedAr("bad end-of-header marker".into()));
        }

        let raw_name = std::str::from_utf8(&header[0..16])
            .map_err(|_| Error::MalformedAr("non-utf8 member name".into()))?
            .trim_end();
        let name = raw_name.trim_end_matches('/').to_string();

        let size_str = std::str::from_utf8(&header[48..58])
            .map_err(|_| Error::MalformedAr("non-utf8 size field".into()))?
            .trim();
        let size: usize = size_str
            .parse()
            .map_err(|_| Error::MalformedAr(format!("bad size field {size_str:?}")))?;

        let mut data = vec![0u8; size];
        reader.read_exact(&mut data).map_err(Error::Io)?;

        // Members are padded to an even byte boundary.
        if size % 2 == 1 {
            let mut pad = [0u8; 1];
            let _ = reader.read_exact(&mut pad);
        }

        members.push(Member { name, data });
    }

    Ok(members)
}

/// Unpack the `data.tar*` member of a `.deb` (`ar`) archive into
/// `dest_dir`. The `control.tar*` member carries install-script
/// metadata that is out of scope for content materialization.
pub(super) fn extract_deb(reader: impl BufRead, dest_dir: &std::path::Path) -> Result<(), Error> {
    let members = read_members(reader)?;

    let data_member = members
        .iter()
        .find(|m| m.name.starts_with("data.tar"))
        .ok_or_else(|| Error::MalformedAr("no data.tar* member".into()))?;

    unpack_compressed_tar(&data_member.name, &data_member.data, dest_dir)
}

fn unpack_compressed_tar(name: &str, data: &[u8], dest_dir: &std::path::Path) -> Result<(), Error> {
    let reader: Box<dyn Read + '_> = if name.ends_with(".gz") {
        Box::new(flate2::read::GzDecoder::new(data))
    } else if name.ends_with(".zst") {
        Box::new(zstd::Decoder::new(data).map_err(Error::Io)?)
    } else if name.ends_with(".xz") {
        return Err(Error::MalformedAr("xz-compressed data.tar is not supported".into()));
    } else {
        Box::new(data)
    };

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.unpack(dest_dir).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_ar(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(GLOBAL_MAGIC);
        for (name, data) in members {
            let mut header = [b' '; HEADER_LEN];
            let name_field = format!("{name}/");
            header[0..name_field.len()].copy_from_slice(name_field.as_bytes());
            let size_field = data.len().to_string();
            header[48..48 + size_field.len()].copy_from_slice(size_field.as_bytes());
            header[58] = b'`';
            header[59] = b'\n';
            out.extend_from_slice(&header);
            out.extend_from_slice(data);
            if data.len() % 2 == 1 {
                out.push(b'\n');
            }
        }
        out
    }

    #[test]
    fn finds_data_tar_member() {
        let archive = build_ar(&[("debian-binary", b"2.0\n"), ("data.tar", b"not-really-a-tar-but-lookup-works")]);
        let members = read_members(std::io::Cursor::new(archive)).unwrap();
        assert!(members.iter().any(|m| m.name == "data.tar"));
    }

    #[test]
    fn odd_length_members_are_padded() {
        let archive = build_ar(&[("odd", b"x")]);
        // Should parse cleanly without drifting the cursor.
        let members = read_members(std::io::Cursor::new(archive)).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].data, b"x");
    }
}
