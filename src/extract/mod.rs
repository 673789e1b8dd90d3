// SPDX-License-Identifier: MPL-2.0

//! Archive stream decoders: gzip/zstd-wrapped tar, plain tar, and the
//! `ar` container used by `.deb` archives.

mod ar;

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
const AR_MAGIC: &[u8; 8] = b"!<arch>\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    GzipTar,
    ZstdTar,
    PlainTar,
    Ar,
}

fn sniff(bytes: &[u8]) -> Format {
    if bytes.len() >= AR_MAGIC.len() && &bytes[..AR_MAGIC.len()] == AR_MAGIC {
        Format::Ar
    } else if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        Format::GzipTar
    } else if bytes.len() >= 4 && bytes[..4] == ZSTD_MAGIC {
        Format::ZstdTar
    } else {
        Format::PlainTar
    }
}

/// Extract `blob_path` into `dest_dir`, which must not already exist
/// (callers extract into a sibling temp directory and rename on
/// success; see [`crate::store`]).
pub fn extract(blob_path: &Path, dest_dir: &Path) -> Result<(), Error> {
    let mut header = [0u8; 8];
    let mut file = File::open(blob_path).map_err(Error::Io)?;
    let n = file.read(&mut header).map_err(Error::Io)?;
    let format = sniff(&header[..n]);

    std::fs::create_dir_all(dest_dir).map_err(Error::Io)?;

    let file = File::open(blob_path).map_err(Error::Io)?;
    match format {
        Format::Ar => ar::extract_deb(BufReader::new(file), dest_dir),
        Format::GzipTar => {
            let decoder = flate2::read::GzDecoder::new(file);
            unpack_tar(decoder, dest_dir)
        }
        Format::ZstdTar => {
            let decoder = zstd::Decoder::new(file).map_err(Error::Io)?;
            unpack_tar(decoder, dest_dir)
        }
        Format::PlainTar => unpack_tar(file, dest_dir),
    }
}

fn unpack_tar(reader: impl Read, dest_dir: &Path) -> Result<(), Error> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_unpack_xattrs(false);
    archive.unpack(dest_dir).map_err(Error::Io)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[source] io::Error),
    #[error("malformed ar container: {0}")]
    MalformedAr(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sniffs_gzip() {
        assert_eq!(sniff(&[0x1f, 0x8b, 0, 0]), Format::GzipTar);
    }

    #[test]
    fn sniffs_zstd() {
        assert_eq!(sniff(&[0x28, 0xb5, 0x2f, 0xfd]), Format::ZstdTar);
    }

    #[test]
    fn sniffs_ar() {
        assert_eq!(sniff(b"!<arch>\n"), Format::Ar);
    }

    #[test]
    fn falls_back_to_plain_tar() {
        assert_eq!(sniff(&[0, 0, 0, 0]), Format::PlainTar);
    }

    #[test]
    fn extract_plain_tar_round_trip() {
        let src_dir = tempfile::tempdir().unwrap();
        std::fs::write(src_dir.path().join("hello.txt"), b"hi").unwrap();

        let tar_path = tempfile::tempdir().unwrap().path().join("archive.tar");
        {
            let file = File::create(&tar_path).unwrap();
            let mut builder = tar::Builder::new(file);
            builder.append_dir_all(".", src_dir.path()).unwrap();
            builder.finish().unwrap();
        }

        let dest = tempfile::tempdir().unwrap();
        let dest_dir = dest.path().join("out");
        extract(&tar_path, &dest_dir).unwrap();

        assert_eq!(std::fs::read(dest_dir.join("hello.txt")).unwrap(), b"hi");
    }
}
