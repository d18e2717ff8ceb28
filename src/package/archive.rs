//! Reading the control file out of a `.deb`
//!
//! A binary package is an `ar` archive holding `debian-binary`,
//! `control.tar[.gz|.xz|.zst]` and `data.tar.*`. Only the control member
//! is decoded.

use crate::error::{LoadError, LoadResult};
use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Compression applied to the control tarball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Match an ar member name against the known control tarball names
    fn for_member(name: &str) -> Option<Self> {
        match name {
            "control.tar" => Some(Self::None),
            "control.tar.gz" => Some(Self::Gzip),
            "control.tar.xz" => Some(Self::Xz),
            "control.tar.zst" => Some(Self::Zstd),
            _ => None,
        }
    }

    fn decoder<'a>(&self, data: &'a [u8]) -> LoadResult<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::None => Box::new(data),
            Self::Gzip => Box::new(flate2::read::GzDecoder::new(data)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new(data)),
            Self::Zstd => Box::new(
                zstd::stream::read::Decoder::new(data)
                    .map_err(|e| LoadError::Archive(format!("zstd: {}", e)))?,
            ),
        })
    }
}

/// Lowercase hex MD5 of the full package
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Extract the raw `control` file from `.deb` bytes
pub fn read_control(deb: &[u8]) -> LoadResult<Vec<u8>> {
    let mut archive = ar::Archive::new(deb);

    while let Some(entry) = archive.next_entry() {
        let mut entry = entry.map_err(|e| LoadError::Archive(e.to_string()))?;
        let name = String::from_utf8_lossy(entry.header().identifier()).into_owned();
        // GNU ar terminates member names with '/'
        let name = name.trim_end_matches('/');

        let Some(compression) = Compression::for_member(name) else {
            continue;
        };
        debug!("Found control member {} ({:?})", name, compression);

        let mut tarball = Vec::new();
        entry
            .read_to_end(&mut tarball)
            .map_err(|e| LoadError::Archive(format!("reading {}: {}", name, e)))?;

        return control_from_tar(compression.decoder(&tarball)?);
    }

    Err(LoadError::Archive("no control.tar member".to_string()))
}

fn control_from_tar(reader: impl Read) -> LoadResult<Vec<u8>> {
    let mut tar = tar::Archive::new(reader);
    let entries = tar
        .entries()
        .map_err(|e| LoadError::Archive(format!("control tarball: {}", e)))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| LoadError::Archive(format!("control tarball: {}", e)))?;
        let is_control = entry
            .path()
            .map(|p| is_control_path(&p))
            .unwrap_or(false);
        if !is_control {
            continue;
        }

        let mut control = Vec::new();
        entry
            .read_to_end(&mut control)
            .map_err(|e| LoadError::Archive(format!("reading control: {}", e)))?;
        return Ok(control);
    }

    Err(LoadError::Archive("no control file in control tarball".to_string()))
}

fn is_control_path(path: &Path) -> bool {
    let path = path.strip_prefix(".").unwrap_or(path);
    path == Path::new("control")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::Write;

    fn tar_with(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    fn ar_with(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = ar::Builder::new(Vec::new());
        for (name, data) in members {
            let header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    /// Build a minimal `.deb` with a gzip control tarball holding `control`
    pub(crate) fn build_deb(control: &str) -> Vec<u8> {
        let tarball = tar_with(&[("./control", control.as_bytes())]);
        let mut gz = GzEncoder::new(Vec::new(), GzLevel::default());
        gz.write_all(&tarball).unwrap();
        let gz = gz.finish().unwrap();

        ar_with(&[
            ("debian-binary", b"2.0\n"),
            ("control.tar.gz", &gz),
            ("data.tar.gz", b""),
        ])
    }

    #[test]
    fn reads_gzip_control() {
        let deb = build_deb("Package: hello\nVersion: 1\nArchitecture: all\n");
        let control = read_control(&deb).unwrap();
        assert_eq!(control, b"Package: hello\nVersion: 1\nArchitecture: all\n");
    }

    #[test]
    fn reads_uncompressed_control() {
        let tarball = tar_with(&[("md5sums", b""), ("control", b"Package: x\n")]);
        let deb = ar_with(&[("debian-binary", b"2.0\n"), ("control.tar", &tarball)]);
        assert_eq!(read_control(&deb).unwrap(), b"Package: x\n");
    }

    #[test]
    fn reads_zstd_control() {
        let tarball = tar_with(&[("./control", b"Package: z\n")]);
        let zst = zstd::stream::encode_all(tarball.as_slice(), 3).unwrap();
        let deb = ar_with(&[("debian-binary", b"2.0\n"), ("control.tar.zst", &zst)]);
        assert_eq!(read_control(&deb).unwrap(), b"Package: z\n");
    }

    #[test]
    fn missing_control_member() {
        let deb = ar_with(&[("debian-binary", b"2.0\n"), ("data.tar.gz", b"")]);
        assert_eq!(
            read_control(&deb),
            Err(LoadError::Archive("no control.tar member".to_string()))
        );
    }

    #[test]
    fn missing_control_file() {
        let tarball = tar_with(&[("./postinst", b"#!/bin/sh\n")]);
        let deb = ar_with(&[("control.tar", &tarball)]);
        assert!(matches!(read_control(&deb), Err(LoadError::Archive(_))));
    }

    #[test]
    fn not_an_archive() {
        assert!(matches!(
            read_control(b"<html>404</html>"),
            Err(LoadError::Archive(_))
        ));
    }

    #[test]
    fn md5_of_empty_input() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
