// msasieve: Curate per-gene multiple sequence alignments by target species group.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use std::path::PathBuf;

use flate2::read::MultiGzDecoder;
use zip::ZipArchive;
use zip::result::ZipError;
use zip::result::ZipResult;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct InvalidArchive {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for InvalidArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Invalid archive {}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for InvalidArchive {}

/// Path of the alignment file inside `archive`: `<prefix>/<archive file stem>`.
pub fn member_path(
    prefix: &str,
    archive: &Path,
) -> String {
    let stem = archive.file_stem().map(|x| x.to_string_lossy().to_string()).unwrap_or_default();
    format!("{}/{}", prefix, stem)
}

/// Open `path` for reading, inflating it if the name ends in `.gz`.
pub fn open_plain_or_gz(
    path: &Path,
) -> std::io::Result<Box<dyn Read>> {
    let f = File::open(path)?;
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");
    if is_gz {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Read the bytes of `member` from a zip container.
///
/// Returns None if the container has no such member.
pub fn read_member<R: Read + Seek>(
    conn: R,
    member: &str,
) -> ZipResult<Option<Vec<u8>>> {
    let mut archive = ZipArchive::new(conn)?;
    let mut file = match archive.by_name(member) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut bytes: Vec<u8> = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

/// Read `member` from the zip archive at `path` as text.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_member_from_path(
    path: &Path,
    member: &str,
) -> Result<Option<String>, E> {
    let invalid = |reason: String| InvalidArchive { path: path.to_path_buf(), reason };

    let f = File::open(path).map_err(|e| invalid(e.to_string()))?;
    let bytes = read_member(BufReader::new(f), member).map_err(|e| invalid(e.to_string()))?;

    Ok(bytes.map(|x| String::from_utf8_lossy(&x).into_owned()))
}

/// Read an already decompressed (or gzipped) alignment file as text.
pub fn read_plain_text(
    path: &Path,
) -> Result<String, E> {
    let invalid = |reason: String| InvalidArchive { path: path.to_path_buf(), reason };

    let mut conn = open_plain_or_gz(path).map_err(|e| invalid(e.to_string()))?;
    let mut bytes: Vec<u8> = Vec::new();
    conn.read_to_end(&mut bytes).map_err(|e| invalid(e.to_string()))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
