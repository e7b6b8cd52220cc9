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

//! Write an [Alignment] as gap-stripped sequence records.
//!
//! Each record is a header line `>` followed by the species identifier and a
//! single line containing the sequence without gaps. Records are separated by
//! one line break and the file has no trailing line break.
//!
//! ## Usage
//!
//! ```rust
//! use msasieve::Alignment;
//! use msasieve::serializer::format_records;
//!
//! let mut alignment = Alignment::new();
//! alignment.insert("Myotis_lucifugus".to_string(), "MK--LV".to_string());
//! alignment.insert("Homo_sapiens".to_string(), "MKALV-".to_string());
//!
//! let mut output: Vec<u8> = Vec::new();
//! format_records(&alignment, &mut output).unwrap();
//!
//! assert_eq!(output, b">Myotis_lucifugus\nMKLV\n>Homo_sapiens\nMKALV".to_vec());
//! ```
//!

use crate::Alignment;
use crate::filter::strip_gaps;

use std::fs;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use log::debug;
use tempfile::NamedTempFile;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct WriteValidationFailed {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for WriteValidationFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Records written to {} do not match: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for WriteValidationFailed {}

/// Format a single record without a trailing line break.
pub fn format_record<W: Write>(
    species: &str,
    sequence: &str,
    conn: &mut W,
) -> Result<(), E> {
    let mut formatted: String = String::with_capacity(species.len() + sequence.len() + 2);
    formatted += ">";
    formatted += species;
    formatted += "\n";
    formatted += &strip_gaps(sequence);

    conn.write_all(formatted.as_bytes())?;
    Ok(())
}

/// Format all records in `alignment`, in order.
pub fn format_records<W: Write>(
    alignment: &Alignment,
    conn: &mut W,
) -> Result<(), E> {
    for (idx, (species, sequence)) in alignment.iter().enumerate() {
        if idx > 0 {
            conn.write_all(b"\n")?;
        }
        format_record(species, sequence, conn)?;
    }
    conn.flush()?;
    Ok(())
}

/// Check that `path` holds exactly the bytes in `expected`.
pub fn validate_records(
    path: &Path,
    expected: &[u8],
) -> Result<(), E> {
    let mismatch = |reason: String| WriteValidationFailed { path: path.to_path_buf(), reason };

    let written = fs::read(path)?;
    if written.len() != expected.len() {
        return Err(Box::new(mismatch(format!("expected {} bytes, found {}", expected.len(), written.len()))));
    }
    if let Some(pos) = written.iter().zip(expected).position(|(x, y)| x != y) {
        return Err(Box::new(mismatch(format!("contents differ at byte {}", pos))));
    }

    Ok(())
}

/// Write `alignment` to `path`, replacing any existing file.
///
/// Parent directories are created as needed. The records are first written to
/// a temporary file next to `path` and read back with [validate_records]; the
/// temporary file only replaces `path` if the contents match.
///
/// ## Errors
///
/// On any error `path` is left as it was.
pub fn write_records_to_path(
    path: &Path,
    alignment: &Alignment,
) -> Result<(), E> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut formatted: Vec<u8> = Vec::new();
    format_records(alignment, &mut formatted)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut conn = BufWriter::new(tmp.as_file_mut());
        conn.write_all(&formatted)?;
        conn.flush()?;
    }
    validate_records(tmp.path(), &formatted)?;
    tmp.persist(path)?;

    debug!("Wrote {} records to {}", alignment.len(), path.display());
    Ok(())
}
