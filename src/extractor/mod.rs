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

//! Extract the [Alignment] embedded in an alignment archive.
//!
//! Records are located with a pattern matching `>`, a run of word characters
//! (the species identifier), a newline and a run of alignment symbols (the
//! sequence). Only the first sequence line of a record is captured.
//!
//! The newline can be either a real line break or the two character escape
//! `\n`, depending on how the text was produced. One [Extractor] always uses
//! the single [NewlineMode] it was configured with.
//!
//! ## Usage
//!
//! ```rust
//! use msasieve::extractor::{Extractor, ExtractOptions, NewlineMode};
//!
//! let extractor = Extractor::new(ExtractOptions { newline: NewlineMode::Escaped, ..Default::default() }).unwrap();
//! let alignment = extractor.extract_from_text(r">Myotis_lucifugus\nMK-LV\n>Homo_sapiens\nMKALV");
//!
//! assert_eq!(alignment.get("Myotis_lucifugus").unwrap(), "MK-LV");
//! assert_eq!(alignment.get("Homo_sapiens").unwrap(), "MKALV");
//! ```
//!

pub mod archive;

use crate::Alignment;
use crate::GAP;
use crate::extractor::archive::member_path;
use crate::extractor::archive::read_member_from_path;
use crate::extractor::archive::read_plain_text;

use std::path::Path;

use log::debug;
use regex::Regex;

type E = Box<dyn std::error::Error>;

/// Directory of the alignment file inside an archive.
pub const DEFAULT_MEMBER_PREFIX: &str = "omm_filtered_AA_CDS";

const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";
const UNKNOWN_AND_AMBIGUOUS: &str = "XBZJ";

/// Representation of line breaks in the archive text.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewlineMode {
    /// A line feed byte.
    #[default]
    Literal,
    /// A backslash followed by `n`.
    Escaped,
}

impl NewlineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewlineMode::Literal => "\n",
            NewlineMode::Escaped => "\\n",
        }
    }
}

impl std::str::FromStr for NewlineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(NewlineMode::Literal),
            "escaped" => Ok(NewlineMode::Escaped),
            _ => Err(format!("'{}' is not a valid NewlineMode", s)),
        }
    }
}

/// Symbols accepted in a sequence.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alphabet {
    /// Amino acids, `X`, `B`, `Z`, `J` and the gap `-`.
    #[default]
    Gapped,
    /// Same as [Gapped](Alphabet::Gapped) without the gap.
    Ungapped,
}

impl Alphabet {
    pub fn symbols(&self) -> String {
        match self {
            Alphabet::Gapped => format!("{}{}{}", GAP, AMINO_ACIDS, UNKNOWN_AND_AMBIGUOUS),
            Alphabet::Ungapped => format!("{}{}", AMINO_ACIDS, UNKNOWN_AND_AMBIGUOUS),
        }
    }
}

/// How the archive contents are stored on disk.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Zip container with the alignment at `<prefix>/<archive stem>`.
    #[default]
    Zip,
    /// The file already holds the alignment text, optionally gzipped.
    PlainText,
}

/// Compiled record pattern for one [NewlineMode] and [Alphabet].
#[derive(Debug, Clone)]
pub struct RecordPattern {
    regex: Regex,
    newline: NewlineMode,
}

impl RecordPattern {
    pub fn new(
        newline: NewlineMode,
        alphabet: Alphabet,
    ) -> Result<Self, E> {
        let pattern = format!(r">\w+{}[{}]+", regex::escape(newline.as_str()), alphabet.symbols());
        let regex = Regex::new(&pattern)?;
        Ok(RecordPattern { regex, newline })
    }

    /// Collect every record in `text` into an [Alignment].
    ///
    /// A repeated identifier takes the sequence of its last occurrence.
    pub fn parse_records(
        &self,
        text: &str,
    ) -> Alignment {
        let separator = self.newline.as_str();
        let mut alignment = Alignment::new();
        for hit in self.regex.find_iter(text) {
            // Drop the leading '>'
            let record = &hit.as_str()[1..];
            if let Some((species, sequence)) = record.split_once(separator) {
                alignment.insert(species.to_string(), sequence.to_string());
            }
        }
        alignment
    }
}

/// Settings for an [Extractor].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub kind: ArchiveKind,
    pub newline: NewlineMode,
    pub member_prefix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            kind: ArchiveKind::default(),
            newline: NewlineMode::default(),
            member_prefix: DEFAULT_MEMBER_PREFIX.to_string(),
        }
    }
}

/// Reads archives into [Alignment] records.
#[derive(Debug, Clone)]
pub struct Extractor {
    options: ExtractOptions,
    pattern: RecordPattern,
}

impl Extractor {
    pub fn new(
        options: ExtractOptions,
    ) -> Result<Self, E> {
        let pattern = RecordPattern::new(options.newline, Alphabet::Gapped)?;
        Ok(Extractor { options, pattern })
    }

    /// Parse alignment text that has already been decompressed.
    pub fn extract_from_text(
        &self,
        text: &str,
    ) -> Alignment {
        self.pattern.parse_records(text)
    }

    /// Read the archive at `path`.
    ///
    /// ## Errors
    ///
    /// Returns [InvalidArchive](archive::InvalidArchive) if the archive
    /// cannot be opened or decompressed. A zip archive that does not contain
    /// `<prefix>/<archive stem>` yields an empty [Alignment].
    pub fn extract_from_path(
        &self,
        path: &Path,
    ) -> Result<Alignment, E> {
        let text = match self.options.kind {
            ArchiveKind::Zip => {
                let member = member_path(&self.options.member_prefix, path);
                match read_member_from_path(path, &member)? {
                    Some(text) => text,
                    None => {
                        debug!("{} has no member {}", path.display(), member);
                        return Ok(Alignment::new());
                    }
                }
            },
            ArchiveKind::PlainText => read_plain_text(path)?,
        };
        Ok(self.extract_from_text(&text))
    }
}
