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

//! Split an [Alignment] into a target species group and everything else.

use crate::Alignment;
use crate::Partition;
use crate::extractor::archive::open_plain_or_gz;

use std::collections::HashSet;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

type E = Box<dyn std::error::Error>;

#[derive(Debug, Clone)]
pub struct MalformedNameList {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for MalformedNameList {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Could not read species list {}: {}", self.path.display(), self.reason)
    }
}

impl std::error::Error for MalformedNameList {}

/// Normalize a species name for matching against alignment identifiers.
///
/// Spaces become underscores, so `Myotis lucifugus` matches the identifier
/// `Myotis_lucifugus`.
pub fn normalize_name(
    name: &str,
) -> String {
    name.trim_end_matches('\r').replace(' ', "_")
}

/// Set of species names that make up one target group.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SpeciesNameList {
    /// Name of the group, used to name its output directory.
    pub name: String,
    names: HashSet<String>,
}

impl SpeciesNameList {
    /// Build a list from names as they appear in a source list.
    ///
    /// Empty lines are ignored.
    pub fn from_lines<I, S>(
        name: &str,
        lines: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = lines.into_iter()
                         .map(|line| normalize_name(line.as_ref()))
                         .filter(|line| !line.is_empty())
                         .collect::<HashSet<String>>();
        SpeciesNameList { name: name.to_string(), names }
    }

    pub fn contains(
        &self,
        species: &str,
    ) -> bool {
        self.names.contains(&normalize_name(species))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Group name for a list file: the file name without its extensions.
///
/// `lists/chiroptera.txt.gz` becomes `chiroptera`.
pub fn group_name(
    path: &Path,
) -> String {
    let mut file_name: PathBuf = PathBuf::from(path.file_name().unwrap_or_default());
    while let Some(stripped) = file_name.file_stem() {
        let is_same = file_name == stripped;
        file_name = PathBuf::from(stripped);
        if is_same {
            break;
        }
    };
    file_name.to_string_lossy().to_string()
}

/// Read a species list with one name per line.
///
/// ## Errors
///
/// Returns [MalformedNameList] if the file cannot be opened or read.
pub fn read_name_list(
    path: &Path,
) -> Result<SpeciesNameList, E> {
    let malformed = |reason: String| MalformedNameList { path: path.to_path_buf(), reason };

    let conn = open_plain_or_gz(path).map_err(|e| malformed(e.to_string()))?;
    let lines = BufReader::new(conn).lines()
                                    .collect::<Result<Vec<String>, _>>()
                                    .map_err(|e| malformed(e.to_string()))?;

    Ok(SpeciesNameList::from_lines(&group_name(path), lines))
}

/// Split `alignment` by membership in `species`.
///
/// Both sides keep the record order of `alignment`.
pub fn partition(
    alignment: &Alignment,
    species: &SpeciesNameList,
) -> Partition {
    let mut res = Partition::default();
    alignment.iter().for_each(|(id, sequence)| {
        if species.contains(id) {
            res.group.insert(id.clone(), sequence.clone());
        } else {
            res.other.insert(id.clone(), sequence.clone());
        }
    });
    res
}
