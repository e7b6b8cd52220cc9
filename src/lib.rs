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

//! msasieve is a library and a command-line client for curating per-gene
//! multiple sequence alignments (MSAs) for comparative genomics.
//!
//! Given a directory of compressed per-gene alignment archives and one or more
//! lists of target species (eg. the species of one taxonomic order), msasieve:
//!
//!   - Extracts the alignment embedded in each archive.
//!   - Splits the alignment into the target group and all other species.
//!   - Retains the archive if the target group is large enough (or small
//!     enough) and its sequences are diverse enough.
//!   - Writes the retained alignments without gaps into one directory per
//!     archive, under one output directory per target group.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The msasieve CLI supports the following subcommands:
//!   - `msasieve filter` run the full pipeline over a directory of archives.
//!   - `msasieve extract` print the records of a single archive.
//!
//! ### Rust API
//!
//! The pipeline stages are available separately:
//!
//!   - [Extractor](extractor::Extractor): reads an archive into an [Alignment].
//!   - [partition](classifier::partition): splits an [Alignment] by a
//!     [SpeciesNameList](classifier::SpeciesNameList).
//!   - [QualityFilter](filter::QualityFilter): decides whether to retain the
//!     target group side of a [Partition].
//!   - [write_records_to_path](serializer::write_records_to_path): writes an
//!     [Alignment] as gap-stripped records.
//!
//! [run_batch] chains them together over a directory of archives.
//!
//! ```rust
//! use msasieve::Alignment;
//! use msasieve::classifier::{partition, SpeciesNameList};
//! use msasieve::filter::{CountPredicate, QualityFilter};
//!
//! let bats = SpeciesNameList::from_lines("chiroptera", ["Myotis lucifugus", "Eptesicus fuscus"]);
//!
//! let mut alignment = Alignment::new();
//! alignment.insert("Myotis_lucifugus".to_string(), "MK-LV".to_string());
//! alignment.insert("Eptesicus_fuscus".to_string(), "MKALV".to_string());
//! alignment.insert("Homo_sapiens".to_string(), "MKALV".to_string());
//!
//! let split = partition(&alignment, &bats);
//! assert_eq!(split.group.len(), 2);
//! assert_eq!(split.other.len(), 1);
//!
//! let filter = QualityFilter { predicate: CountPredicate::AtLeast, count_threshold: 1, diversity_threshold: 2 };
//! let decision = filter.evaluate(&split.group);
//! assert!(decision.retain);
//! assert_eq!(decision.diversity, 2);
//! ```
//!
//! ## Output layout
//!
//! For each species list `<list>.txt` the output root receives:
//!
//! ```text
//! <list>/
//!   filtered_file_paths.txt   retained archive paths, one per line
//!   <archive>/msa.fasta       target group records
//!   <archive>/other.fasta     other records (only with `--write-other`)
//! ```
//!

use indexmap::IndexMap;

pub mod classifier;
pub mod extractor;
pub mod filter;
pub mod orchestrator;
pub mod serializer;

pub use orchestrator::run_batch;
pub use orchestrator::BatchConfig;
pub use orchestrator::BatchReport;

/// Alignment column placeholder.
pub const GAP: char = '-';

/// Species identifier to aligned sequence, in the order the records were read.
///
/// Identifiers are unique. Inserting an identifier again replaces its sequence
/// but keeps the position of the first occurrence.
pub type Alignment = IndexMap<String, String>;

/// An [Alignment] split into target group and other species.
///
/// Every identifier of the source alignment is on exactly one side.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Partition {
    /// Species found in the target group list.
    pub group: Alignment,
    /// Everything else.
    pub other: Alignment,
}
