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
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use msasieve::extractor::NewlineMode;
use msasieve::extractor::DEFAULT_MEMBER_PREFIX;
use msasieve::filter::CountPredicate;
use msasieve::orchestrator::DEFAULT_INDEX_NAME;

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Filter a directory of alignment archives by target species group
    Filter {
        // Directory containing the alignment archives, searched recursively
        #[arg(group = "input", required = true, help = "Archive directory")]
        source_dir: PathBuf,

        // Output root, receives one directory per species list
        #[arg(short = 'o', long = "output", default_value = ".")]
        output_root: PathBuf,

        // Species list file(s), one name per line
        #[arg(short = 'l', long = "list", required_unless_present = "lists_dir")]
        lists: Vec<PathBuf>,

        // Directory of species list files
        #[arg(long = "lists-dir", required = false)]
        lists_dir: Option<PathBuf>,

        // Keep archives with more (at-least) or fewer (at-most) target species than --count-threshold
        #[arg(long = "count-predicate", required = true, help = "at-least or at-most")]
        count_predicate: CountPredicate,

        // Exclusive bound on the number of target species
        #[arg(long = "count-threshold", required = true)]
        count_threshold: usize,

        // Minimum number of distinct ungapped target sequence lengths
        #[arg(long = "diversity-threshold", required = true)]
        diversity_threshold: usize,

        // Also write the non-target records of retained archives
        #[arg(long = "write-other", default_value_t = false)]
        write_other: bool,

        // Line breaks in the alignment text: literal or escaped
        #[arg(long = "newline", default_value = "literal")]
        newline: NewlineMode,

        // Archives are already decompressed text files
        #[arg(long = "plain-text", default_value_t = false)]
        plain_text: bool,

        // Directory of the alignment file inside each archive
        #[arg(long = "member-prefix", default_value = DEFAULT_MEMBER_PREFIX)]
        member_prefix: String,

        // Name of the retained archive index in each group directory
        #[arg(long = "index-name", default_value = DEFAULT_INDEX_NAME)]
        index_name: String,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Print the records of a single archive without gaps
    Extract {
        // Input archive
        #[arg(group = "input", required = true, help = "Input archive")]
        archive: PathBuf,

        // Only print species in this list
        #[arg(short = 'l', long = "list", required = false)]
        list: Option<PathBuf>,

        // Print the species not in --list instead
        #[arg(long = "other", default_value_t = false, requires = "list")]
        other: bool,

        // Line breaks in the alignment text: literal or escaped
        #[arg(long = "newline", default_value = "literal")]
        newline: NewlineMode,

        // Archive is already decompressed text
        #[arg(long = "plain-text", default_value_t = false)]
        plain_text: bool,

        // Directory of the alignment file inside the archive
        #[arg(long = "member-prefix", default_value = DEFAULT_MEMBER_PREFIX)]
        member_prefix: String,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
