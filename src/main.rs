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
use std::fs;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use msasieve::Alignment;
use msasieve::BatchConfig;
use msasieve::classifier::partition;
use msasieve::classifier::read_name_list;
use msasieve::extractor::ArchiveKind;
use msasieve::extractor::ExtractOptions;
use msasieve::extractor::Extractor;
use msasieve::filter::QualityFilter;
use msasieve::serializer::format_records;

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

/// List the species list files in `dir`, sorted by name.
fn read_lists_dir(
    dir: &Path,
) -> Result<Vec<PathBuf>, E> {
    let mut lists: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            lists.push(path);
        }
    }
    lists.sort();
    Ok(lists)
}

fn extract_options(
    plain_text: bool,
    newline: msasieve::extractor::NewlineMode,
    member_prefix: &str,
) -> ExtractOptions {
    let kind = if plain_text { ArchiveKind::PlainText } else { ArchiveKind::Zip };
    ExtractOptions { kind, newline, member_prefix: member_prefix.to_string() }
}

/// Print `records` to `conn`, ending with a line break unless empty.
fn print_records<W: Write>(
    records: &Alignment,
    conn: &mut W,
) -> Result<(), E> {
    format_records(records, conn)?;
    if !records.is_empty() {
        conn.write_all(b"\n")?;
    }
    conn.flush()?;
    Ok(())
}

fn exit_with(
    e: E,
) -> ! {
    error!("{}", e);
    std::process::exit(1);
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    match &cli.command {
        // Filter
        Some(cli::Commands::Filter {
            source_dir,
            output_root,
            lists,
            lists_dir,
            count_predicate,
            count_threshold,
            diversity_threshold,
            write_other,
            newline,
            plain_text,
            member_prefix,
            index_name,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });

            let mut name_lists = lists.clone();
            if let Some(dir) = lists_dir {
                name_lists.extend(read_lists_dir(dir).unwrap_or_else(|e| exit_with(e)));
            }

            let filter = QualityFilter {
                predicate: *count_predicate,
                count_threshold: *count_threshold,
                diversity_threshold: *diversity_threshold,
            };
            let mut config = BatchConfig::new(source_dir, output_root, &name_lists, filter);
            config.extract = extract_options(*plain_text, *newline, member_prefix);
            config.write_other = *write_other;
            config.index_name = index_name.clone();

            let report = msasieve::run_batch(&config).unwrap_or_else(|e| exit_with(e));

            report.groups.iter().for_each(|group| {
                println!("{}\t{}", group.group, group.retained.len());
                info!("{}: {} processed, {} filtered out, {} bad, {} failed to write, {} name collisions",
                      group.group, group.processed, group.filtered_out, group.bad_archives.len(),
                      group.write_failures.len(), group.name_collisions.len());
            });
            if !report.failed_groups.is_empty() {
                report.failed_groups.iter().for_each(|(list, reason)| {
                    error!("{} failed: {}", list.display(), reason);
                });
                std::process::exit(1);
            }
        },

        // Extract
        Some(cli::Commands::Extract {
            archive,
            list,
            other,
            newline,
            plain_text,
            member_prefix,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });

            let options = extract_options(*plain_text, *newline, member_prefix);
            let extractor = Extractor::new(options).unwrap_or_else(|e| exit_with(e));
            let alignment = extractor.extract_from_path(archive).unwrap_or_else(|e| exit_with(e));

            let records = if let Some(file) = list {
                let species = read_name_list(file).unwrap_or_else(|e| exit_with(e));
                let split = partition(&alignment, &species);
                if *other { split.other } else { split.group }
            } else {
                alignment
            };

            let stdout = std::io::stdout();
            let mut conn_out = BufWriter::new(stdout.lock());
            print_records(&records, &mut conn_out).unwrap_or_else(|e| exit_with(e));
        },
        None => {
            eprintln!("No subcommand given, see `msasieve --help`.");
            std::process::exit(2);
        },
    }
}
