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

//! Run the extract, classify, filter and write pipeline over a directory of
//! archives, once per target group.
//!
//! Archives are processed one at a time in directory iteration order. A bad
//! archive is logged and skipped, and a species list that cannot be read
//! skips only its own group. Everything that happened during a run is
//! returned in a [BatchReport].
//!

use crate::Partition;
use crate::classifier::partition;
use crate::classifier::read_name_list;
use crate::classifier::SpeciesNameList;
use crate::extractor::ExtractOptions;
use crate::extractor::Extractor;
use crate::filter::FilterDecision;
use crate::filter::QualityFilter;
use crate::serializer::write_records_to_path;

use std::collections::HashSet;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use log::{debug, error, info, warn};
use walkdir::WalkDir;

type E = Box<dyn std::error::Error>;

/// File listing the retained archives of a group.
pub const DEFAULT_INDEX_NAME: &str = "filtered_file_paths.txt";
/// Target group records of a retained archive.
pub const DEFAULT_MSA_NAME: &str = "msa.fasta";
/// Other records of a retained archive.
pub const DEFAULT_OTHER_NAME: &str = "other.fasta";

/// Settings for [run_batch].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Directory searched recursively for archives.
    pub source_dir: PathBuf,
    /// Directory receiving one subdirectory per species list.
    pub output_root: PathBuf,
    /// Species lists, one target group each.
    pub name_lists: Vec<PathBuf>,
    pub extract: ExtractOptions,
    pub filter: QualityFilter,
    /// Also write the non-target records of retained archives.
    pub write_other: bool,
    pub index_name: String,
    pub msa_name: String,
    pub other_name: String,
}

impl BatchConfig {
    pub fn new(
        source_dir: &Path,
        output_root: &Path,
        name_lists: &[PathBuf],
        filter: QualityFilter,
    ) -> Self {
        BatchConfig {
            source_dir: source_dir.to_path_buf(),
            output_root: output_root.to_path_buf(),
            name_lists: name_lists.to_vec(),
            extract: ExtractOptions::default(),
            filter,
            write_other: false,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            msa_name: DEFAULT_MSA_NAME.to_string(),
            other_name: DEFAULT_OTHER_NAME.to_string(),
        }
    }
}

/// What happened to one archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Passed the filter and was written.
    Retained(FilterDecision),
    /// Did not pass the filter.
    FilteredOut(FilterDecision),
    /// Could not be opened or decompressed.
    Bad,
    /// Passed the filter but its records could not be written.
    WriteFailed,
    /// Passed the filter but an earlier archive already wrote to its output directory.
    NameTaken,
}

/// Results for one target group.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupReport {
    pub group: String,
    pub output_dir: PathBuf,
    /// Archives that were read successfully.
    pub processed: usize,
    pub filtered_out: usize,
    /// Retained archives in processing order.
    pub retained: Vec<PathBuf>,
    pub bad_archives: Vec<PathBuf>,
    pub write_failures: Vec<PathBuf>,
    /// Archives sharing an output directory name with an earlier retained archive.
    pub name_collisions: Vec<PathBuf>,
}

/// Results for all target groups of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub groups: Vec<GroupReport>,
    /// Species lists that could not be processed and why.
    pub failed_groups: Vec<(PathBuf, String)>,
}

/// Find all regular files under `dir`, in directory iteration order.
///
/// Entries below `dir` that cannot be read are logged and skipped.
///
/// ## Errors
///
/// Returns an error if `dir` itself cannot be read.
pub fn collect_archives(
    dir: &Path,
) -> Result<Vec<PathBuf>, E> {
    let mut archives: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Box::new(e)),
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            },
        };
        if entry.file_type().is_file() {
            archives.push(entry.path().to_path_buf());
        }
    }
    Ok(archives)
}

/// Name of the output directory for `archive`: its file name up to the first `.`.
pub fn output_dir_name(
    archive: &Path,
) -> String {
    let name = archive.file_stem().map(|x| x.to_string_lossy().to_string()).unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// Write the retained archive paths, one per line.
pub fn write_index(
    path: &Path,
    archives: &[PathBuf],
) -> Result<(), E> {
    let contents = archives.iter()
                           .map(|archive| archive.to_string_lossy().to_string())
                           .collect::<Vec<String>>()
                           .join("\n");
    let f = File::create(path)?;
    let mut conn = BufWriter::new(f);
    conn.write_all(contents.as_bytes())?;
    conn.flush()?;
    Ok(())
}

fn write_partition(
    archive_dir: &Path,
    records: &Partition,
    config: &BatchConfig,
) -> Result<(), E> {
    let mut outputs = vec![(archive_dir.join(&config.msa_name), &records.group)];
    if config.write_other {
        outputs.push((archive_dir.join(&config.other_name), &records.other));
    }

    let created_dir = !archive_dir.exists();
    let mut written: Vec<PathBuf> = Vec::new();
    for (path, alignment) in outputs {
        if let Err(e) = write_records_to_path(&path, alignment) {
            if created_dir {
                let _ = fs::remove_dir_all(archive_dir);
            } else {
                written.iter().for_each(|done| {
                    let _ = fs::remove_file(done);
                });
            }
            return Err(e);
        }
        written.push(path);
    }
    Ok(())
}

/// Run one archive through the pipeline for one target group.
///
/// Retained archives are written to `<group_dir>/<archive name>/`. `taken`
/// holds the archive names already written for this group; an archive whose
/// name is in it is not written again.
pub fn process_archive(
    extractor: &Extractor,
    species: &SpeciesNameList,
    archive: &Path,
    group_dir: &Path,
    config: &BatchConfig,
    taken: &mut HashSet<String>,
) -> ArchiveOutcome {
    let alignment = match extractor.extract_from_path(archive) {
        Ok(alignment) => alignment,
        Err(e) => {
            warn!("{} is bad! {}", archive.display(), e);
            return ArchiveOutcome::Bad;
        }
    };

    let records = partition(&alignment, species);
    let decision = config.filter.evaluate(&records.group);
    if !decision.retain {
        debug!("{}: filtered out with {} {} species and {} distinct lengths",
               archive.display(), decision.group_size, species.name, decision.diversity);
        return ArchiveOutcome::FilteredOut(decision);
    }

    let name = output_dir_name(archive);
    if taken.contains(&name) {
        warn!("{}: output directory {} is already used by another archive, skipping",
              archive.display(), name);
        return ArchiveOutcome::NameTaken;
    }

    let archive_dir = group_dir.join(&name);
    match write_partition(&archive_dir, &records, config) {
        Ok(()) => {
            taken.insert(name);
            info!("{}: retained with {} {} species and {} distinct lengths",
                  archive.display(), decision.group_size, species.name, decision.diversity);
            ArchiveOutcome::Retained(decision)
        },
        Err(e) => {
            error!("{}: could not write records to {}: {}", archive.display(), archive_dir.display(), e);
            ArchiveOutcome::WriteFailed
        },
    }
}

/// Run all `archives` through the pipeline for the species list at `list_path`.
///
/// ## Errors
///
/// Returns an error if the species list cannot be read, or if the group's
/// output directory or index file cannot be written. Failures of single
/// archives are recorded in the [GroupReport].
pub fn run_group(
    config: &BatchConfig,
    extractor: &Extractor,
    list_path: &Path,
    archives: &[PathBuf],
) -> Result<GroupReport, E> {
    let species = read_name_list(list_path)?;
    let group_dir = config.output_root.join(&species.name);
    fs::create_dir_all(&group_dir)?;
    info!("Processing {} archives for {} ({} species)", archives.len(), species.name, species.len());

    let mut report = GroupReport { group: species.name.clone(), output_dir: group_dir.clone(), ..Default::default() };
    let mut taken: HashSet<String> = HashSet::new();
    for archive in archives {
        match process_archive(extractor, &species, archive, &group_dir, config, &mut taken) {
            ArchiveOutcome::Retained(_) => {
                report.processed += 1;
                report.retained.push(archive.clone());
            },
            ArchiveOutcome::FilteredOut(_) => {
                report.processed += 1;
                report.filtered_out += 1;
            },
            ArchiveOutcome::Bad => {
                report.bad_archives.push(archive.clone());
            },
            ArchiveOutcome::WriteFailed => {
                report.processed += 1;
                report.write_failures.push(archive.clone());
            },
            ArchiveOutcome::NameTaken => {
                report.processed += 1;
                report.name_collisions.push(archive.clone());
            },
        }
    }

    write_index(&group_dir.join(&config.index_name), &report.retained)?;
    info!("{}: retained {} of {} archives", species.name, report.retained.len(), archives.len());

    Ok(report)
}

/// Run the pipeline over `config.source_dir` for every species list.
///
/// ## Errors
///
/// Returns an error only if the archive directory cannot be scanned or the
/// extractor cannot be built. A species list that fails is recorded in
/// [BatchReport::failed_groups] and the remaining lists are still processed.
///
/// ## Usage
///
/// ```rust
/// use msasieve::{run_batch, BatchConfig};
/// use msasieve::extractor::ArchiveKind;
/// use msasieve::filter::{CountPredicate, QualityFilter};
///
/// let dir = tempfile::tempdir().unwrap();
/// let msas = dir.path().join("msas");
/// std::fs::create_dir(&msas).unwrap();
/// std::fs::write(msas.join("GENE1.txt"), ">Myotis_lucifugus\nMK-LV\n>Eptesicus_fuscus\nMKALV\n>Homo_sapiens\nMKALV").unwrap();
///
/// let list = dir.path().join("chiroptera.txt");
/// std::fs::write(&list, "Myotis lucifugus\nEptesicus fuscus").unwrap();
///
/// let filter = QualityFilter { predicate: CountPredicate::AtLeast, count_threshold: 1, diversity_threshold: 2 };
/// let mut config = BatchConfig::new(&msas, &dir.path().join("out"), &[list], filter);
/// config.extract.kind = ArchiveKind::PlainText;
///
/// let report = run_batch(&config).unwrap();
///
/// assert_eq!(report.groups[0].retained, vec![msas.join("GENE1.txt")]);
/// let written = std::fs::read_to_string(dir.path().join("out/chiroptera/GENE1/msa.fasta")).unwrap();
/// assert_eq!(written, ">Myotis_lucifugus\nMKLV\n>Eptesicus_fuscus\nMKALV");
/// ```
///
pub fn run_batch(
    config: &BatchConfig,
) -> Result<BatchReport, E> {
    let archives = collect_archives(&config.source_dir)?;
    let extractor = Extractor::new(config.extract.clone())?;
    info!("Found {} archives in {}", archives.len(), config.source_dir.display());

    let mut report = BatchReport::default();
    for list_path in &config.name_lists {
        match run_group(config, &extractor, list_path, &archives) {
            Ok(group) => report.groups.push(group),
            Err(e) => {
                error!("Skipping species list {}: {}", list_path.display(), e);
                report.failed_groups.push((list_path.clone(), e.to_string()));
            },
        }
    }

    Ok(report)
}

// Tests
#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    const BATS: &str = "Myotis lucifugus\nEptesicus fuscus\nPipistrellus pipistrellus\nRhinolophus ferrumequinum\nMolossus molossus\nPteropus vampyrus\nDesmodus rotundus";

    // Zip archive with `records` stored at omm_filtered_AA_CDS/<stem>.
    fn write_archive(dir: &Path, file_name: &str, records: &[(&str, usize)]) -> PathBuf {
        let path = dir.join(file_name);
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let f = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(f);
        writer.start_file(format!("omm_filtered_AA_CDS/{}", stem), zip::write::SimpleFileOptions::default()).unwrap();
        for (species, len) in records {
            let sequence = "M".repeat(*len) + &"-".repeat(210 - len);
            writer.write_all(format!(">{}\n{}\n", species, sequence).as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    fn config(dir: &Path, lists: &[PathBuf]) -> super::BatchConfig {
        use crate::filter::{CountPredicate, QualityFilter};
        let filter = QualityFilter { predicate: CountPredicate::AtLeast, count_threshold: 5, diversity_threshold: 4 };
        super::BatchConfig::new(&dir.join("msas"), &dir.join("out"), lists, filter)
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let msas = dir.path().join("msas");
        std::fs::create_dir_all(msas.join("nested")).unwrap();

        write_archive(&msas, "RETAIN.fa.zip", &[
            ("Myotis_lucifugus", 120), ("Eptesicus_fuscus", 121), ("Pipistrellus_pipistrellus", 150),
            ("Rhinolophus_ferrumequinum", 150), ("Molossus_molossus", 200), ("Pteropus_vampyrus", 205),
            ("Homo_sapiens", 180),
        ]);
        write_archive(&msas, "SMALL.fa.zip", &[
            ("Myotis_lucifugus", 120), ("Eptesicus_fuscus", 121), ("Pipistrellus_pipistrellus", 150),
            ("Rhinolophus_ferrumequinum", 160), ("Homo_sapiens", 180),
        ]);
        write_archive(&msas.join("nested"), "UNIFORM.fa.zip", &[
            ("Myotis_lucifugus", 180), ("Eptesicus_fuscus", 180), ("Pipistrellus_pipistrellus", 180),
            ("Rhinolophus_ferrumequinum", 180), ("Molossus_molossus", 180), ("Pteropus_vampyrus", 180),
            ("Desmodus_rotundus", 180),
        ]);
        std::fs::write(msas.join("BROKEN.fa.zip"), b"not a zip archive").unwrap();

        let list = dir.path().join("chiroptera.txt");
        std::fs::write(&list, BATS).unwrap();

        (dir, list)
    }

    #[test]
    fn output_dir_name_cuts_at_first_dot() {
        use super::output_dir_name;

        assert_eq!(output_dir_name(Path::new("msas/ENSG00000001.fa.zip")), "ENSG00000001");
        assert_eq!(output_dir_name(Path::new("msas/ENSG00000001")), "ENSG00000001");
    }

    #[test]
    fn collect_archives_is_recursive() {
        use super::collect_archives;

        let (dir, _) = setup();
        let mut got = collect_archives(&dir.path().join("msas")).unwrap();
        got.sort();

        let msas = dir.path().join("msas");
        let mut expected = vec![
            msas.join("BROKEN.fa.zip"),
            msas.join("RETAIN.fa.zip"),
            msas.join("SMALL.fa.zip"),
            msas.join("nested").join("UNIFORM.fa.zip"),
        ];
        expected.sort();

        assert_eq!(got, expected);
    }

    #[test]
    fn run_batch_retains_and_skips() {
        use super::run_batch;

        let (dir, list) = setup();
        let report = run_batch(&config(dir.path(), &[list])).unwrap();

        assert!(report.failed_groups.is_empty());
        assert_eq!(report.groups.len(), 1);

        let group = &report.groups[0];
        let msas = dir.path().join("msas");
        assert_eq!(group.group, "chiroptera");
        assert_eq!(group.processed, 3);
        assert_eq!(group.filtered_out, 2);
        assert_eq!(group.retained, vec![msas.join("RETAIN.fa.zip")]);
        assert_eq!(group.bad_archives, vec![msas.join("BROKEN.fa.zip")]);
        assert!(group.write_failures.is_empty());

        let out = dir.path().join("out").join("chiroptera");
        let index = std::fs::read_to_string(out.join("filtered_file_paths.txt")).unwrap();
        assert_eq!(index, msas.join("RETAIN.fa.zip").to_string_lossy());

        let written = std::fs::read_to_string(out.join("RETAIN").join("msa.fasta")).unwrap();
        assert_eq!(written.lines().filter(|line| line.starts_with('>')).count(), 6);
        assert!(!written.contains('-'));
        assert!(!written.contains("Homo_sapiens"));
        assert!(!out.join("RETAIN").join("other.fasta").exists());
        assert!(!out.join("SMALL").exists());
        assert!(!out.join("UNIFORM").exists());
    }

    #[test]
    fn run_batch_writes_other_side() {
        use super::run_batch;

        let (dir, list) = setup();
        let mut config = config(dir.path(), &[list]);
        config.write_other = true;
        run_batch(&config).unwrap();

        let other = dir.path().join("out").join("chiroptera").join("RETAIN").join("other.fasta");
        let written = std::fs::read_to_string(other).unwrap();
        assert_eq!(written, format!(">Homo_sapiens\n{}", "M".repeat(180)));
    }

    #[test]
    fn unreadable_list_only_fails_its_group() {
        use super::run_batch;

        let (dir, list) = setup();
        let missing = dir.path().join("primates.txt");
        let report = run_batch(&config(dir.path(), &[missing.clone(), list])).unwrap();

        assert_eq!(report.failed_groups.len(), 1);
        assert_eq!(report.failed_groups[0].0, missing);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].retained.len(), 1);
        assert!(!dir.path().join("out").join("primates").exists());
    }

    #[test]
    fn each_group_gets_its_own_tree() {
        use super::run_batch;
        use crate::filter::{CountPredicate, QualityFilter};

        let (dir, bats) = setup();
        let humans = dir.path().join("primates.txt");
        std::fs::write(&humans, "Homo sapiens").unwrap();

        let mut config = config(dir.path(), &[bats, humans]);
        config.filter = QualityFilter { predicate: CountPredicate::AtMost, count_threshold: 2, diversity_threshold: 1 };
        let report = run_batch(&config).unwrap();

        assert_eq!(report.groups.len(), 2);
        // No archive has fewer than two bats.
        assert!(report.groups[0].retained.is_empty());
        assert_eq!(report.groups[1].group, "primates");
        assert_eq!(report.groups[1].retained.len(), 2);

        let out = dir.path().join("out");
        assert_eq!(std::fs::read_to_string(out.join("chiroptera").join("filtered_file_paths.txt")).unwrap(), "");
        assert!(out.join("primates").join("RETAIN").join("msa.fasta").exists());
        assert!(out.join("primates").join("SMALL").join("msa.fasta").exists());
    }

    #[test]
    fn same_name_archives_are_written_once() {
        use super::run_batch;

        let (dir, list) = setup();
        let msas = dir.path().join("msas");
        std::fs::create_dir_all(msas.join("a")).unwrap();
        std::fs::create_dir_all(msas.join("b")).unwrap();
        let six = write_archive(&msas.join("a"), "GENE.fa.zip", &[
            ("Myotis_lucifugus", 120), ("Eptesicus_fuscus", 121), ("Pipistrellus_pipistrellus", 150),
            ("Rhinolophus_ferrumequinum", 150), ("Molossus_molossus", 200), ("Pteropus_vampyrus", 205),
        ]);
        let seven = write_archive(&msas.join("b"), "GENE.fa.zip", &[
            ("Myotis_lucifugus", 110), ("Eptesicus_fuscus", 111), ("Pipistrellus_pipistrellus", 112),
            ("Rhinolophus_ferrumequinum", 113), ("Molossus_molossus", 114), ("Pteropus_vampyrus", 115),
            ("Desmodus_rotundus", 116),
        ]);

        let report = run_batch(&config(dir.path(), &[list])).unwrap();
        let group = &report.groups[0];

        let kept: Vec<&PathBuf> = group.retained.iter().filter(|x| x.ends_with("GENE.fa.zip")).collect();
        assert_eq!(kept.len(), 1);
        assert_eq!(group.name_collisions.len(), 1);
        assert_ne!(kept[0], &group.name_collisions[0]);
        assert!(group.write_failures.is_empty());

        let out = dir.path().join("out").join("chiroptera");
        let index = std::fs::read_to_string(out.join("filtered_file_paths.txt")).unwrap();
        assert_eq!(index.lines().filter(|line| line.ends_with("GENE.fa.zip")).count(), 1);

        let written = std::fs::read_to_string(out.join("GENE").join("msa.fasta")).unwrap();
        let n_records = written.lines().filter(|line| line.starts_with('>')).count();
        let expected = if *kept[0] == six { 6 } else { assert_eq!(*kept[0], seven); 7 };
        assert_eq!(n_records, expected);
    }

    #[test]
    fn failed_write_removes_archive_dir() {
        use super::run_batch;

        let (dir, list) = setup();
        let mut config = config(dir.path(), &[list]);
        config.write_other = true;
        // msa.fasta is written as a file first, so it cannot also be a directory.
        config.other_name = "msa.fasta/other.fasta".to_string();
        let report = run_batch(&config).unwrap();

        let group = &report.groups[0];
        assert!(group.retained.is_empty());
        assert_eq!(group.write_failures, vec![dir.path().join("msas").join("RETAIN.fa.zip")]);

        let out = dir.path().join("out").join("chiroptera");
        assert!(!out.join("RETAIN").exists());
        assert_eq!(std::fs::read_to_string(out.join("filtered_file_paths.txt")).unwrap(), "");
    }

    #[test]
    fn collect_archives_skips_unreadable_subdirectory() {
        use super::collect_archives;

        let (dir, _) = setup();
        let msas = dir.path().join("msas");
        let locked = msas.join("locked");
        std::fs::create_dir(&locked).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        }

        let got = collect_archives(&msas);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let got = got.unwrap();
        assert_eq!(got.len(), 4);
        assert!(got.contains(&msas.join("RETAIN.fa.zip")));
        assert!(got.contains(&msas.join("nested").join("UNIFORM.fa.zip")));
    }

    #[test]
    fn collect_archives_missing_dir_is_an_error() {
        use super::collect_archives;

        let dir = tempfile::tempdir().unwrap();
        assert!(collect_archives(&dir.path().join("msas")).is_err());
    }
}
