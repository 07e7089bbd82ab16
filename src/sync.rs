use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::Utf8PathBuf;
use chrono::Local;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::SyncError;
use crate::layout::{MirrorLayout, ensure_dir};
use crate::remote::{ListingOutcome, RemoteSource};
use crate::unpack::process_organism;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncOutcome {
    pub updated: usize,
    pub fetched: usize,
    pub already_present: usize,
    pub unpacked: usize,
    pub renamed: usize,
    pub rename_conflicts: usize,
    pub decompression_failures: usize,
    pub skipped: Vec<SkippedOrganism>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedOrganism {
    pub organism: String,
    pub reason: String,
}

/// Synchronize each organism in turn: list its latest assembly versions,
/// build the filter list, run the filtered transfer, then decompress and
/// rename what arrived. A transient listing failure is retried exactly
/// once; an organism without a latest-versions directory is skipped.
/// Failures local to one organism never abort the batch.
pub fn sync_organisms(
    layout: &MirrorLayout,
    catalog: &Catalog,
    remote: &dyn RemoteSource,
    organisms: &[String],
) -> Result<SyncOutcome, SyncError> {
    let mut outcome = SyncOutcome::default();
    let total = organisms.len();

    for (index, organism) in organisms.iter().enumerate() {
        let listing = match remote.list_latest(organism) {
            ListingOutcome::Listed(listing) => listing,
            ListingOutcome::Retryable(reason) => {
                warn!("transient failure listing {organism}: {reason}; retrying once");
                match remote.list_latest(organism) {
                    ListingOutcome::Listed(listing) => listing,
                    ListingOutcome::Retryable(reason) | ListingOutcome::Permanent(reason) => {
                        warn!("{organism} skipped: {reason}");
                        outcome.skipped.push(SkippedOrganism {
                            organism: organism.clone(),
                            reason,
                        });
                        continue;
                    }
                }
            }
            ListingOutcome::Permanent(reason) => {
                warn!("{organism} doesn't have a latest_assembly_versions/ directory and will be skipped");
                outcome.skipped.push(SkippedOrganism {
                    organism: organism.clone(),
                    reason,
                });
                continue;
            }
        };

        let accepted = write_filter_list(layout, organism, &listing)?;
        let organism_dir = layout.organism_dir(organism);
        ensure_dir(&organism_dir)?;

        let transfer = match remote.transfer(
            organism,
            &accepted,
            &organism_dir,
            &layout.transfer_log(organism),
        ) {
            Ok(report) => report,
            Err(err) if err.is_local() => {
                warn!("{organism} skipped: {err}");
                outcome.skipped.push(SkippedOrganism {
                    organism: organism.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
            Err(err) => return Err(err),
        };
        outcome.fetched += transfer.fetched;
        outcome.already_present += transfer.present;

        let report = process_organism(layout, catalog, organism)?;
        outcome.unpacked += report.unpacked;
        outcome.renamed += report.rename.renamed;
        outcome.rename_conflicts += report.rename.conflicts.len();
        outcome.decompression_failures += report.decompression_failures;

        outcome.updated += 1;
        info!("{} of {} organisms updated", index + 1, total);
    }

    Ok(outcome)
}

/// Write the accepted-files list for one organism: the single expected
/// compressed-genome path for each listed assembly. Any stale copy of the
/// list is removed first so it never accumulates old entries.
pub fn write_filter_list(
    layout: &MirrorLayout,
    organism: &str,
    listing: &[String],
) -> Result<Vec<String>, SyncError> {
    let filter_dir = layout.filter_files_dir();
    if ensure_dir(&filter_dir)? {
        info!("created {filter_dir} to store filter lists");
    }

    let filter_file = layout.filter_file(organism);
    if filter_file.as_std_path().exists() {
        fs::remove_file(filter_file.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("remove {filter_file}: {err}")))?;
    }

    let accepted: Vec<String> = listing
        .iter()
        .map(|genome_id| format!("{genome_id}/{genome_id}_genomic.fna.gz"))
        .collect();
    let mut content = accepted.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(filter_file.as_std_path(), content)
        .map_err(|err| SyncError::Filesystem(format!("write {filter_file}: {err}")))?;
    Ok(accepted)
}

/// Derive the whole-catalog filter list from the assembly summary itself,
/// one compressed-genome path per entry.
pub fn write_catalog_fasta_list(
    layout: &MirrorLayout,
    catalog: &Catalog,
) -> Result<Utf8PathBuf, SyncError> {
    let fasta_list = layout.fasta_list();
    if fasta_list.as_std_path().exists() {
        fs::remove_file(fasta_list.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("remove {fasta_list}: {err}")))?;
    }
    let mut content = String::new();
    for entry in catalog.iter() {
        content.push_str(&entry.compressed_relative_path());
        content.push('\n');
    }
    fs::write(fasta_list.as_std_path(), content)
        .map_err(|err| SyncError::Filesystem(format!("write {fasta_list}: {err}")))?;
    Ok(fasta_list)
}

pub fn log_run_start(layout: &MirrorLayout) -> Result<(), SyncError> {
    let stamp = Local::now().format("%m/%d/%y - %H:%M");
    append_changes_log(layout, &format!("start time:  {stamp}\n"))
}

/// Record finish time plus a remote-vs-local directory tally, including any
/// organisms present remotely but still absent locally after the run.
pub fn log_run_finish(layout: &MirrorLayout, species: &[String]) -> Result<(), SyncError> {
    let stamp = Local::now().format("%m/%d/%y - %H:%M");
    let renamed_root = layout.renamed_root();
    let local_dirs = match fs::read_dir(renamed_root.as_std_path()) {
        Ok(entries) => entries.filter_map(Result::ok).count(),
        Err(_) => 0,
    };

    let mut message = String::new();
    message.push_str(&format!("finish time:  {stamp}\n"));
    message.push_str(&format!("dirs in catalog scope:  {}\n", species.len()));
    message.push_str(&format!("dirs in {renamed_root}:  {local_dirs}\n"));
    let missing: Vec<&String> = species
        .iter()
        .filter(|organism| !layout.organism_dir(organism.as_str()).as_std_path().is_dir())
        .collect();
    message.push_str(&format!("missing dirs = {}\n", missing.len()));
    for organism in missing {
        message.push_str(organism);
        message.push('\n');
    }
    append_changes_log(layout, &message)
}

fn append_changes_log(layout: &MirrorLayout, message: &str) -> Result<(), SyncError> {
    let log_path = layout.changes_log();
    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("open {log_path}: {err}")))?;
    log.write_all(message.as_bytes())
        .map_err(|err| SyncError::Filesystem(err.to_string()))
}
