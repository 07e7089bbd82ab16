use std::collections::BTreeSet;
use std::fs;
use std::str::FromStr;

use camino::Utf8Path;
use tracing::info;

use crate::catalog::Catalog;
use crate::domain::Accession;
use crate::error::SyncError;
use crate::layout::MirrorLayout;

/// Snapshot of how the local mirror compares to the catalog for the
/// selected species.
#[derive(Debug, Clone, Default)]
pub struct MirrorStatus {
    /// Catalog accessions already present on disk.
    pub local_genomes: BTreeSet<Accession>,
    /// Catalog accessions missing from disk, to be fetched.
    pub new_genomes: BTreeSet<Accession>,
    /// On-disk accessions absent from the catalog, to be removed.
    pub old_genomes: BTreeSet<Accession>,
    /// Accessions with a sketch artifact on disk.
    pub sketch_files: BTreeSet<Accession>,
    /// Catalog accessions lacking a sketch artifact.
    pub missing_sketch_files: BTreeSet<Accession>,
}

impl MirrorStatus {
    pub fn log_counts(&self) {
        info!("{} genomes present in local collection", self.local_genomes.len());
        info!("{} genomes missing from local collection", self.new_genomes.len());
        if self.new_genomes.is_empty() {
            info!("local collection is up to date with the latest assembly summary");
        }
        info!("{} genomes no longer in the assembly summary", self.old_genomes.len());
        info!("{} sketch files present in local collection", self.sketch_files.len());
        info!("{} sketch files missing from local collection", self.missing_sketch_files.len());
    }
}

/// Diff the catalog against on-disk state for the selected species.
pub fn assess_mirror(
    layout: &MirrorLayout,
    catalog: &Catalog,
    species: &[String],
) -> Result<MirrorStatus, SyncError> {
    let mut status = MirrorStatus::default();

    for organism in species {
        let organism_dir = layout.organism_dir(organism);
        let (on_disk, sketches) = scan_organism_dir(&organism_dir)?;

        for entry in catalog.entries_for(organism) {
            if on_disk.contains(&entry.accession) {
                status.local_genomes.insert(entry.accession.clone());
            } else {
                status.new_genomes.insert(entry.accession.clone());
            }
            if sketches.contains(&entry.accession) {
                status.sketch_files.insert(entry.accession.clone());
            } else {
                status.missing_sketch_files.insert(entry.accession.clone());
            }
        }

        for accession in on_disk {
            if !catalog.contains(&accession) {
                status.old_genomes.insert(accession);
            }
        }
    }

    Ok(status)
}

/// Accessions present in one organism directory, split into genome files
/// and sketch artifacts.
fn scan_organism_dir(
    dir: &Utf8Path,
) -> Result<(BTreeSet<Accession>, BTreeSet<Accession>), SyncError> {
    let mut genomes = BTreeSet::new();
    let mut sketches = BTreeSet::new();
    if !dir.as_std_path().is_dir() {
        return Ok((genomes, sketches));
    }
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("read {dir}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(accession) = accession_from_filename(name) else {
            continue;
        };
        if name.ends_with(".msh") {
            sketches.insert(accession);
        } else {
            genomes.insert(accession);
        }
    }
    Ok((genomes, sketches))
}

/// Recover the accession from a mirrored filename: the first two
/// underscore-delimited tokens, e.g. `GCA_000005845.2` out of
/// `GCA_000005845.2_ASM584v2_genomic.fna.gz`.
pub fn accession_from_filename(name: &str) -> Option<Accession> {
    if !name.starts_with("GCA_") && !name.starts_with("GCF_") {
        return None;
    }
    let mut tokens = name.split('_');
    let prefix = tokens.next()?;
    let digits = tokens.next()?;
    let digits = digits.strip_suffix(".msh").unwrap_or(digits);
    Accession::from_str(&format!("{prefix}_{digits}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accession_recovery() {
        let acc = accession_from_filename("GCA_000005845.2_ASM584v2_genomic.fna.gz").unwrap();
        assert_eq!(acc.as_str(), "GCA_000005845.2");
        let acc = accession_from_filename("GCA_000005845.2.msh").unwrap();
        assert_eq!(acc.as_str(), "GCA_000005845.2");
        assert!(accession_from_filename("transfer_log.txt").is_none());
        assert!(accession_from_filename("GCA_junk").is_none());
    }
}
