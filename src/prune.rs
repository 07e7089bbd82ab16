use std::collections::BTreeSet;
use std::fs;

use tracing::{info, warn};

use crate::assess::accession_from_filename;
use crate::catalog::Catalog;
use crate::domain::Accession;
use crate::error::SyncError;
use crate::layout::MirrorLayout;

/// Delete local files for genomes that no longer appear in the catalog.
/// Anything still present in the catalog is refused, guarding against a
/// stale or incorrectly computed diff. Returns how many files were removed.
pub fn remove_old_genomes(
    layout: &MirrorLayout,
    catalog: &Catalog,
    old_genomes: &BTreeSet<Accession>,
    species: &[String],
) -> Result<usize, SyncError> {
    if old_genomes.is_empty() {
        return Ok(0);
    }

    let mut doomed = BTreeSet::new();
    for accession in old_genomes {
        if catalog.contains(accession) {
            warn!("refusing to remove {accession}: still present in the assembly summary");
            continue;
        }
        doomed.insert(accession.clone());
    }
    if doomed.is_empty() {
        return Ok(0);
    }

    info!("removing {} stale genomes", doomed.len());
    let mut removed = 0usize;
    for organism in species {
        for dir in [
            layout.organism_dir(organism),
            layout.renamed_organism_dir(organism),
        ] {
            if !dir.as_std_path().is_dir() {
                continue;
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
                if doomed.contains(&accession) {
                    info!("removing stale genome file {}", dir.join(name));
                    fs::remove_file(entry.path())
                        .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                    removed += 1;
                }
            }
        }
    }
    Ok(removed)
}
