use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::domain::Accession;
use crate::error::SyncError;

/// Path oracle for the mirror tree. The mirror root and everything below it
/// belong to this pipeline; the parallel `<root>_renamed` tree holds the
/// decompressed, canonically named output.
#[derive(Debug, Clone)]
pub struct MirrorLayout {
    mirror_root: Utf8PathBuf,
    renamed_root: Utf8PathBuf,
}

impl MirrorLayout {
    pub fn new(mirror_root: Utf8PathBuf) -> Self {
        let renamed_root = Utf8PathBuf::from(format!("{mirror_root}_renamed"));
        Self {
            mirror_root,
            renamed_root,
        }
    }

    pub fn mirror_root(&self) -> &Utf8Path {
        &self.mirror_root
    }

    pub fn renamed_root(&self) -> &Utf8Path {
        &self.renamed_root
    }

    pub fn organism_dir(&self, organism: &str) -> Utf8PathBuf {
        self.mirror_root.join(organism)
    }

    pub fn renamed_organism_dir(&self, organism: &str) -> Utf8PathBuf {
        self.renamed_root.join(organism)
    }

    pub fn filter_files_dir(&self) -> Utf8PathBuf {
        self.mirror_root.join("filter_files")
    }

    pub fn filter_file(&self, organism: &str) -> Utf8PathBuf {
        self.filter_files_dir().join(format!("{organism}.txt"))
    }

    pub fn transfer_log(&self, organism: &str) -> Utf8PathBuf {
        self.organism_dir(organism).join("transfer_log.txt")
    }

    pub fn changes_log(&self) -> Utf8PathBuf {
        self.mirror_root.join("changes_log.txt")
    }

    /// Whole-catalog filter list used when syncing everything at once.
    pub fn fasta_list(&self) -> Utf8PathBuf {
        self.mirror_root.join("fasta_list.txt")
    }

    pub fn catalog_path(&self) -> Utf8PathBuf {
        self.mirror_root.join("assembly_summary.txt")
    }

    /// Lightweight derived signature artifact for one genome, kept next to
    /// the genome inside its organism directory.
    pub fn sketch_path(&self, organism: &str, accession: &Accession) -> Utf8PathBuf {
        self.organism_dir(organism).join(format!("{accession}.msh"))
    }

    pub fn ensure_roots(&self) -> Result<(), SyncError> {
        ensure_dir(&self.mirror_root)?;
        ensure_dir(&self.renamed_root)?;
        Ok(())
    }

    /// Create any missing organism and renamed-organism directories for the
    /// selected species. Existing directories and their contents are left
    /// untouched; re-running with an unchanged list performs no writes.
    pub fn create_species_dirs(&self, species: &[String]) -> Result<usize, SyncError> {
        let mut created = 0usize;
        for organism in species {
            if ensure_dir(&self.organism_dir(organism))? {
                created += 1;
            }
            if ensure_dir(&self.renamed_organism_dir(organism))? {
                created += 1;
            }
        }
        if created > 0 {
            info!("created {created} organism directories");
        }
        Ok(created)
    }
}

/// Idempotent check-then-create. Returns whether the directory was newly
/// created, so callers can decide without re-inspecting the filesystem.
pub fn ensure_dir(path: &Utf8Path) -> Result<bool, SyncError> {
    if path.as_std_path().is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("create {path}: {err}")))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = MirrorLayout::new(Utf8PathBuf::from("/data/genbank"));
        let acc: Accession = "GCA_000005845.2".parse().unwrap();

        assert_eq!(layout.renamed_root(), "/data/genbank_renamed");
        assert_eq!(
            layout.organism_dir("Escherichia_coli"),
            "/data/genbank/Escherichia_coli"
        );
        assert_eq!(
            layout.renamed_organism_dir("Escherichia_coli"),
            "/data/genbank_renamed/Escherichia_coli"
        );
        assert_eq!(
            layout.filter_file("Escherichia_coli"),
            "/data/genbank/filter_files/Escherichia_coli.txt"
        );
        assert_eq!(
            layout.sketch_path("Escherichia_coli", &acc),
            "/data/genbank/Escherichia_coli/GCA_000005845.2.msh"
        );
        assert_eq!(layout.catalog_path(), "/data/genbank/assembly_summary.txt");
    }
}
