use serde::Serialize;
use tracing::info;

use crate::assess::{MirrorStatus, assess_mirror};
use crate::catalog::Catalog;
use crate::domain::SpeciesScope;
use crate::error::SyncError;
use crate::layout::MirrorLayout;
use crate::prune::remove_old_genomes;
use crate::remote::RemoteSource;
use crate::rename::{MisnamedReport, find_misnamed};
use crate::sync::{SyncOutcome, log_run_finish, log_run_start, sync_organisms};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Re-fetch the assembly summary before parsing it.
    pub fetch_catalog: bool,
    /// Mutate the mirror; without this a run only assesses and reports.
    pub update: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssessSummary {
    pub catalog_entries: usize,
    pub species_in_scope: usize,
    pub present: usize,
    pub missing: usize,
    pub stale: usize,
    pub sketches_present: usize,
    pub sketches_missing: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub assess: AssessSummary,
    pub pruned: usize,
    pub sync: Option<SyncOutcome>,
}

pub struct App<R: RemoteSource> {
    layout: MirrorLayout,
    remote: R,
}

impl<R: RemoteSource> App<R> {
    pub fn new(layout: MirrorLayout, remote: R) -> Self {
        Self { layout, remote }
    }

    pub fn layout(&self) -> &MirrorLayout {
        &self.layout
    }

    /// Prepare a run: ensure the root directories, refresh the catalog
    /// unless the operator opted out, parse it, and materialize the species
    /// scope against it.
    pub fn setup(
        &self,
        scope: &SpeciesScope,
        fetch_catalog: bool,
    ) -> Result<(Catalog, Vec<String>), SyncError> {
        self.layout.ensure_roots()?;

        let catalog_path = self.layout.catalog_path();
        if fetch_catalog {
            info!("fetching current version of assembly_summary.txt");
            self.remote.fetch_catalog(&catalog_path)?;
        } else {
            info!("assembly_summary.txt will not be downloaded");
        }

        let catalog = Catalog::parse(catalog_path.as_std_path())?;
        info!("{} genomes in assembly_summary.txt", catalog.len());
        let species = scope.resolve(&catalog.organisms());
        info!("{} species selected", species.len());
        Ok((catalog, species))
    }

    pub fn assess(
        &self,
        catalog: &Catalog,
        species: &[String],
    ) -> Result<MirrorStatus, SyncError> {
        let status = assess_mirror(&self.layout, catalog, species)?;
        status.log_counts();
        Ok(status)
    }

    /// Bring the mirror up to date: create missing directories, drop stale
    /// genomes, then sync every organism that still misses a genome.
    pub fn update(
        &self,
        catalog: &Catalog,
        species: &[String],
        status: &MirrorStatus,
    ) -> Result<(usize, SyncOutcome), SyncError> {
        self.layout.create_species_dirs(species)?;
        let pruned = remove_old_genomes(&self.layout, catalog, &status.old_genomes, species)?;

        let organisms: Vec<String> = species
            .iter()
            .filter(|organism| {
                catalog
                    .entries_for(organism.as_str())
                    .any(|entry| status.new_genomes.contains(&entry.accession))
            })
            .cloned()
            .collect();

        log_run_start(&self.layout)?;
        let outcome = sync_organisms(&self.layout, catalog, &self.remote, &organisms)?;
        log_run_finish(&self.layout, species)?;
        Ok((pruned, outcome))
    }

    /// Diagnostic pass over the renamed tree against the local copy of the
    /// assembly summary. Never moves files.
    pub fn check_names(&self) -> Result<MisnamedReport, SyncError> {
        let catalog = Catalog::parse(self.layout.catalog_path().as_std_path())?;
        find_misnamed(self.layout.renamed_root(), &catalog)
    }

    /// The whole pipeline: setup, assess, and (when requested) update.
    pub fn run(&self, scope: &SpeciesScope, options: RunOptions) -> Result<RunSummary, SyncError> {
        let (catalog, species) = self.setup(scope, options.fetch_catalog)?;
        let status = self.assess(&catalog, &species)?;

        let assess = AssessSummary {
            catalog_entries: catalog.len(),
            species_in_scope: species.len(),
            present: status.local_genomes.len(),
            missing: status.new_genomes.len(),
            stale: status.old_genomes.len(),
            sketches_present: status.sketch_files.len(),
            sketches_missing: status.missing_sketch_files.len(),
        };

        if !options.update {
            return Ok(RunSummary {
                assess,
                pruned: 0,
                sync: None,
            });
        }

        let (pruned, outcome) = self.update(&catalog, &species, &status)?;
        Ok(RunSummary {
            assess,
            pruned,
            sync: Some(outcome),
        })
    }
}
