use std::collections::BTreeSet;

use camino::Utf8PathBuf;

use genbank_mirror::assess::assess_mirror;
use genbank_mirror::catalog::{Catalog, CatalogEntry};
use genbank_mirror::domain::{Accession, AssemblyLevel, SpeciesScope};
use genbank_mirror::layout::MirrorLayout;

fn entry(accession: &str, organism: &str, genome_id: &str) -> CatalogEntry {
    CatalogEntry {
        accession: accession.parse().unwrap(),
        organism_name: organism.to_string(),
        infraspecific_name: "NA".to_string(),
        assembly_level: AssemblyLevel::Contig,
        species_taxid: 1,
        ftp_path: format!("https://example/genomes/all/{genome_id}"),
    }
}

fn three_species_catalog() -> Catalog {
    Catalog::from_entries([
        entry("GCA_000000001.1", "Escherichia_coli", "GCA_000000001.1_ASM1v1"),
        entry("GCA_000000002.1", "Bacillus_subtilis", "GCA_000000002.1_ASM2v1"),
        entry("GCA_000000003.1", "Vibrio_cholerae", "GCA_000000003.1_ASM3v1"),
    ])
}

#[test]
fn assessor_splits_present_and_missing() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let catalog = three_species_catalog();
    let species = SpeciesScope::All.resolve(&catalog.organisms());

    // Only Escherichia_coli is mirrored locally.
    let coli_dir = layout.organism_dir("Escherichia_coli");
    std::fs::create_dir_all(coli_dir.as_std_path()).unwrap();
    std::fs::write(
        coli_dir.join("GCA_000000001.1_ASM1v1_genomic.fna.gz").as_std_path(),
        b"gz",
    )
    .unwrap();

    let status = assess_mirror(&layout, &catalog, &species).unwrap();

    let local: BTreeSet<Accession> = ["GCA_000000001.1".parse().unwrap()].into();
    let new: BTreeSet<Accession> = [
        "GCA_000000002.1".parse().unwrap(),
        "GCA_000000003.1".parse().unwrap(),
    ]
    .into();
    assert_eq!(status.local_genomes, local);
    assert_eq!(status.new_genomes, new);
    assert!(status.old_genomes.is_empty());
    assert!(status.missing_sketch_files.len() > status.sketch_files.len());
}

#[test]
fn local_and_new_are_disjoint_and_cover_the_scope() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let catalog = three_species_catalog();
    let species = SpeciesScope::All.resolve(&catalog.organisms());

    let status = assess_mirror(&layout, &catalog, &species).unwrap();

    let overlap: Vec<_> = status.local_genomes.intersection(&status.new_genomes).collect();
    assert!(overlap.is_empty());

    let covered: BTreeSet<Accession> =
        status.local_genomes.union(&status.new_genomes).cloned().collect();
    let scoped: BTreeSet<Accession> =
        catalog.iter().map(|entry| entry.accession.clone()).collect();
    assert_eq!(covered, scoped);
}

#[test]
fn scope_restricts_the_assessment() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let catalog = three_species_catalog();
    let scope = SpeciesScope::from_list(vec!["Vibrio_cholerae".to_string()]);
    let species = scope.resolve(&catalog.organisms());

    let status = assess_mirror(&layout, &catalog, &species).unwrap();
    assert_eq!(status.new_genomes.len(), 1);
    assert!(status.new_genomes.contains(&"GCA_000000003.1".parse().unwrap()));
}

#[test]
fn on_disk_accessions_absent_from_catalog_are_old() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let catalog = three_species_catalog();
    let species = SpeciesScope::All.resolve(&catalog.organisms());

    let coli_dir = layout.organism_dir("Escherichia_coli");
    std::fs::create_dir_all(coli_dir.as_std_path()).unwrap();
    std::fs::write(
        coli_dir.join("GCA_000000009.9_ASM9v9_genomic.fna.gz").as_std_path(),
        b"gz",
    )
    .unwrap();

    let status = assess_mirror(&layout, &catalog, &species).unwrap();
    assert!(status.old_genomes.contains(&"GCA_000000009.9".parse().unwrap()));
}

#[test]
fn sketches_are_tracked_separately_from_genomes() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let catalog = three_species_catalog();
    let species = SpeciesScope::All.resolve(&catalog.organisms());

    let coli_dir = layout.organism_dir("Escherichia_coli");
    std::fs::create_dir_all(coli_dir.as_std_path()).unwrap();
    // Sketch present without the genome itself.
    std::fs::write(coli_dir.join("GCA_000000001.1.msh").as_std_path(), b"msh").unwrap();

    let status = assess_mirror(&layout, &catalog, &species).unwrap();
    assert!(status.sketch_files.contains(&"GCA_000000001.1".parse().unwrap()));
    assert!(status.new_genomes.contains(&"GCA_000000001.1".parse().unwrap()));
    assert_eq!(status.missing_sketch_files.len(), 2);
}
