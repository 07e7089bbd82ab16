use std::collections::BTreeSet;

use camino::Utf8PathBuf;

use genbank_mirror::catalog::{Catalog, CatalogEntry};
use genbank_mirror::domain::{Accession, AssemblyLevel};
use genbank_mirror::layout::MirrorLayout;
use genbank_mirror::prune::remove_old_genomes;

fn coli_catalog() -> Catalog {
    Catalog::from_entries([CatalogEntry {
        accession: "GCA_000005845.2".parse().unwrap(),
        organism_name: "Escherichia_coli".to_string(),
        infraspecific_name: "K_12".to_string(),
        assembly_level: AssemblyLevel::CompleteGenome,
        species_taxid: 562,
        ftp_path: "https://example/genomes/all/GCA_000005845.2_ASM584v2".to_string(),
    }])
}

#[test]
fn removes_genomes_gone_from_the_catalog() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let species = vec!["Escherichia_coli".to_string()];

    let organism_dir = layout.organism_dir("Escherichia_coli");
    std::fs::create_dir_all(organism_dir.as_std_path()).unwrap();
    let stale = organism_dir.join("GCA_000000009.9_ASM9v9_genomic.fna.gz");
    let current = organism_dir.join("GCA_000005845.2_ASM584v2_genomic.fna.gz");
    std::fs::write(stale.as_std_path(), b"gz").unwrap();
    std::fs::write(current.as_std_path(), b"gz").unwrap();

    let old: BTreeSet<Accession> = ["GCA_000000009.9".parse().unwrap()].into();
    let removed = remove_old_genomes(&layout, &coli_catalog(), &old, &species).unwrap();

    assert_eq!(removed, 1);
    assert!(!stale.as_std_path().exists());
    assert!(current.as_std_path().exists());
}

#[test]
fn refuses_to_remove_accessions_still_in_the_catalog() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let species = vec!["Escherichia_coli".to_string()];

    let organism_dir = layout.organism_dir("Escherichia_coli");
    std::fs::create_dir_all(organism_dir.as_std_path()).unwrap();
    let current = organism_dir.join("GCA_000005845.2_ASM584v2_genomic.fna.gz");
    std::fs::write(current.as_std_path(), b"gz").unwrap();

    // A stale diff wrongly lists a catalog member for removal.
    let old: BTreeSet<Accession> = ["GCA_000005845.2".parse().unwrap()].into();
    let removed = remove_old_genomes(&layout, &coli_catalog(), &old, &species).unwrap();

    assert_eq!(removed, 0);
    assert!(current.as_std_path().exists());
}

#[test]
fn prunes_the_renamed_tree_too() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("genbank")).unwrap();
    let layout = MirrorLayout::new(root);
    let species = vec!["Escherichia_coli".to_string()];

    let renamed_dir = layout.renamed_organism_dir("Escherichia_coli");
    std::fs::create_dir_all(renamed_dir.as_std_path()).unwrap();
    let stale = renamed_dir.join("GCA_000000009.9_Escherichia_coli_NA_Contig.fasta");
    std::fs::write(stale.as_std_path(), b">seq\n").unwrap();

    let old: BTreeSet<Accession> = ["GCA_000000009.9".parse().unwrap()].into();
    let removed = remove_old_genomes(&layout, &coli_catalog(), &old, &species).unwrap();

    assert_eq!(removed, 1);
    assert!(!stale.as_std_path().exists());
}
