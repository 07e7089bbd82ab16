use std::fs;
use std::io::{BufRead, BufReader};

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use tracing::{info, warn};

use crate::assess::accession_from_filename;
use crate::catalog::{Catalog, CatalogEntry};
use crate::error::SyncError;

#[derive(Debug, Clone, Default)]
pub struct RenameReport {
    pub renamed: usize,
    pub unchanged: usize,
    /// Files whose accession is absent from the catalog, left untouched.
    pub unknown: Vec<String>,
    /// Canonical targets that already existed with different content.
    pub conflicts: Vec<Utf8PathBuf>,
}

/// Build the canonical filename for one catalog entry:
/// `{accession}_{organism}_{infraspecific}_{level}.fasta`, with filler
/// tokens dropped, runs of underscores collapsed, and duplicate tokens
/// removed (first occurrence wins). Applying the post-processing to an
/// already-canonical name reproduces it unchanged.
pub fn canonical_name(entry: &CatalogEntry) -> String {
    let stem = format!(
        "{}_{}_{}_{}",
        entry.accession, entry.organism_name, entry.infraspecific_name, entry.assembly_level
    );
    let stoplist = Regex::new(r"^(sp|sub|substr|subsp|str|strain)$").unwrap();

    let mut seen = Vec::new();
    for token in stem.split('_') {
        if token.is_empty() || stoplist.is_match(token) {
            continue;
        }
        if !seen.iter().any(|kept| kept == &token) {
            seen.push(token);
        }
    }
    format!("{}.fasta", seen.join("_"))
}

/// Rename every decompressed genome file under `target_dir` to its
/// canonical, catalog-derived name. Renames happen within the file's own
/// directory. Accessions missing from the catalog are reported and left
/// alone; an existing target with different content is never overwritten.
pub fn rename_fastas(target_dir: &Utf8Path, catalog: &Catalog) -> Result<RenameReport, SyncError> {
    let mut report = RenameReport::default();

    for path in walk_files(target_dir)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        if name.ends_with(".gz") || name.ends_with(".msh") || name.starts_with('.') {
            continue;
        }
        let Some(accession) = accession_from_filename(name) else {
            continue;
        };
        let Some(entry) = catalog.get(&accession) else {
            report.unknown.push(name.to_string());
            continue;
        };

        let new_name = canonical_name(entry);
        if name == new_name {
            report.unchanged += 1;
            continue;
        }
        let new_path = path
            .parent()
            .map(|parent| parent.join(&new_name))
            .unwrap_or_else(|| Utf8PathBuf::from(&new_name));

        if new_path.as_std_path().exists() {
            if same_content(&path, &new_path)? {
                // Duplicate of an already-canonical file; drop the copy.
                fs::remove_file(path.as_std_path())
                    .map_err(|err| SyncError::Filesystem(err.to_string()))?;
                report.unchanged += 1;
            } else {
                warn!("{}", SyncError::RenameConflict(new_path.clone()));
                report.conflicts.push(new_path);
            }
            continue;
        }

        fs::rename(path.as_std_path(), new_path.as_std_path())
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;
        info!("renamed {name} -> {new_name}");
        report.renamed += 1;
    }

    if !report.unknown.is_empty() {
        warn!(
            "{} files missing from the assembly summary were left unrenamed",
            report.unknown.len()
        );
    }
    Ok(report)
}

#[derive(Debug, Clone, Default)]
pub struct MisnamedReport {
    pub total: usize,
    pub correctly_named: Vec<String>,
    pub case_mismatch: Vec<String>,
    pub misnamed: Vec<Utf8PathBuf>,
    pub missing_from_catalog: Vec<Utf8PathBuf>,
}

/// Diagnostic pass over renamed fastas: does the genus token of each
/// filename actually occur in the file's header line? Case mismatches are
/// reported separately and never gate renaming decisions.
pub fn find_misnamed(target_dir: &Utf8Path, catalog: &Catalog) -> Result<MisnamedReport, SyncError> {
    let mut report = MisnamedReport::default();

    for path in walk_files(target_dir)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        if name.ends_with(".gz") || name.ends_with(".msh") || name.starts_with('.') {
            continue;
        }
        let Some(accession) = accession_from_filename(name) else {
            continue;
        };
        let tokens: Vec<&str> = name.split('_').collect();
        let Some(genus) = tokens.get(2) else {
            continue;
        };
        report.total += 1;

        let file = fs::File::open(path.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("open {path}: {err}")))?;
        let mut header = String::new();
        BufReader::new(file)
            .read_line(&mut header)
            .map_err(|err| SyncError::Filesystem(err.to_string()))?;

        if header.contains(genus) {
            report.correctly_named.push(name.to_string());
        } else if header.to_lowercase().contains(&genus.to_lowercase()) {
            report.case_mismatch.push(name.to_string());
        } else if catalog.contains(&accession) {
            report.misnamed.push(path);
        } else {
            report.missing_from_catalog.push(path);
        }
    }

    info!("total files: {}", report.total);
    info!("correctly named: {}", report.correctly_named.len());
    info!("case mismatches: {}", report.case_mismatch.len());
    info!("misnamed: {}", report.misnamed.len());
    info!("missing from assembly summary: {}", report.missing_from_catalog.len());
    Ok(report)
}

fn same_content(a: &Utf8Path, b: &Utf8Path) -> Result<bool, SyncError> {
    let left = fs::read(a.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
    let right = fs::read(b.as_std_path()).map_err(|err| SyncError::Filesystem(err.to_string()))?;
    Ok(left == right)
}

pub(crate) fn walk_files(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SyncError> {
    let mut files = Vec::new();
    if !root.as_std_path().is_dir() {
        return Ok(files);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(dir.as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("read {dir}: {err}")))?;
        for entry in entries {
            let entry = entry.map_err(|err| SyncError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|path| SyncError::Filesystem(format!("non-utf8 path {}", path.display())))?;
            if path.as_std_path().is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
