use std::fs::{self, File};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::assess::accession_from_filename;
use crate::catalog::Catalog;
use crate::error::SyncError;
use crate::layout::{MirrorLayout, ensure_dir};
use crate::rename::{RenameReport, canonical_name, rename_fastas, walk_files};

#[derive(Debug, Clone, Default)]
pub struct OrganismReport {
    pub copied: usize,
    pub already_present: usize,
    pub unpacked: usize,
    pub decompression_failures: usize,
    pub rename: RenameReport,
}

/// Copy newly transferred files from an organism's mirror directory into
/// its renamed-output directory, decompress them there, and hand the result
/// to the filename normalizer. Transfer logs and sketch artifacts stay in
/// the mirror tree.
pub fn process_organism(
    layout: &MirrorLayout,
    catalog: &Catalog,
    organism: &str,
) -> Result<OrganismReport, SyncError> {
    let source = layout.organism_dir(organism);
    let destination = layout.renamed_organism_dir(organism);
    ensure_dir(&destination)?;

    let (copied, already_present) = copy_new_files(&source, &destination, catalog)?;
    let (unpacked, failures) = gunzip_dir(&destination)?;
    let rename = rename_fastas(&destination, catalog)?;
    Ok(OrganismReport {
        copied,
        already_present,
        unpacked,
        decompression_failures: failures.len(),
        rename,
    })
}

/// Copy files from `source` into `destination`, flattening subdirectories.
/// A file already present at the destination is silently skipped, not an
/// error; a compressed file whose decompressed or canonically renamed form
/// already landed there counts as present. Returns `(copied, skipped)`.
pub fn copy_new_files(
    source: &Utf8Path,
    destination: &Utf8Path,
    catalog: &Catalog,
) -> Result<(usize, usize), SyncError> {
    let mut copied = 0usize;
    let mut skipped = 0usize;
    for path in walk_files(source)? {
        let Some(name) = path.file_name() else {
            continue;
        };
        if name.starts_with('.') || name == "transfer_log.txt" || name.ends_with(".msh") {
            continue;
        }
        if already_present(name, destination, catalog) {
            skipped += 1;
            continue;
        }
        fs::copy(path.as_std_path(), destination.join(name).as_std_path())
            .map_err(|err| SyncError::Filesystem(format!("copy {path}: {err}")))?;
        copied += 1;
    }
    Ok((copied, skipped))
}

fn already_present(name: &str, destination: &Utf8Path, catalog: &Catalog) -> bool {
    if destination.join(name).as_std_path().exists() {
        return true;
    }
    if let Some(stem) = name.strip_suffix(".gz") {
        if destination.join(stem).as_std_path().exists() {
            return true;
        }
    }
    if let Some(accession) = accession_from_filename(name) {
        if let Some(entry) = catalog.get(&accession) {
            return destination.join(canonical_name(entry)).as_std_path().exists();
        }
    }
    false
}

/// Decompress every `.gz` under `target_dir` in place. A corrupt archive is
/// reported and skipped; its siblings are unaffected. Returns the number of
/// files unpacked and the per-file failures.
pub fn gunzip_dir(target_dir: &Utf8Path) -> Result<(usize, Vec<SyncError>), SyncError> {
    let mut unpacked = 0usize;
    let mut failures = Vec::new();
    for path in walk_files(target_dir)? {
        if path.extension() != Some("gz") {
            continue;
        }
        match gunzip_file(&path) {
            Ok(_) => unpacked += 1,
            Err(err) => {
                warn!("{err}");
                failures.push(err);
            }
        }
    }
    Ok((unpacked, failures))
}

/// Decompress one gzip member next to itself, dropping the `.gz` suffix.
/// The compressed source is deleted only after the decompressed form has
/// been fully written.
pub fn gunzip_file(path: &Utf8Path) -> Result<Utf8PathBuf, SyncError> {
    let target = path.with_extension("");
    let file = File::open(path.as_std_path()).map_err(|err| SyncError::Decompression {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mut decoder = GzDecoder::new(file);
    let mut output =
        File::create(target.as_std_path()).map_err(|err| SyncError::Decompression {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
    if let Err(err) = io::copy(&mut decoder, &mut output) {
        drop(output);
        let _ = fs::remove_file(target.as_std_path());
        return Err(SyncError::Decompression {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }
    fs::remove_file(path.as_std_path())
        .map_err(|err| SyncError::Filesystem(format!("remove {path}: {err}")))?;
    debug!("unpacked {path}");
    Ok(target)
}

/// Decompress every compressed file found anywhere under the mirror root,
/// each one using its own path.
pub fn unzip_mirror(root: &Utf8Path) -> Result<(usize, Vec<SyncError>), SyncError> {
    gunzip_dir(root)
}
