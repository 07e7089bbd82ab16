use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::domain::{Accession, AssemblyLevel};
use crate::error::SyncError;

const REQUIRED_COLUMNS: [&str; 7] = [
    "assembly_accession",
    "organism_name",
    "infraspecific_name",
    "isolate",
    "assembly_level",
    "species_taxid",
    "ftp_path",
];

/// One row of the assembly summary, validated and normalized at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub accession: Accession,
    pub organism_name: String,
    pub infraspecific_name: String,
    pub assembly_level: AssemblyLevel,
    pub species_taxid: u32,
    pub ftp_path: String,
}

impl CatalogEntry {
    /// The accession plus assembly name used as the remote artifact's base
    /// filename, always the last segment of `ftp_path`.
    pub fn genome_id(&self) -> &str {
        self.ftp_path
            .rsplit('/')
            .next()
            .unwrap_or(self.ftp_path.as_str())
    }

    /// Remote relative path of the compressed genome, e.g.
    /// `GCA_000005845.2_ASM584v2/GCA_000005845.2_ASM584v2_genomic.fna.gz`.
    pub fn compressed_relative_path(&self) -> String {
        let genome_id = self.genome_id();
        format!("{genome_id}/{genome_id}_genomic.fna.gz")
    }
}

/// Immutable index of the assembly summary, keyed by accession. Built once
/// and passed by reference into every component.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<Accession, CatalogEntry>,
}

impl Catalog {
    /// Parse `assembly_summary.txt`: one metadata line, then the column
    /// header, then tab-delimited data rows. Rows failing required-field
    /// validation are skipped with a warning.
    pub fn parse(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(SyncError::CatalogMissing(path.to_path_buf()));
        }
        let content =
            fs::read_to_string(path).map_err(|err| SyncError::CatalogParse(err.to_string()))?;
        let mut lines = content.lines();

        let _metadata = lines
            .next()
            .ok_or_else(|| SyncError::CatalogParse("file is empty".to_string()))?;
        let header = lines
            .next()
            .ok_or_else(|| SyncError::CatalogParse("missing column header".to_string()))?;
        let columns = resolve_columns(header)?;

        let mut entries = BTreeMap::new();
        let mut rejected = 0usize;
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            match parse_row(&fields, &columns) {
                Ok(entry) => {
                    entries.insert(entry.accession.clone(), entry);
                }
                Err(err) => {
                    rejected += 1;
                    warn!("skipping assembly summary row: {err}");
                }
            }
        }
        if entries.is_empty() {
            return Err(SyncError::CatalogParse("no valid data rows".to_string()));
        }
        if rejected > 0 {
            warn!("{rejected} rows rejected during catalog parse");
        }
        Ok(Self { entries })
    }

    pub fn get(&self, accession: &Accession) -> Option<&CatalogEntry> {
        self.entries.get(accession)
    }

    pub fn contains(&self, accession: &Accession) -> bool {
        self.entries.contains_key(accession)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized organism names present in the catalog.
    pub fn organisms(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|entry| entry.organism_name.clone())
            .collect()
    }

    /// Entries belonging to one organism.
    pub fn entries_for(&self, organism: &str) -> impl Iterator<Item = &CatalogEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.organism_name == organism)
    }

    #[doc(hidden)]
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.accession.clone(), entry))
                .collect(),
        }
    }
}

#[derive(Debug)]
struct ColumnMap {
    accession: usize,
    organism_name: usize,
    infraspecific_name: usize,
    isolate: usize,
    assembly_level: usize,
    species_taxid: usize,
    ftp_path: usize,
}

fn resolve_columns(header: &str) -> Result<ColumnMap, SyncError> {
    let names: Vec<&str> = header
        .trim_start_matches('#')
        .trim_start()
        .split('\t')
        .map(str::trim)
        .collect();
    let position = |column: &str| names.iter().position(|name| *name == column);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| position(column).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(SyncError::CatalogParse(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    Ok(ColumnMap {
        accession: position("assembly_accession").unwrap(),
        organism_name: position("organism_name").unwrap(),
        infraspecific_name: position("infraspecific_name").unwrap(),
        isolate: position("isolate").unwrap(),
        assembly_level: position("assembly_level").unwrap(),
        species_taxid: position("species_taxid").unwrap(),
        ftp_path: position("ftp_path").unwrap(),
    })
}

fn parse_row(fields: &[&str], columns: &ColumnMap) -> Result<CatalogEntry, SyncError> {
    let field = |index: usize| fields.get(index).copied().unwrap_or("").trim();

    let accession: Accession = field(columns.accession).parse()?;
    let assembly_level: AssemblyLevel = field(columns.assembly_level).parse()?;
    let species_taxid = field(columns.species_taxid)
        .parse::<u32>()
        .map_err(|_| SyncError::CatalogParse(format!("bad species_taxid for {accession}")))?;

    let ftp_path = field(columns.ftp_path).to_string();
    if ftp_path.is_empty() {
        return Err(SyncError::CatalogParse(format!("empty ftp_path for {accession}")));
    }

    // The infraspecific fallback happens here, exactly once: an absent
    // infraspecific name takes the isolate, and the literal marker "NA"
    // stands in when both are absent.
    let infraspecific_raw = field(columns.infraspecific_name);
    let isolate = field(columns.isolate);
    let infraspecific = if !infraspecific_raw.is_empty() {
        infraspecific_raw
    } else if !isolate.is_empty() {
        isolate
    } else {
        "NA"
    };

    Ok(CatalogEntry {
        accession,
        organism_name: normalize_field(field(columns.organism_name)),
        infraspecific_name: normalize_field(infraspecific),
        assembly_level,
        species_taxid,
        ftp_path,
    })
}

/// Collapse runs of whitespace to a single underscore, then map every
/// remaining non-alphanumeric character to an underscore.
pub fn normalize_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_whitespace = false;
    for ch in value.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            if ch.is_ascii_alphanumeric() {
                out.push(ch);
            } else {
                out.push('_');
            }
        }
    }
    out
}
