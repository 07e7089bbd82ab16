use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Unique identifier of one genome assembly, e.g. `GCA_000005845.2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let rest = normalized
            .strip_prefix("GCA_")
            .or_else(|| normalized.strip_prefix("GCF_"))
            .ok_or_else(|| SyncError::InvalidAccession(value.to_string()))?;
        let (digits, version) = rest
            .split_once('.')
            .ok_or_else(|| SyncError::InvalidAccession(value.to_string()))?;
        let digits_ok = !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit());
        let version_ok = !version.is_empty() && version.chars().all(|ch| ch.is_ascii_digit());
        if !digits_ok || !version_ok {
            return Err(SyncError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssemblyLevel {
    CompleteGenome,
    Chromosome,
    Scaffold,
    Contig,
}

impl AssemblyLevel {
    /// The underscored form used in canonical filenames.
    pub fn as_token(&self) -> &'static str {
        match self {
            AssemblyLevel::CompleteGenome => "Complete_Genome",
            AssemblyLevel::Chromosome => "Chromosome",
            AssemblyLevel::Scaffold => "Scaffold",
            AssemblyLevel::Contig => "Contig",
        }
    }
}

impl fmt::Display for AssemblyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_token())
    }
}

impl FromStr for AssemblyLevel {
    type Err = SyncError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Complete Genome" | "Complete_Genome" => Ok(AssemblyLevel::CompleteGenome),
            "Chromosome" => Ok(AssemblyLevel::Chromosome),
            "Scaffold" => Ok(AssemblyLevel::Scaffold),
            "Contig" => Ok(AssemblyLevel::Contig),
            other => Err(SyncError::InvalidAssemblyLevel(other.to_string())),
        }
    }
}

/// Which organism directories a run operates on. Explicit selection is a
/// case-sensitive exact match against organism directory names; genus
/// selection is a prefix match resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesScope {
    All,
    List(Vec<String>),
    Genus(Vec<String>),
}

impl SpeciesScope {
    pub fn from_list(names: Vec<String>) -> Self {
        SpeciesScope::List(names)
    }

    /// One organism name per line, blank lines ignored.
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path)
            .map_err(|_| SyncError::SpeciesListRead(path.to_path_buf()))?;
        let names = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(SpeciesScope::List(names))
    }

    pub fn selects(&self, organism: &str) -> bool {
        match self {
            SpeciesScope::All => true,
            SpeciesScope::List(names) => names.iter().any(|name| name == organism),
            SpeciesScope::Genus(prefixes) => {
                prefixes.iter().any(|genus| organism.starts_with(genus.as_str()))
            }
        }
    }

    /// Materialize the scope against the catalog's organism set, preserving
    /// the catalog's ordering for `All` and `Genus` and the operator's for
    /// `List`.
    pub fn resolve(&self, known: &BTreeSet<String>) -> Vec<String> {
        match self {
            SpeciesScope::All => known.iter().cloned().collect(),
            SpeciesScope::List(names) => names.clone(),
            SpeciesScope::Genus(_) => known
                .iter()
                .filter(|organism| self.selects(organism.as_str()))
                .cloned()
                .collect(),
        }
    }
}
