use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BuilderError;

static COMPOUND_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:MTBLC|CHEBI:)?0*([1-9][0-9]*)$").unwrap());

/// A compound, keyed by its ChEBI number.
///
/// Accepts `MTBLC15366`, `CHEBI:15366` and `15366`; all three name the same
/// compound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundId(String);

impl CompoundId {
    /// Bare ChEBI number, e.g. `15366`.
    pub fn chebi_number(&self) -> &str {
        &self.0
    }

    /// Key used by ChEBI and the mapping file, e.g. `CHEBI:15366`.
    pub fn chebi_key(&self) -> String {
        format!("CHEBI:{}", self.0)
    }

    /// MetaboLights accession, e.g. `MTBLC15366`. Output directories and the
    /// Reactome cache are keyed by this form.
    pub fn accession(&self) -> String {
        format!("MTBLC{}", self.0)
    }
}

impl fmt::Display for CompoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MTBLC{}", self.0)
    }
}

impl FromStr for CompoundId {
    type Err = BuilderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let number = COMPOUND_ID
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| BuilderError::InvalidCompoundId(value.to_string()))?;
        Ok(Self(number.as_str().to_string()))
    }
}

impl Serialize for CompoundId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.accession())
    }
}

impl<'de> Deserialize<'de> for CompoundId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// External providers queried for every compound.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceName {
    Structure,
    Wikipathways,
    Kegg,
    Citations,
    Reactions,
    Spectra,
}

impl SourceName {
    pub const ALL: [SourceName; 6] = [
        SourceName::Structure,
        SourceName::Wikipathways,
        SourceName::Kegg,
        SourceName::Citations,
        SourceName::Reactions,
        SourceName::Spectra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Structure => "structure",
            SourceName::Wikipathways => "wikipathways",
            SourceName::Kegg => "kegg",
            SourceName::Citations => "citations",
            SourceName::Reactions => "reactions",
            SourceName::Spectra => "spectra",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceName {
    type Err = BuilderError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        SourceName::ALL
            .into_iter()
            .find(|name| name.as_str() == normalized)
            .ok_or_else(|| BuilderError::InvalidSource(value.to_string()))
    }
}
