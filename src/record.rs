//! The compound document written to `<destination>/<accession>/compound.json`.
//!
//! Every field is always serialized, so consumers can rely on each key being
//! present: empty groups are written as `[]`/`{}`, unknown scalars as `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::CompoundId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundRecord {
    pub id: CompoundId,
    pub identity: Identity,
    pub structure: Option<String>,
    pub database_links: Vec<DatabaseLink>,
    pub species: BTreeMap<String, Vec<SpeciesEntry>>,
    pub studies: Vec<String>,
    pub citations: Vec<Citation>,
    pub reactions: Vec<Reaction>,
    pub pathways: Pathways,
    pub spectra: Spectra,
    pub flags: PresenceFlags,
}

impl CompoundRecord {
    pub fn new(id: CompoundId) -> Self {
        Self {
            id,
            identity: Identity::default(),
            structure: None,
            database_links: Vec::new(),
            species: BTreeMap::new(),
            studies: Vec::new(),
            citations: Vec::new(),
            reactions: Vec::new(),
            pathways: Pathways::default(),
            spectra: Spectra::default(),
            flags: PresenceFlags::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: Option<String>,
    pub definition: Option<String>,
    pub formula: Option<String>,
    pub smiles: Option<String>,
    pub inchi: Option<String>,
    pub inchi_key: Option<String>,
    pub charge: Option<i64>,
    pub mass: Option<f64>,
    pub monoisotopic_mass: Option<f64>,
    pub iupac_names: Vec<String>,
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseLink {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// One species observation. Entries from ChEBI compound origins fill the
/// source fields; entries from the study mapping fill study, MAF row and
/// assay. `species` repeats the lowercased group key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpeciesEntry {
    pub species: Option<String>,
    pub species_accession: Option<String>,
    pub source_type: Option<String>,
    pub source_accession: Option<String>,
    #[serde(rename = "MAFEntry")]
    pub maf_entry: Option<String>,
    pub assay: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub title: Option<String>,
    pub doi: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub author: Option<String>,
}

impl Citation {
    pub fn seed(source: &str, kind: &str, value: &str) -> Self {
        Self {
            source: source.to_string(),
            kind: kind.to_string(),
            value: value.to_string(),
            title: None,
            doi: None,
            abstract_text: None,
            author: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pathways {
    #[serde(rename = "WikiPathways")]
    pub wiki: BTreeMap<String, Vec<WikiPathway>>,
    #[serde(rename = "KEGGPathways")]
    pub kegg: Vec<KeggPathway>,
    #[serde(rename = "ReactomePathways")]
    pub reactome: BTreeMap<String, Vec<ReactomePathway>>,
}

impl Pathways {
    pub fn is_empty(&self) -> bool {
        self.wiki.is_empty() && self.kegg.is_empty() && self.reactome.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPathway {
    pub id: String,
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeggPathway {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "KO_PATHWAYS")]
    pub ko_pathways: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactomePathway {
    pub name: String,
    pub pathway_id: String,
    pub url: String,
    pub reactome_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectra {
    #[serde(rename = "NMR")]
    pub nmr: Vec<NmrSpectrum>,
    #[serde(rename = "MS")]
    pub ms: Vec<MsSpectrum>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumAttribute {
    pub attribute_name: String,
    pub attribute_value: String,
    pub attribute_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmrSpectrum {
    pub name: String,
    pub id: String,
    pub url: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Vec<SpectrumAttribute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsSpectrum {
    pub splash: Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub url: String,
    pub submitter: String,
    pub attributes: Vec<SpectrumAttribute>,
}

/// Booleans read by the rendering layer. Only [`PresenceFlags::derive`]
/// produces them, from the finished record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceFlags {
    pub has_literature: bool,
    pub has_reactions: bool,
    pub has_species: bool,
    pub has_pathways: bool,
    #[serde(rename = "hasNMR")]
    pub has_nmr: bool,
    #[serde(rename = "hasMS")]
    pub has_ms: bool,
}

impl PresenceFlags {
    pub fn derive(record: &CompoundRecord) -> Self {
        Self {
            has_literature: !record.citations.is_empty(),
            has_reactions: !record.reactions.is_empty(),
            has_species: !record.species.is_empty(),
            has_pathways: !record.pathways.is_empty(),
            has_nmr: !record.spectra.nmr.is_empty(),
            has_ms: !record.spectra.ms.is_empty(),
        }
    }
}
