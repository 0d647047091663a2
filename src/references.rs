//! Reference files loaded once per run and shared read-only: the
//! study/species mapping and the Reactome pathway cache.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::CompoundId;
use crate::error::BuilderError;
use crate::record::{ReactomePathway, SpeciesEntry};

pub const MAPPING_FILE: &str = "mapping";
pub const REACTOME_FILE: &str = "reactome";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRow {
    pub study: String,
    pub species: String,
    #[serde(default)]
    pub maf_entry: Option<String>,
    #[serde(default)]
    pub assay: Option<String>,
}

/// Which studies report a compound, and in which species.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MappingIndex {
    #[serde(default)]
    compound_mapping: BTreeMap<String, Vec<MappingRow>>,
}

/// Everything the mapping file knows about one compound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingEntry {
    pub studies: Vec<String>,
    pub species: BTreeMap<String, Vec<SpeciesEntry>>,
}

impl MappingIndex {
    pub fn len(&self) -> usize {
        self.compound_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compound_mapping.is_empty()
    }

    pub fn lookup(&self, id: &CompoundId) -> Option<MappingEntry> {
        let rows = self.compound_mapping.get(&id.chebi_key())?;
        let mut studies = BTreeSet::new();
        let mut species: BTreeMap<String, Vec<SpeciesEntry>> = BTreeMap::new();
        for row in rows {
            studies.insert(row.study.clone());
            let name = row.species.to_lowercase();
            species
                .entry(name.clone())
                .or_default()
                .push(SpeciesEntry {
                    species: Some(name),
                    species_accession: Some(row.study.clone()),
                    maf_entry: row.maf_entry.clone(),
                    assay: row.assay.clone(),
                    ..SpeciesEntry::default()
                });
        }
        Some(MappingEntry {
            studies: studies.into_iter().collect(),
            species,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactomeRow {
    pub pathway: String,
    pub pathway_id: String,
    pub reactome_url: String,
    pub reactome_id: String,
    pub species: String,
}

impl ReactomeRow {
    pub fn to_pathway(&self) -> ReactomePathway {
        ReactomePathway {
            name: self.pathway.clone(),
            pathway_id: self.pathway_id.clone(),
            url: self.reactome_url.clone(),
            reactome_id: self.reactome_id.clone(),
        }
    }
}

/// Reactome pathways keyed by accession (`MTBLCn`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ReactomeCache {
    entries: BTreeMap<String, Vec<ReactomeRow>>,
}

impl ReactomeCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn slice(&self, id: &CompoundId) -> Option<&[ReactomeRow]> {
        self.entries.get(&id.accession()).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default)]
pub struct References {
    pub mapping: MappingIndex,
    pub reactome: ReactomeCache,
}

impl References {
    /// Loads `mapping.json` and `reactome.json` from `ref_dir`. Either may be
    /// gzip-compressed with a `.json.gz` name instead.
    pub fn load(ref_dir: &Utf8Path) -> Result<Self, BuilderError> {
        let mapping: MappingIndex = load_json(&locate(ref_dir, MAPPING_FILE)?)?;
        let reactome: ReactomeCache = load_json(&locate(ref_dir, REACTOME_FILE)?)?;
        tracing::info!(
            mapped_compounds = mapping.len(),
            reactome_compounds = reactome.len(),
            "loaded reference files"
        );
        Ok(Self { mapping, reactome })
    }
}

fn locate(ref_dir: &Utf8Path, stem: &str) -> Result<Utf8PathBuf, BuilderError> {
    let plain = ref_dir.join(format!("{stem}.json"));
    if plain.is_file() {
        return Ok(plain);
    }
    let gzipped = ref_dir.join(format!("{stem}.json.gz"));
    if gzipped.is_file() {
        return Ok(gzipped);
    }
    Err(BuilderError::Reference {
        path: plain.into_std_path_buf(),
        message: format!("neither {stem}.json nor {stem}.json.gz exists"),
    })
}

pub fn load_json<T: DeserializeOwned>(path: &Utf8Path) -> Result<T, BuilderError> {
    let reference_error = |message: String| BuilderError::Reference {
        path: path.as_std_path().to_path_buf(),
        message,
    };
    let file = File::open(path.as_std_path()).map_err(|err| reference_error(err.to_string()))?;
    let reader: Box<dyn Read> = if path.extension() == Some("gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    serde_json::from_reader(BufReader::new(reader)).map_err(|err| reference_error(err.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mapping_lookup_groups_species_and_sorts_studies() {
        let index: MappingIndex = serde_json::from_value(json!({
            "compound_mapping": {
                "CHEBI:15366": [
                    {"study": "MTBLS2", "species": "Homo sapiens", "mafEntry": "m_1.tsv", "assay": "a_1.txt"},
                    {"study": "MTBLS1", "species": "homo sapiens"},
                    {"study": "MTBLS2", "species": "Mus musculus"}
                ]
            }
        }))
        .unwrap();

        let entry = index.lookup(&"MTBLC15366".parse().unwrap()).unwrap();
        assert_eq!(entry.studies, vec!["MTBLS1".to_string(), "MTBLS2".to_string()]);
        assert_eq!(entry.species["homo sapiens"].len(), 2);
        assert_eq!(
            entry.species["homo sapiens"][0].species.as_deref(),
            Some("homo sapiens")
        );
        assert_eq!(
            entry.species["homo sapiens"][0].maf_entry.as_deref(),
            Some("m_1.tsv")
        );
        assert!(index.lookup(&"1".parse().unwrap()).is_none());
    }

    #[test]
    fn reactome_slice_is_keyed_by_accession() {
        let cache: ReactomeCache = serde_json::from_value(json!({
            "MTBLC15366": [{
                "pathway": "Ethanol oxidation", "pathwayId": "R-HSA-71384",
                "reactomeUrl": "https://reactome.org/content/detail/R-HSA-71384",
                "reactomeId": "R-HSA-71384", "species": "Homo sapiens"
            }]
        }))
        .unwrap();
        assert_eq!(cache.slice(&"15366".parse().unwrap()).unwrap().len(), 1);
        assert!(cache.slice(&"15367".parse().unwrap()).is_none());
    }
}
