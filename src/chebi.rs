//! ChEBI bulk lookups and the entity populator.
//!
//! One request fetches the entities for a whole chunk of compounds. Each
//! entity is flattened into a [`ChebiRecord`], keyed by ChEBI's own field
//! names; [`CHEBI_FIELD_MAP`] says which record field each key feeds.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::domain::CompoundId;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::{Citation, DatabaseLink, SpeciesEntry};

/// Record field a ChEBI key is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanonicalField {
    Name,
    Definition,
    Formula,
    Smiles,
    Inchi,
    InchiKey,
    Charge,
    Mass,
    MonoisotopicMass,
    IupacNames,
    Synonyms,
    Species,
    DatabaseLinks,
}

pub const CHEBI_FIELD_MAP: &[(&str, CanonicalField)] = &[
    ("chebiAsciiName", CanonicalField::Name),
    ("definition", CanonicalField::Definition),
    ("Formulae", CanonicalField::Formula),
    ("smiles", CanonicalField::Smiles),
    ("inchi", CanonicalField::Inchi),
    ("inchiKey", CanonicalField::InchiKey),
    ("charge", CanonicalField::Charge),
    ("mass", CanonicalField::Mass),
    ("monoisotopicMass", CanonicalField::MonoisotopicMass),
    ("IupacNames", CanonicalField::IupacNames),
    ("Synonyms", CanonicalField::Synonyms),
    ("Species", CanonicalField::Species),
    ("DatabaseLinks", CanonicalField::DatabaseLinks),
];

const CITATIONS_KEY: &str = "Citations";

pub trait ChebiClient: Send + Sync {
    /// Entities for `ids`, keyed by `CHEBI:n`. Ids ChEBI does not know are
    /// simply missing from the map.
    fn fetch_entities(&self, ids: &[CompoundId]) -> Result<BTreeMap<String, Value>, BuilderError>;
}

pub struct ChebiHttpClient {
    session: HttpSession,
    base_url: String,
}

impl ChebiHttpClient {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl ChebiClient for ChebiHttpClient {
    fn fetch_entities(&self, ids: &[CompoundId]) -> Result<BTreeMap<String, Value>, BuilderError> {
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let joined = ids
            .iter()
            .map(CompoundId::chebi_key)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}?chebi_ids={joined}", self.base_url);
        let raw = self.session.get_json(Upstream::Chebi, &url)?;
        let Value::Object(entities) = raw else {
            return Err(BuilderError::payload(
                Upstream::Chebi,
                "expected an object keyed by ChEBI id",
            ));
        };
        Ok(entities
            .into_iter()
            .map(|(key, entity)| (key.trim().to_string(), entity))
            .collect())
    }
}

/// A ChEBI entity flattened into ChEBI-vocabulary keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChebiRecord {
    fields: BTreeMap<String, Value>,
}

impl ChebiRecord {
    pub fn from_entity(entity: &Value) -> Self {
        let data = entity.get("data").unwrap_or(&Value::Null);
        let structure = data.get("default_structure").unwrap_or(&Value::Null);
        let chemical = data.get("chemical_data").unwrap_or(&Value::Null);

        let mut record = Self::default();
        record.put("definition", data.get("definition").cloned());
        record.put(
            "chebiAsciiName",
            data.get("ascii_name")
                .filter(|value| !value.is_null())
                .or_else(|| data.get("name"))
                .cloned(),
        );
        record.put("smiles", structure.get("smiles").cloned());
        record.put("inchi", structure.get("standard_inchi").cloned());
        record.put("inchiKey", structure.get("standard_inchi_key").cloned());
        record.put("charge", chemical.get("charge").map(lenient_number));
        record.put("mass", chemical.get("mass").map(lenient_number));
        record.put(
            "monoisotopicMass",
            chemical.get("monoisotopic_mass").map(lenient_number),
        );
        record.put("Formulae", chemical.get("formula").cloned());

        let names = data.get("names").unwrap_or(&Value::Null);
        record.put("Synonyms", Some(name_list(names.get("SYNONYM"))));
        record.put("IupacNames", Some(name_list(names.get("IUPAC NAME"))));

        let accessions = data.get("database_accessions").and_then(Value::as_object);
        record.put(CITATIONS_KEY, Some(citations(accessions)));
        record.put("DatabaseLinks", Some(database_links(accessions)));
        record.put("Species", Some(origin_species(data.get("compound_origins"))));
        record
    }

    fn put(&mut self, key: &str, value: Option<Value>) {
        if let Some(value) = value.filter(|value| !value.is_null()) {
            self.fields.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn inchi_key(&self) -> Option<String> {
        self.get("inchiKey")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Literature references listed by ChEBI. They seed the citations
    /// source.
    pub fn citations(&self) -> Vec<Citation> {
        self.get(CITATIONS_KEY)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }
}

// ChEBI sometimes sends numbers as strings.
fn lenient_number(value: &Value) -> Value {
    let Value::String(text) = value else {
        return value.clone();
    };
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Value::Number(int.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| value.clone())
}

fn name_list(names: Option<&Value>) -> Value {
    let list = names
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    entry
                        .get("ascii_name")
                        .and_then(Value::as_str)
                        .or_else(|| entry.get("name").and_then(Value::as_str))
                        .filter(|name| !name.is_empty())
                        .map(|name| Value::String(name.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();
    Value::Array(list)
}

fn text_or_na(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| entry.get(*key).and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .unwrap_or("N/A")
        .to_string()
}

fn citations(accessions: Option<&Map<String, Value>>) -> Value {
    let list: Vec<Citation> = accessions
        .and_then(|accessions| accessions.get("CITATION"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| {
                    Citation::seed(
                        &text_or_na(entry, &["source_name", "prefix"]),
                        entry
                            .get("type")
                            .and_then(Value::as_str)
                            .filter(|kind| !kind.is_empty())
                            .unwrap_or("CITATION"),
                        &text_or_na(entry, &["accession_number", "url"]),
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    serde_json::to_value(list).unwrap_or(Value::Array(Vec::new()))
}

fn database_links(accessions: Option<&Map<String, Value>>) -> Value {
    let mut links = Vec::new();
    for (kind, entries) in accessions.into_iter().flatten() {
        if kind == "CITATION" {
            continue;
        }
        for entry in entries.as_array().into_iter().flatten() {
            let source = entry
                .get("source_name")
                .and_then(Value::as_str)
                .or_else(|| entry.get("prefix").and_then(Value::as_str))
                .unwrap_or(kind.as_str());
            links.push(DatabaseLink {
                source: source.to_string(),
                kind: kind.clone(),
                value: text_or_na(entry, &["accession_number", "url"]),
            });
        }
    }
    serde_json::to_value(links).unwrap_or(Value::Array(Vec::new()))
}

fn origin_species(origins: Option<&Value>) -> Value {
    let mut species: BTreeMap<String, Vec<SpeciesEntry>> = BTreeMap::new();
    for origin in origins.and_then(Value::as_array).into_iter().flatten() {
        let Some(name) = ["species_text", "speciesText", "species"]
            .iter()
            .find_map(|key| origin.get(*key).and_then(Value::as_str))
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        let name = name.to_lowercase();
        species
            .entry(name.clone())
            .or_default()
            .push(SpeciesEntry {
                species: Some(name),
                species_accession: Some(text_or_na(
                    origin,
                    &["species_accession", "SpeciesAccession", "speciesAccession"],
                )),
                source_type: Some(text_or_na(origin, &["SourceType", "source_type"])),
                source_accession: Some(text_or_na(
                    origin,
                    &["SourceAccession", "source_accession"],
                )),
                ..SpeciesEntry::default()
            });
    }
    serde_json::to_value(species).unwrap_or(Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use super::*;

    #[test]
    fn field_map_has_no_duplicates() {
        let keys: BTreeSet<_> = CHEBI_FIELD_MAP.iter().map(|(key, _)| *key).collect();
        let targets: BTreeSet<_> = CHEBI_FIELD_MAP.iter().map(|(_, field)| *field).collect();
        assert_eq!(keys.len(), CHEBI_FIELD_MAP.len());
        assert_eq!(targets.len(), CHEBI_FIELD_MAP.len());
    }

    #[test]
    fn populates_from_entity() {
        let entity = json!({
            "primary_chebi_id": "CHEBI:15366",
            "data": {
                "ascii_name": "acetic acid",
                "definition": "A simple monocarboxylic acid.",
                "default_structure": {
                    "smiles": "CC(O)=O",
                    "standard_inchi": "InChI=1S/C2H4O2/c1-2(3)4/h1H3,(H,3,4)",
                    "standard_inchi_key": "QTBSBXVTEAMEQO-UHFFFAOYSA-N"
                },
                "chemical_data": {"formula": "C2H4O2", "charge": "0", "mass": "60.05200", "monoisotopic_mass": 60.02113},
                "names": {
                    "SYNONYM": [{"name": "Essigsaeure", "ascii_name": "Essigsaeure"}, {"name": ""}],
                    "IUPAC NAME": [{"name": "acetic acid"}]
                },
                "database_accessions": {
                    "CITATION": [{"source_name": "PubMed", "accession_number": "16287919"}],
                    "CAS": [{"source_name": "ChemIDplus", "accession_number": "64-19-7"}]
                },
                "compound_origins": [{"species_text": "Homo sapiens", "species_accession": "NCBI:txid9606"}]
            }
        });

        let record = ChebiRecord::from_entity(&entity);
        assert_eq!(record.inchi_key().as_deref(), Some("QTBSBXVTEAMEQO-UHFFFAOYSA-N"));
        assert_eq!(record.get("charge"), Some(&json!(0)));
        assert_eq!(record.get("mass"), Some(&json!(60.052)));
        assert_eq!(record.get("Synonyms"), Some(&json!(["Essigsaeure"])));

        let citations = record.citations();
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].kind, "CITATION");
        assert_eq!(citations[0].value, "16287919");

        let links = record.get("DatabaseLinks").unwrap();
        assert_eq!(links[0]["type"], "CAS");
        assert_eq!(links[0]["value"], "64-19-7");

        let species = record.get("Species").unwrap();
        assert_eq!(species["homo sapiens"][0]["SpeciesAccession"], "NCBI:txid9606");
        assert_eq!(species["homo sapiens"][0]["SourceType"], "N/A");
        assert_eq!(species["homo sapiens"][0]["Species"], "homo sapiens");
    }

    #[test]
    fn entity_without_data_yields_empty_groups() {
        let record = ChebiRecord::from_entity(&json!({}));
        assert_eq!(record.inchi_key(), None);
        assert!(record.citations().is_empty());
        assert_eq!(record.get("Species"), Some(&json!({})));
    }
}
