//! Final merge of one compound's record.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::chebi::{CHEBI_FIELD_MAP, CanonicalField, ChebiRecord};
use crate::legacy;
use crate::record::{CompoundRecord, PresenceFlags, ReactomePathway};
use crate::references::{MappingEntry, ReactomeRow};

pub struct RecordAssembler;

impl RecordAssembler {
    /// Merges the sorted record with the auxiliary lookups. Every lookup is
    /// optional; a missing one contributes empty groups. Flags are derived
    /// last, from the finished groups.
    pub fn assemble(
        own: CompoundRecord,
        chebi: Option<&ChebiRecord>,
        mapping: Option<&MappingEntry>,
        reactome: Option<&[ReactomeRow]>,
        legacy: Option<&Value>,
    ) -> CompoundRecord {
        let mut record = own;

        if let Some(chebi) = chebi {
            merge_chebi(&mut record, chebi);
        }

        if let Some(mapping) = mapping {
            for (species, entries) in &mapping.species {
                record
                    .species
                    .entry(species.clone())
                    .or_default()
                    .extend(entries.iter().cloned());
            }
            record.studies = mapping.studies.clone();
        } else {
            record.studies = Vec::new();
        }

        record.pathways.reactome = reactome.map(group_reactome).unwrap_or_default();
        record.spectra.nmr = legacy.map(legacy::nmr_spectra).unwrap_or_default();

        record.flags = PresenceFlags::derive(&record);
        record
    }
}

fn merge_chebi(record: &mut CompoundRecord, chebi: &ChebiRecord) {
    for &(key, field) in CHEBI_FIELD_MAP {
        let Some(value) = chebi.get(key) else {
            continue;
        };
        if let Err(err) = apply_field(record, field, value) {
            tracing::warn!(
                compound = %record.id,
                chebi_key = key,
                error = %err,
                "ignoring mistyped ChEBI value"
            );
        }
    }
}

fn apply_field(
    record: &mut CompoundRecord,
    field: CanonicalField,
    value: &Value,
) -> Result<(), serde_json::Error> {
    let identity = &mut record.identity;
    match field {
        CanonicalField::Name => identity.name = Some(typed(value)?),
        CanonicalField::Definition => identity.definition = Some(typed(value)?),
        CanonicalField::Formula => identity.formula = Some(typed(value)?),
        CanonicalField::Smiles => identity.smiles = Some(typed(value)?),
        CanonicalField::Inchi => identity.inchi = Some(typed(value)?),
        CanonicalField::InchiKey => identity.inchi_key = Some(typed(value)?),
        CanonicalField::Charge => identity.charge = Some(typed(value)?),
        CanonicalField::Mass => identity.mass = Some(typed(value)?),
        CanonicalField::MonoisotopicMass => identity.monoisotopic_mass = Some(typed(value)?),
        CanonicalField::IupacNames => identity.iupac_names = typed(value)?,
        CanonicalField::Synonyms => identity.synonyms = typed(value)?,
        CanonicalField::Species => record.species = typed(value)?,
        CanonicalField::DatabaseLinks => record.database_links = typed(value)?,
    }
    Ok(())
}

fn typed<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(value)
}

fn group_reactome(rows: &[ReactomeRow]) -> BTreeMap<String, Vec<ReactomePathway>> {
    let mut grouped: BTreeMap<String, Vec<ReactomePathway>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry(row.species.clone())
            .or_default()
            .push(row.to_pathway());
    }
    grouped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mistyped_chebi_value_leaves_field_untouched() {
        let mut own = CompoundRecord::new("15366".parse().unwrap());
        own.identity.mass = Some(60.05);
        let chebi = ChebiRecord::from_entity(&json!({
            "data": {"chemical_data": {"mass": "not a number", "charge": -1}}
        }));

        let record = RecordAssembler::assemble(own, Some(&chebi), None, None, None);
        assert_eq!(record.identity.mass, Some(60.05));
        assert_eq!(record.identity.charge, Some(-1));
    }

    #[test]
    fn present_chebi_value_overwrites() {
        let mut own = CompoundRecord::new("15366".parse().unwrap());
        own.identity.inchi = Some("X".to_string());
        let chebi = ChebiRecord::from_entity(&json!({
            "data": {"default_structure": {"standard_inchi": "InChI=1S/C2H4O2"}}
        }));

        let record = RecordAssembler::assemble(own, Some(&chebi), None, None, None);
        assert_eq!(record.identity.inchi.as_deref(), Some("InChI=1S/C2H4O2"));
    }
}
