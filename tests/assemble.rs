use std::time::Duration;

use serde_json::json;

use compound_library_builder::assemble::RecordAssembler;
use compound_library_builder::chebi::ChebiRecord;
use compound_library_builder::domain::{CompoundId, SourceName};
use compound_library_builder::record::{CompoundRecord, PresenceFlags};
use compound_library_builder::references::{MappingIndex, ReactomeCache};
use compound_library_builder::sorter::ResultSorter;
use compound_library_builder::sources::{SourceOutcome, SourcePayload, StructurePayload};

fn id() -> CompoundId {
    "15366".parse().unwrap()
}

fn mapping() -> MappingIndex {
    serde_json::from_value(json!({
        "compound_mapping": {
            "CHEBI:15366": [
                {"study": "MTBLS2", "species": "Homo sapiens", "mafEntry": "m_2.tsv", "assay": "a_2.txt"},
                {"study": "MTBLS1", "species": "Arabidopsis thaliana"}
            ]
        }
    }))
    .unwrap()
}

fn reactome() -> ReactomeCache {
    serde_json::from_value(json!({
        "MTBLC15366": [
            {"pathway": "Ethanol oxidation", "pathwayId": "R-HSA-71384",
             "reactomeUrl": "https://reactome.org/content/detail/R-HSA-71384",
             "reactomeId": "R-HSA-71384", "species": "Homo sapiens"},
            {"pathway": "Ethanol oxidation", "pathwayId": "R-MMU-71384",
             "reactomeUrl": "https://reactome.org/content/detail/R-MMU-71384",
             "reactomeId": "R-MMU-71384", "species": "Mus musculus"}
        ]
    }))
    .unwrap()
}

fn chebi() -> ChebiRecord {
    ChebiRecord::from_entity(&json!({
        "data": {
            "ascii_name": "acetic acid",
            "default_structure": {"standard_inchi_key": "QTBSBXVTEAMEQO-UHFFFAOYSA-N"},
            "chemical_data": {"formula": "C2H4O2", "charge": 0},
            "names": {"SYNONYM": [{"name": "ethanoic acid"}]},
            "compound_origins": [{"species_text": "Homo sapiens", "species_accession": "NCBI:txid9606"}]
        }
    }))
}

fn legacy() -> serde_json::Value {
    json!({
        "mc": {"metSpectras": [{
            "id": 1408, "name": "1H NMR", "spectraType": "NMR",
            "pathToJsonSpectra": "/spectra/1408.json", "attributes": []
        }]}
    })
}

fn structure_only_outcomes() -> Vec<SourceOutcome> {
    SourceName::ALL
        .into_iter()
        .map(|source| match source {
            SourceName::Structure => SourceOutcome::fetched(
                source,
                SourcePayload::Structure(StructurePayload {
                    molfile: None,
                    inchi: Some("X".to_string()),
                    mass: Some(60.05),
                }),
                Duration::from_millis(1),
            ),
            other => SourceOutcome::disabled(other),
        })
        .collect()
}

#[test]
fn structure_only_compound() {
    let own = ResultSorter::integrate(CompoundRecord::new(id()), &structure_only_outcomes());
    let record = RecordAssembler::assemble(own, None, None, None, None);

    assert_eq!(record.identity.inchi.as_deref(), Some("X"));
    assert_eq!(record.identity.mass, Some(60.05));
    assert!(record.citations.is_empty());
    assert!(record.reactions.is_empty());
    assert!(record.species.is_empty());
    assert!(record.pathways.is_empty());
    assert!(record.spectra.nmr.is_empty() && record.spectra.ms.is_empty());
    assert_eq!(record.flags, PresenceFlags::default());
}

#[test]
fn absent_lookups_contribute_empty_groups() {
    let other: CompoundId = "MTBLC99999".parse().unwrap();
    let mapping = mapping();
    let reactome = reactome();

    let record = RecordAssembler::assemble(
        CompoundRecord::new(other.clone()),
        None,
        mapping.lookup(&other).as_ref(),
        reactome.slice(&other),
        None,
    );

    assert!(record.studies.is_empty());
    assert!(record.species.is_empty());
    assert!(record.pathways.reactome.is_empty());
    assert!(record.spectra.nmr.is_empty());
    assert!(!record.flags.has_species);
    assert!(!record.flags.has_pathways);
    assert!(!record.flags.has_nmr);
}

#[test]
fn merges_every_lookup() {
    let mapping = mapping();
    let reactome = reactome();
    let chebi = chebi();
    let legacy = legacy();

    let record = RecordAssembler::assemble(
        CompoundRecord::new(id()),
        Some(&chebi),
        mapping.lookup(&id()).as_ref(),
        reactome.slice(&id()),
        Some(&legacy),
    );

    assert_eq!(record.identity.name.as_deref(), Some("acetic acid"));
    assert_eq!(record.identity.formula.as_deref(), Some("C2H4O2"));
    assert_eq!(record.identity.charge, Some(0));
    assert_eq!(record.identity.synonyms, vec!["ethanoic acid".to_string()]);
    assert_eq!(
        record.identity.inchi_key.as_deref(),
        Some("QTBSBXVTEAMEQO-UHFFFAOYSA-N")
    );

    // ChEBI origin first, then the mapping row.
    let human = &record.species["homo sapiens"];
    assert_eq!(human.len(), 2);
    assert_eq!(human[0].species_accession.as_deref(), Some("NCBI:txid9606"));
    assert_eq!(human[1].species_accession.as_deref(), Some("MTBLS2"));
    assert_eq!(human[1].maf_entry.as_deref(), Some("m_2.tsv"));
    assert!(record.species.contains_key("arabidopsis thaliana"));
    assert_eq!(record.studies, vec!["MTBLS1".to_string(), "MTBLS2".to_string()]);

    assert_eq!(record.pathways.reactome.len(), 2);
    assert_eq!(record.pathways.reactome["Mus musculus"][0].pathway_id, "R-MMU-71384");
    assert_eq!(record.spectra.nmr.len(), 1);

    assert!(record.flags.has_species);
    assert!(record.flags.has_pathways);
    assert!(record.flags.has_nmr);
    assert!(!record.flags.has_ms);
    assert!(!record.flags.has_literature);
}

#[test]
fn assembling_twice_is_byte_identical() {
    let mapping = mapping();
    let reactome = reactome();
    let chebi = chebi();
    let legacy = legacy();
    let own = ResultSorter::integrate(CompoundRecord::new(id()), &structure_only_outcomes());

    let assemble = || {
        let record = RecordAssembler::assemble(
            own.clone(),
            Some(&chebi),
            mapping.lookup(&id()).as_ref(),
            reactome.slice(&id()),
            Some(&legacy),
        );
        serde_json::to_vec_pretty(&record).unwrap()
    };
    assert_eq!(assemble(), assemble());
}
