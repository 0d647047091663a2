//! Folds source outcomes into the working record.
//!
//! Each payload variant has one handler that owns a disjoint set of record
//! fields and overwrites them wholesale. Outcome order therefore does not
//! matter, and integrating the same outcome twice leaves the record as is.

use crate::record::CompoundRecord;
use crate::sources::{SourceOutcome, SourcePayload, SpectraPayload, StructurePayload};

pub struct ResultSorter;

impl ResultSorter {
    pub fn integrate(mut record: CompoundRecord, outcomes: &[SourceOutcome]) -> CompoundRecord {
        for outcome in outcomes {
            let populated = Self::apply(&mut record, outcome.payload());
            tracing::debug!(
                compound = %record.id,
                source = %outcome.source(),
                status = outcome.status().label(),
                populated,
                "integrated source outcome"
            );
        }
        record
    }

    /// Writes the fields owned by the payload's source. Returns whether the
    /// payload contributed anything.
    fn apply(record: &mut CompoundRecord, payload: &SourcePayload) -> bool {
        match payload {
            SourcePayload::Structure(structure) => apply_structure(record, structure),
            SourcePayload::WikiPathways(pathways) => {
                record.pathways.wiki = pathways.clone();
                !pathways.is_empty()
            }
            SourcePayload::KeggPathways(pathways) => {
                record.pathways.kegg = pathways.clone();
                !pathways.is_empty()
            }
            SourcePayload::Citations(citations) => {
                record.citations = citations.clone();
                !citations.is_empty()
            }
            SourcePayload::Reactions(reactions) => {
                record.reactions = reactions.clone();
                !reactions.is_empty()
            }
            SourcePayload::Spectra(spectra) => apply_spectra(record, spectra),
        }
    }
}

fn apply_structure(record: &mut CompoundRecord, structure: &StructurePayload) -> bool {
    record.structure = structure.molfile.clone();
    if record.identity.inchi.is_none() {
        record.identity.inchi = structure.inchi.clone();
    }
    if record.identity.mass.is_none() {
        record.identity.mass = structure.mass;
    }
    structure.molfile.is_some() || structure.inchi.is_some() || structure.mass.is_some()
}

// Only the MS half of the spectra group comes from a source; NMR is attached
// by the assembler from the legacy lookup.
fn apply_spectra(record: &mut CompoundRecord, spectra: &SpectraPayload) -> bool {
    record.spectra.ms = spectra.spectra.clone();
    !spectra.spectra.is_empty()
}
