use assert_matches::assert_matches;

use compound_library_builder::domain::{CompoundId, SourceName};
use compound_library_builder::error::BuilderError;

#[test]
fn parse_compound_id_forms() {
    for raw in ["MTBLC15366", "CHEBI:15366", "15366", "mtblc015366", " chebi:15366 "] {
        let id: CompoundId = raw.parse().unwrap();
        assert_eq!(id.chebi_number(), "15366");
        assert_eq!(id.accession(), "MTBLC15366");
        assert_eq!(id.chebi_key(), "CHEBI:15366");
        assert_eq!(id.to_string(), "MTBLC15366");
    }
}

#[test]
fn parse_compound_id_invalid() {
    for raw in ["", "MTBLC", "CHEBI:abc", "MTBLS1", "0", "15366x"] {
        let err = raw.parse::<CompoundId>().unwrap_err();
        assert_matches!(err, BuilderError::InvalidCompoundId(_));
    }
}

#[test]
fn compound_id_serializes_as_accession() {
    let id: CompoundId = "CHEBI:16236".parse().unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"MTBLC16236\"");
    let back: CompoundId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn parse_source_names() {
    for source in SourceName::ALL {
        assert_eq!(source.as_str().parse::<SourceName>().unwrap(), source);
    }
    assert_eq!("KEGG".parse::<SourceName>().unwrap(), SourceName::Kegg);
    let err = "pubchem".parse::<SourceName>().unwrap_err();
    assert_matches!(err, BuilderError::InvalidSource(_));
}
