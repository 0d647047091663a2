use std::io::Write;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use compound_library_builder::error::BuilderError;
use compound_library_builder::references::References;

const MAPPING: &str = r#"{"compound_mapping": {"CHEBI:15366": [{"study": "MTBLS1", "species": "Homo sapiens"}]}}"#;
const REACTOME: &str = r#"{"MTBLC15366": [{"pathway": "Ethanol oxidation", "pathwayId": "R-HSA-71384", "reactomeUrl": "https://reactome.org/content/detail/R-HSA-71384", "reactomeId": "R-HSA-71384", "species": "Homo sapiens"}]}"#;

fn ref_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

#[test]
fn loads_plain_json() {
    let (_dir, path) = ref_dir();
    std::fs::write(path.join("mapping.json"), MAPPING).unwrap();
    std::fs::write(path.join("reactome.json"), REACTOME).unwrap();

    let references = References::load(&path).unwrap();
    let id = "15366".parse().unwrap();
    assert_eq!(references.mapping.lookup(&id).unwrap().studies, vec!["MTBLS1"]);
    assert_eq!(references.reactome.slice(&id).unwrap().len(), 1);
}

#[test]
fn loads_gzipped_json() {
    let (_dir, path) = ref_dir();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(MAPPING.as_bytes()).unwrap();
    std::fs::write(path.join("mapping.json.gz"), encoder.finish().unwrap()).unwrap();
    std::fs::write(path.join("reactome.json"), REACTOME).unwrap();

    let references = References::load(&path).unwrap();
    assert_eq!(references.mapping.len(), 1);
}

#[test]
fn missing_file_is_a_reference_error() {
    let (_dir, path) = ref_dir();
    std::fs::write(path.join("mapping.json"), MAPPING).unwrap();

    let err = References::load(&path).unwrap_err();
    assert_matches!(err, BuilderError::Reference { .. });
}

#[test]
fn malformed_cache_is_a_reference_error() {
    let (_dir, path) = ref_dir();
    std::fs::write(path.join("mapping.json"), "[1, 2").unwrap();
    std::fs::write(path.join("reactome.json"), REACTOME).unwrap();

    let err = References::load(&path).unwrap_err();
    assert_matches!(err, BuilderError::Reference { .. });
}
