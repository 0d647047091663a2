use std::fs;
use std::io::Write;
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;
use tempfile::Builder;

use crate::domain::CompoundId;
use crate::error::BuilderError;
use crate::record::CompoundRecord;
use crate::sources::PeakList;

pub const COMPOUND_FILE: &str = "compound.json";

static PATH_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// Whether `name` can be used as a single directory or file name under the
/// destination without escaping it.
pub fn is_safe_component(name: &str) -> bool {
    PATH_COMPONENT.is_match(name) && name != "." && name != ".."
}

/// Output layout under the destination directory:
///
/// ```text
/// <destination>/MTBLC15366/compound.json
/// <destination>/MTBLC15366/MTBLC15366_spectrum/<spectrum id>/<spectrum id>.json
/// ```
#[derive(Debug, Clone)]
pub struct Store {
    destination: Utf8PathBuf,
}

impl Store {
    pub fn new(destination: Utf8PathBuf) -> Self {
        Self { destination }
    }

    pub fn destination(&self) -> &Utf8Path {
        &self.destination
    }

    pub fn ensure_destination(&self) -> Result<(), BuilderError> {
        fs::create_dir_all(self.destination.as_std_path())
            .map_err(|err| BuilderError::Filesystem(err.to_string()))
    }

    pub fn compound_dir(&self, id: &CompoundId) -> Utf8PathBuf {
        self.destination.join(id.accession())
    }

    pub fn compound_path(&self, id: &CompoundId) -> Utf8PathBuf {
        self.compound_dir(id).join(COMPOUND_FILE)
    }

    pub fn spectrum_dir(&self, id: &CompoundId) -> Utf8PathBuf {
        self.compound_dir(id)
            .join(format!("{}_spectrum", id.accession()))
    }

    pub fn spectrum_path(&self, id: &CompoundId, spectrum_id: &str) -> Utf8PathBuf {
        self.spectrum_dir(id)
            .join(spectrum_id)
            .join(format!("{spectrum_id}.json"))
    }

    /// Replaces the compound document atomically; a rerun with the same
    /// record produces the same bytes.
    pub fn write_compound(&self, record: &CompoundRecord) -> Result<Utf8PathBuf, BuilderError> {
        let path = self.compound_path(&record.id);
        Self::write_json_atomic(&path, record)?;
        Ok(path)
    }

    pub fn read_compound(&self, id: &CompoundId) -> Result<CompoundRecord, BuilderError> {
        let path = self.compound_path(id);
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| BuilderError::Filesystem(format!("{path}: {err}")))?;
        serde_json::from_str(&content).map_err(|err| BuilderError::Serialize(err.to_string()))
    }

    pub fn write_spectrum(
        &self,
        id: &CompoundId,
        peaks: &PeakList,
    ) -> Result<Utf8PathBuf, BuilderError> {
        if !is_safe_component(&peaks.spectrum_id) {
            return Err(BuilderError::Filesystem(format!(
                "refusing to write spectrum with unsafe id {:?}",
                peaks.spectrum_id
            )));
        }
        let path = self.spectrum_path(id, &peaks.spectrum_id);
        Self::write_json_atomic(&path, peaks)?;
        Ok(path)
    }

    /// Removes peak lists left by an earlier run of this compound.
    pub fn clear_spectra(&self, id: &CompoundId) -> Result<(), BuilderError> {
        let dir = self.spectrum_dir(id);
        match fs::remove_dir_all(dir.as_std_path()) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(BuilderError::Filesystem(format!("{dir}: {err}"))),
        }
    }

    pub fn write_json_atomic<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), BuilderError> {
        let parent = path
            .parent()
            .ok_or_else(|| BuilderError::Filesystem(format!("{path} has no parent directory")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| BuilderError::Filesystem(err.to_string()))?;

        let mut content = serde_json::to_vec_pretty(value)
            .map_err(|err| BuilderError::Serialize(err.to_string()))?;
        content.push(b'\n');

        let mut temp = Builder::new()
            .prefix(".compound-builder")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| BuilderError::Filesystem(err.to_string()))?;
        temp.write_all(&content)
            .map_err(|err| BuilderError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| BuilderError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new(Utf8PathBuf::from("/data/compounds"));
        let id: CompoundId = "CHEBI:15366".parse().unwrap();

        assert_eq!(
            store.compound_path(&id),
            Utf8PathBuf::from("/data/compounds/MTBLC15366/compound.json")
        );
        assert!(
            store
                .spectrum_path(&id, "KO000001")
                .ends_with("MTBLC15366/MTBLC15366_spectrum/KO000001/KO000001.json")
        );
    }

    #[test]
    fn path_components_are_checked() {
        assert!(is_safe_component("KO000001"));
        assert!(is_safe_component("MoNA_12.v2-a"));
        assert!(!is_safe_component(".."));
        assert!(!is_safe_component("."));
        assert!(!is_safe_component(""));
        assert!(!is_safe_component("../../../escaped"));
        assert!(!is_safe_component("a/b"));
        assert!(!is_safe_component("a\\b"));
    }
}
