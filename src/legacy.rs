//! MetaboLights compound web service: the compound id listing and the
//! per-compound lookup whose NMR spectra end up in the record.

use serde_json::Value;

use crate::domain::CompoundId;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::{NmrSpectrum, SpectrumAttribute};

pub trait LegacyClient: Send + Sync {
    fn list_compound_ids(&self) -> Result<Vec<CompoundId>, BuilderError>;

    /// The `content` of the compound lookup, or `None` when the service has
    /// nothing for this id.
    fn fetch_compound(&self, id: &CompoundId) -> Result<Option<Value>, BuilderError>;
}

pub struct LegacyHttpClient {
    session: HttpSession,
    base_url: String,
}

impl LegacyHttpClient {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl LegacyClient for LegacyHttpClient {
    fn list_compound_ids(&self) -> Result<Vec<CompoundId>, BuilderError> {
        let url = format!("{}compounds/list", self.base_url);
        let raw = self.session.get_json(Upstream::Legacy, &url)?;
        let entries = raw
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| BuilderError::payload(Upstream::Legacy, "missing compound list"))?;

        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str().map(str::parse::<CompoundId>) {
                Some(Ok(id)) => ids.push(id),
                _ => tracing::warn!(entry = %entry, "skipping unparseable compound id"),
            }
        }
        Ok(ids)
    }

    fn fetch_compound(&self, id: &CompoundId) -> Result<Option<Value>, BuilderError> {
        let url = format!("{}compounds/{}", self.base_url, id.accession());
        let response = self.session.get(Upstream::Legacy, &url)?;
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        let raw: Value = HttpSession::handle_status(Upstream::Legacy, response)?
            .json()
            .map_err(|err| BuilderError::payload(Upstream::Legacy, err.to_string()))?;
        Ok(raw.get("content").filter(|value| !value.is_null()).cloned())
    }
}

/// NMR spectra listed under `mc.metSpectras` of a compound lookup. Entries
/// missing a required field are skipped.
pub fn nmr_spectra(content: &Value) -> Vec<NmrSpectrum> {
    let Some(spectra) = content
        .get("mc")
        .and_then(|mc| mc.get("metSpectras"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    spectra
        .iter()
        .filter(|spectrum| spectrum.get("spectraType").and_then(Value::as_str) == Some("NMR"))
        .filter_map(|spectrum| {
            let parsed = nmr_spectrum(spectrum);
            if parsed.is_none() {
                tracing::warn!(spectrum = ?spectrum.get("id"), "skipping malformed NMR spectrum");
            }
            parsed
        })
        .collect()
}

fn nmr_spectrum(spectrum: &Value) -> Option<NmrSpectrum> {
    let id = match spectrum.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let attributes = spectrum
        .get("attributes")?
        .as_array()?
        .iter()
        .map(|attribute| {
            let name = attribute
                .get("attributeDefinition")?
                .get("name")?
                .as_str()?
                .to_string();
            let value = match attribute.get("value")? {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            };
            Some(SpectrumAttribute {
                attribute_description: name.clone(),
                attribute_name: name,
                attribute_value: value,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    Some(NmrSpectrum {
        name: spectrum.get("name")?.as_str()?.to_string(),
        url: format!("http://www.ebi.ac.uk/metabolights/webservice/compounds/spectra/{id}/json"),
        path: spectrum.get("pathToJsonSpectra")?.as_str()?.to_string(),
        kind: "NMR".to_string(),
        id,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn keeps_only_well_formed_nmr_entries() {
        let content = json!({
            "mc": {"metSpectras": [
                {
                    "id": 1408, "name": "1H NMR acetic acid", "spectraType": "NMR",
                    "pathToJsonSpectra": "/nfs/spectra/1408.json",
                    "attributes": [{"attributeDefinition": {"name": "Temperature"}, "value": "25"}]
                },
                {"id": 77, "name": "MS run", "spectraType": "MS", "pathToJsonSpectra": "x", "attributes": []},
                {"id": 9, "spectraType": "NMR", "attributes": []}
            ]}
        });

        let spectra = nmr_spectra(&content);
        assert_eq!(spectra.len(), 1);
        let nmr = &spectra[0];
        assert_eq!(nmr.id, "1408");
        assert_eq!(
            nmr.url,
            "http://www.ebi.ac.uk/metabolights/webservice/compounds/spectra/1408/json"
        );
        assert_eq!(nmr.attributes[0].attribute_name, "Temperature");
        assert_eq!(nmr.attributes[0].attribute_value, "25");
    }

    #[test]
    fn lookup_without_mc_has_no_nmr() {
        assert!(nmr_spectra(&json!({"name": "x"})).is_empty());
    }
}
