use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CompoundId, SourceName};
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::{MsSpectrum, SpectrumAttribute};
use crate::store::is_safe_component;

use super::{SourceClient, SourcePayload, SourceRequest, SpectraPayload};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Spectra);

/// MoNA spectra whose compound metadata carries the InChIKey.
pub struct MonaSource {
    session: HttpSession,
    base_url: String,
}

impl MonaSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }

    fn search_url(&self, inchi_key: &str) -> String {
        format!(
            "{}?query=exists(compound.metaData.name%3A'InChIKey'%20and%20compound.metaData.value%3A'{inchi_key}')",
            self.base_url
        )
    }
}

impl SourceClient for MonaSource {
    fn name(&self) -> SourceName {
        SourceName::Spectra
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let inchi_key = request.require_inchi_key(SourceName::Spectra)?;
        let response = self.session.get(UPSTREAM, &self.search_url(inchi_key))?;
        let status = response.status().as_u16();
        if !(200..=203).contains(&status) {
            tracing::debug!(status, compound = %request.compound_id, "no MoNA spectra");
            return Ok(SourcePayload::Spectra(SpectraPayload::default()));
        }
        let raw: Value = response
            .json()
            .map_err(|err| BuilderError::payload(UPSTREAM, err.to_string()))?;
        Ok(SourcePayload::Spectra(parse_spectra(
            &request.compound_id,
            &raw,
        )?))
    }
}

/// Peaks of one mass spectrum, written next to the compound document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakList {
    pub spectrum_id: String,
    pub peaks: Vec<Peak>,
    pub mz_start: f64,
    pub mz_stop: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub intensity: f64,
    pub mz: f64,
}

/// Parses a MoNA `mz:intensity mz:intensity ...` string. Intensities are
/// rescaled by 9.99 and floored to six decimals. Unparseable points are
/// skipped; a spectrum with no usable point yields `None`.
pub fn parse_peaks(spectrum_id: &str, data: &str) -> Option<PeakList> {
    let peaks: Vec<Peak> = data
        .split_whitespace()
        .filter_map(|point| {
            let (mz, intensity) = point.split_once(':')?;
            let mz = mz.trim().parse::<f64>().ok()?;
            let intensity = intensity.trim().parse::<f64>().ok()?;
            Some(Peak {
                intensity: floor_to(intensity * 9.99, 6),
                mz,
            })
        })
        .collect();
    if peaks.is_empty() {
        return None;
    }
    let mz_start = peaks.iter().map(|peak| peak.mz).fold(f64::INFINITY, f64::min);
    let mz_stop = peaks
        .iter()
        .map(|peak| peak.mz)
        .fold(f64::NEG_INFINITY, f64::max);
    Some(PeakList {
        spectrum_id: spectrum_id.to_string(),
        peaks,
        mz_start,
        mz_stop,
    })
}

fn floor_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).floor() / scale
}

pub fn parse_spectra(compound_id: &CompoundId, raw: &Value) -> Result<SpectraPayload, BuilderError> {
    let items = raw
        .as_array()
        .ok_or_else(|| BuilderError::payload(UPSTREAM, "expected a list of spectra"))?;

    let mut payload = SpectraPayload::default();
    for item in items {
        let Some(id) = item.get("id").map(scalar_to_string) else {
            tracing::debug!("skipping MoNA spectrum without id");
            continue;
        };
        if !is_safe_component(&id) {
            tracing::warn!(compound = %compound_id, spectrum = %id, "skipping MoNA spectrum with unusable id");
            continue;
        }
        payload.spectra.push(MsSpectrum {
            splash: item.get("splash").cloned().unwrap_or(Value::Null),
            kind: "MS".to_string(),
            name: id.clone(),
            url: format!(
                "/metabolights/webservice/beta/spectra/{}/{id}",
                compound_id.accession()
            ),
            submitter: submitter_line(item.get("submitter")),
            attributes: recorded_attributes(item.get("metaData")),
        });
        if let Some(peaks) = item
            .get("spectrum")
            .and_then(|value| value.as_str())
            .and_then(|data| parse_peaks(&id, data))
        {
            payload.peak_lists.push(peaks);
        }
    }
    Ok(payload)
}

fn submitter_line(submitter: Option<&Value>) -> String {
    let field = |key: &str| {
        submitter
            .and_then(|value| value.get(key))
            .map(scalar_to_string)
            .unwrap_or_default()
    };
    format!(
        "{}  {} ; {} ; {}",
        field("firstName"),
        field("lastName"),
        field("emailAddress"),
        field("institution")
    )
}

/// Submitter-provided metadata only; MoNA's computed entries are left out.
fn recorded_attributes(metadata: Option<&Value>) -> Vec<SpectrumAttribute> {
    metadata
        .and_then(|value| value.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| {
                    !entry
                        .get("computed")
                        .and_then(|value| value.as_bool())
                        .unwrap_or(false)
                })
                .map(|entry| SpectrumAttribute {
                    attribute_name: entry.get("name").map(scalar_to_string).unwrap_or_default(),
                    attribute_value: entry.get("value").map(scalar_to_string).unwrap_or_default(),
                    attribute_description: String::new(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn peaks_are_rescaled_and_bounded() {
        let peaks = parse_peaks("MoNA001", "43.018:100 60.021:12.5 bad 15.0:1").unwrap();
        assert_eq!(peaks.peaks.len(), 3);
        assert_eq!(peaks.peaks[0].intensity, 999.0);
        assert_eq!(peaks.peaks[1].intensity, 124.875);
        assert_eq!(peaks.mz_start, 15.0);
        assert_eq!(peaks.mz_stop, 60.021);
        assert!(parse_peaks("x", "").is_none());
    }

    #[test]
    fn parses_mona_search_result() {
        let id: CompoundId = "MTBLC15366".parse().unwrap();
        let raw = json!([{
            "id": "KO000001",
            "splash": {"splash": "splash10-0002-900000000-abc"},
            "submitter": {"firstName": "Ann", "lastName": "Lee", "emailAddress": "ann@example.org", "institution": "EBI"},
            "metaData": [
                {"name": "ionization", "value": "ESI", "computed": false},
                {"name": "exact mass", "value": 60.02, "computed": true},
                {"name": "collision energy", "value": 20}
            ],
            "spectrum": "43.018:100 60.021:12.5"
        }]);

        let payload = parse_spectra(&id, &raw).unwrap();
        assert_eq!(payload.spectra.len(), 1);
        let spectrum = &payload.spectra[0];
        assert_eq!(spectrum.name, "KO000001");
        assert_eq!(
            spectrum.url,
            "/metabolights/webservice/beta/spectra/MTBLC15366/KO000001"
        );
        assert_eq!(spectrum.submitter, "Ann  Lee ; ann@example.org ; EBI");
        assert_eq!(spectrum.attributes.len(), 2);
        assert_eq!(spectrum.attributes[1].attribute_value, "20");
        assert_eq!(payload.peak_lists[0].spectrum_id, "KO000001");
    }

    #[test]
    fn spectrum_ids_that_are_not_plain_names_are_skipped() {
        let id: CompoundId = "MTBLC15366".parse().unwrap();
        let raw = json!([
            {"id": "../../../escaped", "spectrum": "43.018:100"},
            {"id": "..", "spectrum": "43.018:100"},
            {"id": "KO000002", "spectrum": "43.018:100"}
        ]);

        let payload = parse_spectra(&id, &raw).unwrap();
        assert_eq!(payload.spectra.len(), 1);
        assert_eq!(payload.peak_lists.len(), 1);
        assert_eq!(payload.peak_lists[0].spectrum_id, "KO000002");
    }

    #[test]
    fn non_list_payload_is_an_error() {
        let id: CompoundId = "15366".parse().unwrap();
        assert!(parse_spectra(&id, &json!({"error": "x"})).is_err());
    }
}
