use serde_json::Value;

use crate::domain::SourceName;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::Citation;

use super::{SourceClient, SourcePayload, SourceRequest};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Citations);

/// Europe PMC core search. Enriches the citations ChEBI lists for the
/// compound; a citation Europe PMC cannot resolve is dropped.
pub struct EuropePmcSource {
    session: HttpSession,
    base_url: String,
}

impl EuropePmcSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl SourceClient for EuropePmcSource {
    fn name(&self) -> SourceName {
        SourceName::Citations
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let mut enriched = Vec::with_capacity(request.citations.len());
        for citation in request.citations.iter().filter(|citation| is_searchable(citation)) {
            request.check_cancelled(SourceName::Citations)?;
            let query = [
                ("query", citation.value.as_str()),
                ("format", "json"),
                ("resultType", "core"),
            ];
            let raw = match self.session.get_json_query(UPSTREAM, &self.base_url, &query) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::warn!(citation = %citation.value, error = %err, "no Europe PMC response");
                    continue;
                }
            };
            match enrich(citation, &raw) {
                Some(citation) => enriched.push(citation),
                None => tracing::debug!(citation = %citation.value, "Europe PMC has no match"),
            }
        }
        Ok(SourcePayload::Citations(enriched))
    }
}

/// ChEBI fills a missing accession with `N/A`; searching for that would
/// attach whatever Europe PMC ranks first.
pub fn is_searchable(citation: &Citation) -> bool {
    let value = citation.value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("N/A")
}

/// Copies title, DOI, abstract and author string from the first search hit.
pub fn enrich(seed: &Citation, raw: &Value) -> Option<Citation> {
    let hit = raw
        .get("resultList")
        .and_then(|value| value.get("result"))
        .and_then(|value| value.as_array())
        .and_then(|results| results.first())?;
    let text = |key: &str| hit.get(key).and_then(|value| value.as_str()).map(str::to_string);

    Some(Citation {
        title: text("title"),
        doi: text("doi"),
        abstract_text: text("abstractText"),
        author: text("authorString"),
        ..seed.clone()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn enriches_from_first_hit() {
        let seed = Citation::seed("PubMed citation", "CITATION", "16287919");
        let raw = json!({
            "resultList": {"result": [
                {"title": "Acetate metabolism", "doi": "10.1000/x", "authorString": "Doe J."},
                {"title": "ignored"}
            ]}
        });
        let citation = enrich(&seed, &raw).unwrap();
        assert_eq!(citation.value, "16287919");
        assert_eq!(citation.title.as_deref(), Some("Acetate metabolism"));
        assert_eq!(citation.author.as_deref(), Some("Doe J."));
        assert_eq!(citation.abstract_text, None);
    }

    #[test]
    fn placeholder_accessions_are_not_searched() {
        assert!(is_searchable(&Citation::seed("PubMed citation", "CITATION", "16287919")));
        assert!(!is_searchable(&Citation::seed("N/A", "CITATION", "N/A")));
        assert!(!is_searchable(&Citation::seed("PubMed citation", "CITATION", " ")));
    }

    #[test]
    fn empty_result_list_drops_citation() {
        let seed = Citation::seed("PubMed citation", "CITATION", "1");
        assert!(enrich(&seed, &json!({"resultList": {"result": []}})).is_none());
    }
}
