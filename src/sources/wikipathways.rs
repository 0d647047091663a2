use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::SourceName;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::WikiPathway;

use super::{SourceClient, SourcePayload, SourceRequest};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Wikipathways);

/// WikiPathways cross-reference search, by ChEBI number (`Ce` system code).
pub struct WikiPathwaysSource {
    session: HttpSession,
    base_url: String,
}

impl WikiPathwaysSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl SourceClient for WikiPathwaysSource {
    fn name(&self) -> SourceName {
        SourceName::Wikipathways
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let url = format!(
            "{}?ids={}&codes=Ce&format=json",
            self.base_url,
            request.compound_id.chebi_number()
        );
        let raw = self.session.get_json(UPSTREAM, &url)?;
        Ok(SourcePayload::WikiPathways(group_by_species(&raw)?))
    }
}

/// Groups the `result` list by species, dropping repeated pathways.
pub fn group_by_species(raw: &Value) -> Result<BTreeMap<String, Vec<WikiPathway>>, BuilderError> {
    let results = raw
        .get("result")
        .and_then(|value| value.as_array())
        .ok_or_else(|| BuilderError::payload(UPSTREAM, "missing result list"))?;

    let mut grouped: BTreeMap<String, Vec<WikiPathway>> = BTreeMap::new();
    for item in results {
        let field = |key: &str| item.get(key).and_then(|value| value.as_str());
        let (Some(species), Some(id), Some(url), Some(name)) =
            (field("species"), field("id"), field("url"), field("name"))
        else {
            tracing::debug!(?item, "skipping incomplete wikipathways entry");
            continue;
        };
        let pathway = WikiPathway {
            id: id.to_string(),
            url: url.to_string(),
            name: name.to_string(),
        };
        let entries = grouped.entry(species.to_string()).or_default();
        if !entries.contains(&pathway) {
            entries.push(pathway);
        }
    }
    Ok(grouped)
}
