use serde_json::Value;

use crate::domain::SourceName;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::Reaction;

use super::{SourceClient, SourcePayload, SourceRequest};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Reactions);

/// Rhea reaction search by ChEBI number, first ten hits.
pub struct RheaSource {
    session: HttpSession,
    base_url: String,
}

impl RheaSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl SourceClient for RheaSource {
    fn name(&self) -> SourceName {
        SourceName::Reactions
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let url = format!(
            "{}?query={}&columns=rhea-id,equation,chebi-id&format=json&limit=10",
            self.base_url,
            request.compound_id.chebi_number()
        );
        let raw = self.session.get_json(UPSTREAM, &url)?;
        Ok(SourcePayload::Reactions(parse_reactions(&raw)?))
    }
}

pub fn parse_reactions(raw: &Value) -> Result<Vec<Reaction>, BuilderError> {
    let results = raw
        .get("results")
        .and_then(|value| value.as_array())
        .ok_or_else(|| BuilderError::payload(UPSTREAM, "missing results list"))?;

    Ok(results
        .iter()
        .map(|result| Reaction {
            id: string_field(result, "id"),
            name: string_field(result, "equation"),
        })
        .collect())
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}
