use crate::domain::SourceName;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;
use crate::record::KeggPathway;

use super::{SourceClient, SourcePayload, SourceRequest};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Kegg);

/// KEGG REST: ChEBI → KEGG compound, compound → pathway ids, then one
/// flat-file fetch per pathway.
pub struct KeggSource {
    session: HttpSession,
    base_url: String,
}

impl KeggSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }
}

impl SourceClient for KeggSource {
    fn name(&self) -> SourceName {
        SourceName::Kegg
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let conv_url = format!(
            "{}conv/compound/chebi:{}",
            self.base_url,
            request.compound_id.chebi_number()
        );
        let conv = self.session.get_text(UPSTREAM, &conv_url)?;
        let Some(kegg_id) = second_column(conv.lines().next().unwrap_or_default()) else {
            tracing::debug!(compound = %request.compound_id, "no KEGG compound for this ChEBI id");
            return Ok(SourcePayload::KeggPathways(Vec::new()));
        };

        request.check_cancelled(SourceName::Kegg)?;
        let links_url = format!("{}link/pathway/{kegg_id}", self.base_url);
        let links = self.session.get_text(UPSTREAM, &links_url)?;

        let mut pathways = Vec::new();
        for pathway_id in parse_pathway_links(&links) {
            request.check_cancelled(SourceName::Kegg)?;
            let url = format!("{}get/{pathway_id}", self.base_url);
            match self.session.get_text(UPSTREAM, &url) {
                Ok(flat_file) => pathways.push(parse_pathway(&pathway_id, &flat_file)),
                Err(err) => {
                    tracing::warn!(pathway = %pathway_id, error = %err, "skipping KEGG pathway");
                }
            }
        }
        Ok(SourcePayload::KeggPathways(pathways))
    }
}

fn second_column(line: &str) -> Option<String> {
    line.split('\t')
        .nth(1)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// Pathway ids from a `link/pathway` response (`cpd:C00033\tpath:map00010`).
pub fn parse_pathway_links(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(second_column)
        .collect()
}

/// Picks NAME, DESCRIPTION and KO_PATHWAY out of a KEGG flat file.
pub fn parse_pathway(id: &str, flat_file: &str) -> KeggPathway {
    let mut pathway = KeggPathway {
        id: id.to_string(),
        ..KeggPathway::default()
    };
    for line in flat_file.lines() {
        let Some((keyword, rest)) = split_keyword(line) else {
            continue;
        };
        let value = Some(rest.to_string());
        match keyword {
            "NAME" => pathway.name = value,
            "DESCRIPTION" => pathway.description = value,
            "KO_PATHWAY" => pathway.ko_pathways = value,
            _ => {}
        }
    }
    pathway
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (keyword, rest) = line.split_once(char::is_whitespace)?;
    Some((keyword, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_response() {
        let links = "cpd:C00033\tpath:map00010\ncpd:C00033\tpath:map00620\n\n";
        assert_eq!(
            parse_pathway_links(links),
            vec!["path:map00010".to_string(), "path:map00620".to_string()]
        );
        assert!(parse_pathway_links("\n").is_empty());
    }

    #[test]
    fn parses_pathway_flat_file() {
        let flat = "ENTRY       map00010                    Pathway\n\
                    NAME        Glycolysis / Gluconeogenesis\n\
                    DESCRIPTION Glycolysis is the process of converting glucose into pyruvate\n\
                    \x20           and generating small amounts of ATP.\n\
                    KO_PATHWAY  ko00010\n\
                    ///\n";
        let pathway = parse_pathway("path:map00010", flat);
        assert_eq!(pathway.name.as_deref(), Some("Glycolysis / Gluconeogenesis"));
        assert_eq!(pathway.ko_pathways.as_deref(), Some("ko00010"));
        assert!(
            pathway
                .description
                .as_deref()
                .unwrap()
                .starts_with("Glycolysis is the process")
        );
    }

    #[test]
    fn conv_without_match_has_no_second_column() {
        assert_eq!(second_column(""), None);
        assert_eq!(
            second_column("chebi:15366\tcpd:C00033").as_deref(),
            Some("cpd:C00033")
        );
    }
}
