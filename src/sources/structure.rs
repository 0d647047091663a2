use crate::domain::SourceName;
use crate::error::{BuilderError, Upstream};
use crate::http::HttpSession;

use super::{SourceClient, SourcePayload, SourceRequest, StructurePayload};

const UPSTREAM: Upstream = Upstream::Source(SourceName::Structure);

/// NCI Cactus chemical identifier resolver, queried by InChIKey.
pub struct CactusSource {
    session: HttpSession,
    base_url: String,
}

impl CactusSource {
    pub fn new(session: HttpSession, base_url: &str) -> Self {
        Self {
            session,
            base_url: base_url.to_string(),
        }
    }

    fn representation_url(&self, inchi_key: &str, representation: &str) -> String {
        format!("{}{inchi_key}/{representation}", self.base_url)
    }
}

impl SourceClient for CactusSource {
    fn name(&self) -> SourceName {
        SourceName::Structure
    }

    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError> {
        let inchi_key = request.require_inchi_key(SourceName::Structure)?;

        let molfile = self
            .session
            .get_text(UPSTREAM, &self.representation_url(inchi_key, "sdf"))?;
        let molfile = Some(molfile).filter(|text| !text.trim().is_empty());

        // The molfile is the primary product; the two lookups below only
        // backfill identity fields ChEBI may lack.
        request.check_cancelled(SourceName::Structure)?;
        let inchi = match self
            .session
            .get_text(UPSTREAM, &self.representation_url(inchi_key, "stdinchi"))
        {
            Ok(text) => parse_inchi(&text),
            Err(err) => {
                tracing::debug!(error = %err, "cactus stdinchi lookup failed");
                None
            }
        };
        request.check_cancelled(SourceName::Structure)?;
        let mass = match self
            .session
            .get_text(UPSTREAM, &self.representation_url(inchi_key, "mw"))
        {
            Ok(text) => parse_mass(&text),
            Err(err) => {
                tracing::debug!(error = %err, "cactus mw lookup failed");
                None
            }
        };

        Ok(SourcePayload::Structure(StructurePayload {
            molfile,
            inchi,
            mass,
        }))
    }
}

fn parse_inchi(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| line.starts_with("InChI="))
        .map(|line| line.to_string())
}

fn parse_mass(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|mass| *mass > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inchi_and_mass_responses() {
        assert_eq!(
            parse_inchi("InChI=1S/C2H4O2/c1-2(3)4/h1H3,(H,3,4)\n").as_deref(),
            Some("InChI=1S/C2H4O2/c1-2(3)4/h1H3,(H,3,4)")
        );
        assert_eq!(parse_inchi("<html>Page not found</html>"), None);
        assert_eq!(parse_mass("60.0520\n"), Some(60.052));
        assert_eq!(parse_mass("n/a"), None);
    }
}
