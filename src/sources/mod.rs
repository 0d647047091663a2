//! Adapters for the external providers queried per compound.
//!
//! Each adapter implements [`SourceClient`]: one `fetch` that performs the
//! provider's HTTP calls and parses the response into a typed
//! [`SourcePayload`]. Failures come back as `Err`; the dispatcher turns
//! them into empty outcomes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::Endpoints;
use crate::domain::{CompoundId, SourceName};
use crate::error::BuilderError;
use crate::http::HttpSession;
use crate::record::{Citation, KeggPathway, MsSpectrum, Reaction, WikiPathway};

pub mod citations;
pub mod kegg;
pub mod reactions;
pub mod spectra;
pub mod structure;
pub mod wikipathways;

pub use spectra::PeakList;

pub trait SourceClient: Send + Sync {
    fn name(&self) -> SourceName;
    fn fetch(&self, request: &SourceRequest) -> Result<SourcePayload, BuilderError>;
}

/// Raised by the dispatcher when a compound's deadline passes. Sources with
/// several calls check it between requests.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a source may need to know about the compound being built.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub compound_id: CompoundId,
    pub inchi_key: Option<String>,
    pub citations: Vec<Citation>,
    pub cancel: CancelFlag,
}

impl SourceRequest {
    pub fn new(compound_id: CompoundId) -> Self {
        Self {
            compound_id,
            inchi_key: None,
            citations: Vec::new(),
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_inchi_key(mut self, inchi_key: Option<String>) -> Self {
        self.inchi_key = inchi_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    pub fn require_inchi_key(&self, provider: SourceName) -> Result<&str, BuilderError> {
        self.inchi_key
            .as_deref()
            .ok_or(BuilderError::MissingKey {
                provider,
                key: "an InChIKey",
            })
    }

    pub fn check_cancelled(&self, provider: SourceName) -> Result<(), BuilderError> {
        if self.cancel.is_cancelled() {
            return Err(BuilderError::Cancelled(provider));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructurePayload {
    pub molfile: Option<String>,
    pub inchi: Option<String>,
    pub mass: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectraPayload {
    pub spectra: Vec<MsSpectrum>,
    pub peak_lists: Vec<PeakList>,
}

/// Parsed result of one source. The variant always matches the source that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Structure(StructurePayload),
    WikiPathways(BTreeMap<String, Vec<WikiPathway>>),
    KeggPathways(Vec<KeggPathway>),
    Citations(Vec<Citation>),
    Reactions(Vec<Reaction>),
    Spectra(SpectraPayload),
}

impl SourcePayload {
    pub fn empty(source: SourceName) -> Self {
        match source {
            SourceName::Structure => SourcePayload::Structure(StructurePayload::default()),
            SourceName::Wikipathways => SourcePayload::WikiPathways(BTreeMap::new()),
            SourceName::Kegg => SourcePayload::KeggPathways(Vec::new()),
            SourceName::Citations => SourcePayload::Citations(Vec::new()),
            SourceName::Reactions => SourcePayload::Reactions(Vec::new()),
            SourceName::Spectra => SourcePayload::Spectra(SpectraPayload::default()),
        }
    }

    pub fn source(&self) -> SourceName {
        match self {
            SourcePayload::Structure(_) => SourceName::Structure,
            SourcePayload::WikiPathways(_) => SourceName::Wikipathways,
            SourcePayload::KeggPathways(_) => SourceName::Kegg,
            SourcePayload::Citations(_) => SourceName::Citations,
            SourcePayload::Reactions(_) => SourceName::Reactions,
            SourcePayload::Spectra(_) => SourceName::Spectra,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SourcePayload::Structure(payload) => {
                payload.molfile.is_none() && payload.inchi.is_none() && payload.mass.is_none()
            }
            SourcePayload::WikiPathways(pathways) => pathways.is_empty(),
            SourcePayload::KeggPathways(pathways) => pathways.is_empty(),
            SourcePayload::Citations(citations) => citations.is_empty(),
            SourcePayload::Reactions(reactions) => reactions.is_empty(),
            SourcePayload::Spectra(payload) => payload.spectra.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Fetched,
    Disabled,
    Failed(String),
    TimedOut,
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Fetched => "fetched",
            OutcomeStatus::Disabled => "disabled",
            OutcomeStatus::Failed(_) => "failed",
            OutcomeStatus::TimedOut => "timed_out",
        }
    }
}

/// What one source contributed for one compound.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutcome {
    source: SourceName,
    payload: SourcePayload,
    status: OutcomeStatus,
    elapsed: Duration,
}

impl SourceOutcome {
    /// Wraps a fetched payload. A payload of the wrong variant is replaced by
    /// the source's empty payload.
    pub fn fetched(source: SourceName, payload: SourcePayload, elapsed: Duration) -> Self {
        if payload.source() != source {
            tracing::warn!(
                %source,
                payload = %payload.source(),
                "payload does not belong to its source, treating as empty"
            );
            return Self::failed(source, "mismatched payload", elapsed);
        }
        Self {
            source,
            payload,
            status: OutcomeStatus::Fetched,
            elapsed,
        }
    }

    pub fn from_result(
        source: SourceName,
        result: Result<SourcePayload, BuilderError>,
        elapsed: Duration,
    ) -> Self {
        match result {
            Ok(payload) => Self::fetched(source, payload, elapsed),
            Err(err) => {
                tracing::warn!(%source, error = %err, "source failed, using empty result");
                Self::failed(source, err.to_string(), elapsed)
            }
        }
    }

    pub fn disabled(source: SourceName) -> Self {
        Self {
            source,
            payload: SourcePayload::empty(source),
            status: OutcomeStatus::Disabled,
            elapsed: Duration::ZERO,
        }
    }

    pub fn failed(source: SourceName, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            source,
            payload: SourcePayload::empty(source),
            status: OutcomeStatus::Failed(reason.into()),
            elapsed,
        }
    }

    pub fn timed_out(source: SourceName, elapsed: Duration) -> Self {
        Self {
            source,
            payload: SourcePayload::empty(source),
            status: OutcomeStatus::TimedOut,
            elapsed,
        }
    }

    pub fn source(&self) -> SourceName {
        self.source
    }

    pub fn payload(&self) -> &SourcePayload {
        &self.payload
    }

    pub fn status(&self) -> &OutcomeStatus {
        &self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// The registered adapters, one per source name.
#[derive(Clone, Default)]
pub struct SourceSet {
    clients: BTreeMap<SourceName, Arc<dyn SourceClient>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six HTTP adapters, sharing one session.
    pub fn http(session: &HttpSession, endpoints: &Endpoints) -> Self {
        Self::new()
            .with(structure::CactusSource::new(session.clone(), &endpoints.cactus))
            .with(wikipathways::WikiPathwaysSource::new(
                session.clone(),
                &endpoints.wikipathways,
            ))
            .with(kegg::KeggSource::new(session.clone(), &endpoints.kegg))
            .with(citations::EuropePmcSource::new(
                session.clone(),
                &endpoints.europe_pmc,
            ))
            .with(reactions::RheaSource::new(session.clone(), &endpoints.rhea))
            .with(spectra::MonaSource::new(session.clone(), &endpoints.mona))
    }

    pub fn with<C: SourceClient + 'static>(mut self, client: C) -> Self {
        self.clients.insert(client.name(), Arc::new(client));
        self
    }

    pub fn get(&self, source: SourceName) -> Option<Arc<dyn SourceClient>> {
        self.clients.get(&source).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_payload_matches_its_source() {
        for source in SourceName::ALL {
            let payload = SourcePayload::empty(source);
            assert_eq!(payload.source(), source);
            assert!(payload.is_empty());
        }
    }

    #[test]
    fn mismatched_payload_is_discarded() {
        let outcome = SourceOutcome::fetched(
            SourceName::Kegg,
            SourcePayload::Reactions(vec![Reaction {
                id: "RHEA:1".to_string(),
                name: "a = b".to_string(),
            }]),
            Duration::ZERO,
        );
        assert_eq!(outcome.payload(), &SourcePayload::empty(SourceName::Kegg));
        assert!(matches!(outcome.status(), OutcomeStatus::Failed(_)));
    }
}
