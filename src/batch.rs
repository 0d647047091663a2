use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::assemble::RecordAssembler;
use crate::chebi::{ChebiClient, ChebiRecord};
use crate::config::ResolvedConfig;
use crate::dispatch::TaskDispatcher;
use crate::domain::{CompoundId, SourceName};
use crate::error::BuilderError;
use crate::legacy::LegacyClient;
use crate::record::CompoundRecord;
use crate::references::References;
use crate::sorter::ResultSorter;
use crate::sources::{SourceOutcome, SourcePayload, SourceRequest};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub enabled: BTreeSet<SourceName>,
    pub chebi_batch_size: usize,
    pub verbose_outcomes: bool,
}

impl BatchOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            enabled: config.sources.enabled().clone(),
            chebi_batch_size: config.chebi_batch_size,
            verbose_outcomes: config.verbose_outcomes,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_ms: u128,
    pub total: usize,
    pub written: usize,
    pub failed: usize,
    pub items: Vec<CompoundResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompoundResult {
    pub id: String,
    pub action: String,
    pub path: Option<String>,
    pub spectrum_files: usize,
    pub spectrum_failures: usize,
    pub sources: BTreeMap<SourceName, String>,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

/// Builds compound documents one identifier at a time.
pub struct BatchRunner<C: ChebiClient, L: LegacyClient> {
    store: Store,
    dispatcher: TaskDispatcher,
    chebi: C,
    legacy: L,
    references: Arc<References>,
    options: BatchOptions,
}

impl<C: ChebiClient, L: LegacyClient> BatchRunner<C, L> {
    pub fn new(
        store: Store,
        dispatcher: TaskDispatcher,
        chebi: C,
        legacy: L,
        references: Arc<References>,
        options: BatchOptions,
    ) -> Self {
        Self {
            store,
            dispatcher,
            chebi,
            legacy,
            references,
            options,
        }
    }

    /// Processes every id. A failure for one id is logged and recorded in
    /// the summary; the run carries on with the next id.
    pub fn run(&self, ids: &[CompoundId], sink: &dyn ProgressSink) -> BatchSummary {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut items = Vec::with_capacity(ids.len());

        sink.event(ProgressEvent {
            message: format!(
                "phase=Resolve; {} compounds, {} workers",
                ids.len(),
                self.dispatcher.workers()
            ),
            elapsed: None,
        });

        for chunk in ids.chunks(self.options.chebi_batch_size.max(1)) {
            let entities = match self.chebi.fetch_entities(chunk) {
                Ok(entities) => entities,
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        chunk = chunk.len(),
                        "ChEBI lookup failed, building chunk without ChEBI data"
                    );
                    BTreeMap::new()
                }
            };

            for id in chunk {
                let compound_started = Instant::now();
                let entity = entities.get(&id.chebi_key());
                let result = match self.build_one(id, entity) {
                    Ok(mut result) => {
                        result.elapsed_ms = compound_started.elapsed().as_millis();
                        result
                    }
                    Err(err) => {
                        tracing::error!(compound = %id, error = %err, "compound build failed");
                        CompoundResult {
                            id: id.accession(),
                            action: "failed".to_string(),
                            path: None,
                            spectrum_files: 0,
                            spectrum_failures: 0,
                            sources: BTreeMap::new(),
                            error: Some(err.to_string()),
                            elapsed_ms: compound_started.elapsed().as_millis(),
                        }
                    }
                };
                tracing::info!(
                    compound = %id,
                    action = %result.action,
                    elapsed_ms = result.elapsed_ms as u64,
                    "compound processed"
                );
                sink.event(ProgressEvent {
                    message: format!("phase=Store; {} {}", result.id, result.action),
                    elapsed: Some(compound_started.elapsed()),
                });
                items.push(result);
            }
        }

        let written = items.iter().filter(|item| item.error.is_none()).count();
        let elapsed = started.elapsed();
        tracing::info!(
            total = items.len(),
            written,
            elapsed_secs = elapsed.as_secs_f64(),
            "batch finished"
        );
        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(elapsed),
        });

        BatchSummary {
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            elapsed_ms: elapsed.as_millis(),
            total: items.len(),
            written,
            failed: items.len() - written,
            items,
        }
    }

    pub fn build_one(
        &self,
        id: &CompoundId,
        entity: Option<&Value>,
    ) -> Result<CompoundResult, BuilderError> {
        let chebi = entity.map(ChebiRecord::from_entity);
        if chebi.is_none() {
            tracing::warn!(compound = %id, "no ChEBI entity, building without it");
        }
        let legacy = match self.legacy.fetch_compound(id) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(compound = %id, error = %err, "legacy lookup failed");
                None
            }
        };

        let request = SourceRequest::new(id.clone())
            .with_inchi_key(chebi.as_ref().and_then(ChebiRecord::inchi_key))
            .with_citations(
                chebi
                    .as_ref()
                    .map(ChebiRecord::citations)
                    .unwrap_or_default(),
            );
        let outcomes = self.dispatcher.run(Arc::new(request), &self.options.enabled);
        self.log_outcomes(id, &outcomes);

        let record = ResultSorter::integrate(CompoundRecord::new(id.clone()), &outcomes);
        let mapping = self.references.mapping.lookup(id);
        let record = RecordAssembler::assemble(
            record,
            chebi.as_ref(),
            mapping.as_ref(),
            self.references.reactome.slice(id),
            legacy.as_ref(),
        );

        let path = self.store.write_compound(&record)?;
        let (spectrum_files, spectrum_failures) = self.write_peak_lists(id, &outcomes);

        Ok(CompoundResult {
            id: id.accession(),
            action: "written".to_string(),
            path: Some(path.to_string()),
            spectrum_files,
            spectrum_failures,
            sources: outcomes
                .iter()
                .map(|outcome| (outcome.source(), outcome.status().label().to_string()))
                .collect(),
            error: None,
            elapsed_ms: 0,
        })
    }

    /// Replaces the compound's peak lists. The document is already on disk,
    /// so a peak list that cannot be written is logged and counted only.
    fn write_peak_lists(&self, id: &CompoundId, outcomes: &[SourceOutcome]) -> (usize, usize) {
        if let Err(err) = self.store.clear_spectra(id) {
            tracing::warn!(compound = %id, error = %err, "could not clear earlier peak lists");
        }
        let mut written = 0;
        let mut failed = 0;
        for outcome in outcomes {
            let SourcePayload::Spectra(spectra) = outcome.payload() else {
                continue;
            };
            for peaks in &spectra.peak_lists {
                match self.store.write_spectrum(id, peaks) {
                    Ok(_) => written += 1,
                    Err(err) => {
                        tracing::warn!(
                            compound = %id,
                            spectrum = %peaks.spectrum_id,
                            error = %err,
                            "peak list not written"
                        );
                        failed += 1;
                    }
                }
            }
        }
        (written, failed)
    }

    fn log_outcomes(&self, id: &CompoundId, outcomes: &[SourceOutcome]) {
        for outcome in outcomes {
            if self.options.verbose_outcomes {
                tracing::info!(
                    compound = %id,
                    source = %outcome.source(),
                    status = outcome.status().label(),
                    elapsed_ms = outcome.elapsed().as_millis() as u64,
                    "source outcome"
                );
            } else {
                tracing::debug!(
                    compound = %id,
                    source = %outcome.source(),
                    status = outcome.status().label(),
                    "source outcome"
                );
            }
        }
    }
}
