use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::SourceName;
use crate::error::BuilderError;

pub const DEFAULT_CONFIG_FILE: &str = "compound-builder.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub source_timeout_secs: Option<u64>,
    #[serde(default)]
    pub compound_deadline_secs: Option<u64>,
    #[serde(default)]
    pub chebi_batch_size: Option<usize>,
    #[serde(default)]
    pub verbose_outcomes: Option<bool>,
    #[serde(default)]
    pub sources: BTreeMap<String, bool>,
    #[serde(default)]
    pub endpoints: Option<Endpoints>,
}

/// Base URLs of every remote service. Each source appends its own path and
/// query to the matching entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub cactus: String,
    pub wikipathways: String,
    pub kegg: String,
    pub europe_pmc: String,
    pub rhea: String,
    pub mona: String,
    pub chebi: String,
    pub metabolights_ws: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            cactus: "https://cactus.nci.nih.gov/chemical/structure/".to_string(),
            wikipathways: "https://webservice.wikipathways.org/findPathwaysByXref".to_string(),
            kegg: "https://rest.kegg.jp/".to_string(),
            europe_pmc: "https://www.ebi.ac.uk/europepmc/webservices/rest/search".to_string(),
            rhea: "https://www.rhea-db.org/rhea/".to_string(),
            mona: "https://mona.fiehnlab.ucdavis.edu/rest/spectra/search".to_string(),
            chebi: "https://www.ebi.ac.uk/chebi/backend/api/public/compounds/".to_string(),
            metabolights_ws: "https://www.ebi.ac.uk/metabolights/ws/".to_string(),
        }
    }
}

/// Enable flags for the six sources. Every source starts enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceToggles {
    enabled: BTreeSet<SourceName>,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            enabled: SourceName::ALL.into_iter().collect(),
        }
    }
}

impl SourceToggles {
    pub fn only(sources: impl IntoIterator<Item = SourceName>) -> Self {
        Self {
            enabled: sources.into_iter().collect(),
        }
    }

    pub fn set(&mut self, source: SourceName, enabled: bool) {
        if enabled {
            self.enabled.insert(source);
        } else {
            self.enabled.remove(&source);
        }
    }

    pub fn is_enabled(&self, source: SourceName) -> bool {
        self.enabled.contains(&source)
    }

    pub fn enabled(&self) -> &BTreeSet<SourceName> {
        &self.enabled
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub workers: usize,
    pub source_timeout: Duration,
    pub compound_deadline: Duration,
    pub chebi_batch_size: usize,
    pub verbose_outcomes: bool,
    pub sources: SourceToggles,
    pub endpoints: Endpoints,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            workers: 6,
            source_timeout: Duration::from_secs(60),
            compound_deadline: Duration::from_secs(900),
            chebi_batch_size: 100,
            verbose_outcomes: false,
            sources: SourceToggles::default(),
            endpoints: Endpoints::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file at `path`, or `compound-builder.json` in the
    /// working directory. Without an explicit path a missing default file
    /// means built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BuilderError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BuilderError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BuilderError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BuilderError> {
        let defaults = ResolvedConfig::default();

        let workers = config.workers.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(BuilderError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        let chebi_batch_size = config.chebi_batch_size.unwrap_or(defaults.chebi_batch_size);
        if chebi_batch_size == 0 {
            return Err(BuilderError::InvalidConfig(
                "chebi_batch_size must be at least 1".to_string(),
            ));
        }
        let source_timeout = config
            .source_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.source_timeout);
        let compound_deadline = config
            .compound_deadline_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.compound_deadline);
        if source_timeout.is_zero() || compound_deadline.is_zero() {
            return Err(BuilderError::InvalidConfig(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        let mut sources = SourceToggles::default();
        for (name, enabled) in config.sources {
            sources.set(name.parse()?, enabled);
        }

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            workers,
            source_timeout,
            compound_deadline,
            chebi_batch_size,
            verbose_outcomes: config.verbose_outcomes.unwrap_or(defaults.verbose_outcomes),
            sources,
            endpoints: config.endpoints.unwrap_or_default(),
        })
    }
}
