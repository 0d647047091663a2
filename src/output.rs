use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::batch::{BatchSummary, ProgressEvent, ProgressSink};
use crate::config::SourceToggles;
use crate::domain::SourceName;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &BatchSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    pub fn print_sources(toggles: &SourceToggles) -> io::Result<()> {
        let sources: BTreeMap<SourceName, bool> = SourceName::ALL
            .into_iter()
            .map(|source| (source, toggles.is_enabled(source)))
            .collect();
        Self::print_json(&sources)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress as log lines on stderr.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(
                elapsed_ms = elapsed.as_millis() as u64,
                "{}",
                event.message
            ),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn print_summary_text(summary: &BatchSummary) {
    let green = "\x1b[32m";
    let red = "\x1b[31m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}compound-builder summary{reset}");
    println!("{green}written: {}{reset}", summary.written);
    println!("{red}failed: {}{reset}", summary.failed);
    for item in summary.items.iter().filter(|item| item.error.is_some()) {
        println!(
            "{red}  {} {}{reset}",
            item.id,
            item.error.as_deref().unwrap_or_default()
        );
    }
    println!("elapsed: {:.1}s", summary.elapsed_ms as f64 / 1000.0);
}
