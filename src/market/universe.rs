//! Tradable pair universe

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::Ticker;
use crate::config::ScannerConfig;

/// Symbols quoted in the configured asset with enough 24h turnover,
/// most liquid first
pub fn select_pairs(tickers: &[Ticker], config: &ScannerConfig) -> Vec<String> {
    let quote = config.quote_asset.to_uppercase();
    let mut eligible: Vec<&Ticker> = tickers
        .iter()
        .filter(|t| t.quote_volume >= config.min_quote_volume)
        .filter(|t| match t.symbol.to_uppercase().strip_suffix(&quote) {
            Some(base) if !base.is_empty() => !config
                .excluded_bases
                .iter()
                .any(|ex| ex.eq_ignore_ascii_case(base)),
            _ => false,
        })
        .collect();

    eligible.sort_by(|a, b| {
        b.quote_volume
            .cmp(&a.quote_volume)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    eligible.into_iter().map(|t| t.symbol.clone()).collect()
}

/// Pairs that entered or left the universe since the last refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniverseChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl UniverseChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Plain-text record of the current pair universe, one symbol per line
pub struct PairsFile {
    path: PathBuf,
}

impl PairsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Symbols in the file, ignoring `#` comment lines; empty if missing
    pub fn read(&self) -> io::Result<BTreeSet<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(e),
        }
    }

    /// Replace the file contents with `pairs` and report the difference
    pub fn update(&self, pairs: &[String], min_volume: Decimal) -> io::Result<UniverseChange> {
        let previous = self.read()?;
        let current: BTreeSet<String> = pairs.iter().cloned().collect();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut content = format!(
            "# Trading pairs, updated {}\n# Total pairs: {}\n# Minimum 24h volume: {}\n#\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            current.len(),
            min_volume
        );
        for symbol in &current {
            content.push_str(symbol);
            content.push('\n');
        }
        fs::write(&self.path, content)?;

        let change = UniverseChange {
            added: current.difference(&previous).cloned().collect(),
            removed: previous.difference(&current).cloned().collect(),
        };
        if !previous.is_empty() && !change.is_empty() {
            tracing::info!(
                added = ?change.added,
                removed = ?change.removed,
                "Trading pair universe changed"
            );
        }
        Ok(change)
    }
}
