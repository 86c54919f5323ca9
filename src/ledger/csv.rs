//! CSV trade history file

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{format_fixed, LedgerEntry, LedgerError, TradeLedger};

/// Column header, written once when the file is created
pub const HEADER: [&str; 11] = [
    "Date",
    "Pair",
    "Side",
    "Entry Price",
    "Trade Size",
    "Stop Loss",
    "TP1",
    "TP2",
    "TP3",
    "P/L",
    "Notes",
];

/// Appends ledger rows to a CSV file
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render one row, without the trailing newline
    pub fn format_row(entry: &LedgerEntry) -> String {
        let fields = [
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.symbol.clone(),
            entry.side.to_string(),
            entry.entry_price.to_string(),
            format_fixed(entry.size, 4),
            entry.stop_loss.to_string(),
            entry.tp1.to_string(),
            entry.tp2.to_string(),
            entry.tp3.to_string(),
            format_fixed(entry.realized_pnl, 2),
            entry.status.to_string(),
        ];
        fields
            .iter()
            .map(|f| escape(f))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Quote a field when it contains a separator, quote or newline
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl TradeLedger for CsvLedger {
    fn record(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut buf = String::new();
        if file.metadata()?.len() == 0 {
            buf.push_str(&HEADER.join(","));
            buf.push('\n');
        }
        buf.push_str(&Self::format_row(entry));
        buf.push('\n');

        file.write_all(buf.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerStatus, Side};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn entry(status: LedgerStatus) -> LedgerEntry {
        LedgerEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 5).unwrap(),
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            entry_price: dec!(100),
            size: dec!(0.67),
            stop_loss: dec!(100),
            tp1: dec!(110),
            tp2: dec!(115),
            tp3: dec!(120),
            realized_pnl: dec!(3.3),
            status,
        }
    }

    #[test]
    fn test_format_row() {
        let row = CsvLedger::format_row(&entry(LedgerStatus::Tp1Hit));
        assert_eq!(
            row,
            "2024-05-01 08:30:05,BTCUSDT,BUY,100,0.6700,100,110,115,120,3.30,tp1-hit"
        );
    }

    #[test]
    fn test_format_row_rounds_size_and_pnl() {
        let mut row = entry(LedgerStatus::Entry);
        row.stop_loss = dec!(90);
        row.size = dec!(0.12345678);
        row.realized_pnl = dec!(2.999);
        assert_eq!(
            CsvLedger::format_row(&row),
            "2024-05-01 08:30:05,BTCUSDT,BUY,100,0.1235,90,110,115,120,3.00,entry"
        );

        row.realized_pnl = dec!(10) / dec!(3);
        assert!(CsvLedger::format_row(&row).ends_with(",3.33,entry"));
    }

    #[test]
    fn test_format_row_escapes_free_text() {
        let row = CsvLedger::format_row(&entry(LedgerStatus::Closed("manual, \"risk off\"".into())));
        assert!(row.ends_with(",\"manual, \"\"risk off\"\"\""));
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("trade_history.csv");
        let ledger = CsvLedger::new(&path);

        ledger.record(&entry(LedgerStatus::Entry)).unwrap();
        ledger.record(&entry(LedgerStatus::Tp1Hit)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Date,Pair,Side,Entry Price,Trade Size,Stop Loss,TP1,TP2,TP3,P/L,Notes"
        );
        assert!(lines[1].ends_with(",entry"));
        assert!(lines[2].ends_with(",tp1-hit"));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trade_history.csv");

        CsvLedger::new(&path)
            .record(&entry(LedgerStatus::Entry))
            .unwrap();
        CsvLedger::new(&path)
            .record(&entry(LedgerStatus::StopLoss))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("Date,Pair").count(), 1);
    }
}
