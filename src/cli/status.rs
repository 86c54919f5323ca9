//! Status command implementation

use clap::Args;
use std::fmt::Write;

use crate::config::Config;
use crate::ledger::format_fixed;
use crate::portfolio::{JsonFileStore, PortfolioState};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the raw snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let store = JsonFileStore::new(&config.storage.state_file, config.risk.initial_capital);
        let state = store
            .read_snapshot()?
            .unwrap_or_else(|| PortfolioState::fresh(config.risk.initial_capital));

        if self.json {
            println!("{}", serde_json::to_string_pretty(&state)?);
        } else {
            print!("{}", render(&state, config.risk.max_open_positions));
        }
        Ok(())
    }
}

fn render(state: &PortfolioState, max_positions: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "trend-agent status");
    let _ = writeln!(out, "  Capital: {}", format_fixed(state.capital, 2));
    let _ = writeln!(out, "  Open positions: {}/{}", state.open_count(), max_positions);
    for p in &state.positions {
        let _ = writeln!(
            out,
            "  {} {:?} size {}/{} entry {} stop {} tp {} / {} / {} since {}",
            p.symbol,
            p.stage(),
            format_fixed(p.size, 4),
            format_fixed(p.initial_size, 4),
            p.entry_price,
            p.stop_loss,
            p.tp1,
            p.tp2,
            p.tp3,
            p.entry_time.format("%Y-%m-%d %H:%M")
        );
    }
    out
}
