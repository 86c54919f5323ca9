//! Run command implementation

use clap::Args;

use crate::agent::TradingAgent;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run a single monitor and scan cycle, then exit
    #[arg(long)]
    pub once: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut agent = TradingAgent::from_config(config)?;

        if self.once {
            let result = agent.run_cycle().await;
            agent.shutdown().await;
            let report = result?;
            tracing::info!(
                events = report.events.len(),
                opened = report.opened.len(),
                capital = %agent.engine().capital(),
                "Single cycle complete"
            );
            return Ok(());
        }

        agent.run().await
    }
}
