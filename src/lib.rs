pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::cache::DEFAULT_TTL;
use crate::providers::{CbrProvider, SnapshotCache};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Show every rate published for a day
    Rates { date: Option<NaiveDate> },
    /// Convert an amount between two currencies
    Convert {
        amount: Decimal,
        from: String,
        to: String,
        date: Option<NaiveDate>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cbrates starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let cache = Arc::new(SnapshotCache::with_settings(
        DEFAULT_TTL,
        config.cache.sweep_interval(),
    ));
    let provider = CbrProvider::with_settings(
        &config.provider.base_url,
        cache,
        config.provider_settings(),
    )?;

    let today = Local::now().date_naive();
    match command {
        AppCommand::Rates { date } => cli::rates::run(&provider, date.unwrap_or(today)).await,
        AppCommand::Convert {
            amount,
            from,
            to,
            date,
        } => cli::convert::run(&provider, date.unwrap_or(today), amount, &from, &to).await,
    }
}
