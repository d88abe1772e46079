pub mod convert;
pub mod rates;
pub mod setup;
pub mod ui;

use crate::core::{RateSnapshot, RatesProvider};
use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Fetches the snapshot for `date` behind a spinner.
pub(crate) async fn fetch_snapshot(
    provider: &dyn RatesProvider,
    date: NaiveDate,
) -> Result<RateSnapshot> {
    let spinner = ui::new_spinner(&format!("Fetching rates for {date}..."));
    let result = provider.get_rates(date).await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Could not load rates for {date}"))
}

/// Message shown when the snapshot is for an earlier day than requested.
pub(crate) fn fallback_notice(requested: NaiveDate, snapshot: &RateSnapshot) -> Option<String> {
    (snapshot.date != requested).then(|| {
        format!(
            "No rates published for {requested}, showing rates for {}",
            snapshot.date
        )
    })
}
