//! Error taxonomy for rate fetching and conversion.

use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RatesError>;

#[derive(Error, Debug)]
pub enum RatesError {
    #[error("Received empty response from {url}")]
    EmptyResponse { url: String },

    /// The source has no rates for this exact day. Consumed by the fallback
    /// search and never returned from `get_rates`.
    #[error("No rates published for {date}")]
    NotFound { date: NaiveDate },

    #[error("No rates found for {date} or the {days} days before it")]
    NoDataFound { date: NaiveDate, days: u32 },

    #[error("Failed to fetch rates from {url}: {source}")]
    FetchFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl RatesError {
    pub fn fetch_failed(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        RatesError::FetchFailed {
            url: url.into(),
            source: source.into(),
        }
    }
}
