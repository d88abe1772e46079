use crate::core::error::{RatesError, Result};
use crate::core::rates::{CurrencyRate, RateSnapshot, RatesProvider};
use crate::store::memory::MemoryCache;
use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, NaiveDateTime};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.cbr-xml-daily.ru";

pub type SnapshotCache = MemoryCache<String, RateSnapshot>;

/// Tuning knobs for [`CbrProvider`].
#[derive(Debug, Clone)]
pub struct CbrSettings {
    pub timeout: Duration,
    /// TTL for today's rates, which may still be revised.
    pub today_ttl: Duration,
    /// TTL for any other day.
    pub archive_ttl: Duration,
    /// How many earlier days to try when a day has no published rates.
    pub fallback_days: u32,
}

impl Default for CbrSettings {
    fn default() -> Self {
        CbrSettings {
            timeout: Duration::from_secs(15),
            today_ttl: Duration::from_secs(60 * 60),
            archive_ttl: Duration::from_secs(24 * 60 * 60),
            fallback_days: 14,
        }
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Cache key for a day, e.g. `20240517`.
pub fn cache_key(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub struct CbrProvider {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<SnapshotCache>,
    settings: CbrSettings,
    today: fn() -> NaiveDate,
}

impl CbrProvider {
    pub fn new(base_url: &str, cache: Arc<SnapshotCache>) -> anyhow::Result<Self> {
        Self::with_settings(base_url, cache, CbrSettings::default())
    }

    pub fn with_settings(
        base_url: &str,
        cache: Arc<SnapshotCache>,
        settings: CbrSettings,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("cbrates/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(CbrProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            cache,
            settings,
            today: local_today,
        })
    }

    /// Replaces the source of "today", which decides endpoint and TTL.
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Same as `get_rates`, ignoring the time of day.
    pub async fn get_rates_at(&self, at: NaiveDateTime) -> Result<RateSnapshot> {
        self.get_rates(at.date()).await
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn url_for(&self, date: NaiveDate, today: NaiveDate) -> String {
        if date == today {
            format!("{}/daily_json.js", self.base_url)
        } else {
            format!(
                "{}/archive/{}/{}/daily_json.js",
                self.base_url,
                date.format("%Y"),
                date.format("%m/%d")
            )
        }
    }

    fn ttl_for(&self, date: NaiveDate, today: NaiveDate) -> Duration {
        if date == today {
            self.settings.today_ttl
        } else {
            self.settings.archive_ttl
        }
    }

    async fn resolve(&self, date: NaiveDate, today: NaiveDate) -> Result<RateSnapshot> {
        match self.fetch(date, today).await {
            Err(RatesError::NotFound { .. }) => self.find_nearest(date, today).await,
            other => other,
        }
    }

    /// Walks back one day at a time, going through the cache for each day.
    async fn find_nearest(&self, date: NaiveDate, today: NaiveDate) -> Result<RateSnapshot> {
        let days = self.settings.fallback_days;
        for offset in 1..=days {
            let Some(day) = date.checked_sub_days(Days::new(offset.into())) else {
                break;
            };

            let result = self
                .cache
                .get_or_create(
                    cache_key(day),
                    || self.fetch(day, today),
                    Some(self.ttl_for(day, today)),
                )
                .await;

            match result {
                Ok(snapshot) => {
                    info!(
                        "No rates for {}, using rates from {}",
                        date, snapshot.date
                    );
                    return Ok(snapshot);
                }
                Err(RatesError::NotFound { .. }) => debug!("No rates for {}", day),
                Err(e) => warn!("Skipping {} during fallback search: {}", day, e),
            }
        }

        Err(RatesError::NoDataFound { date, days })
    }

    #[instrument(name = "CbrRatesFetch", skip(self, today), fields(date = %date))]
    async fn fetch(&self, date: NaiveDate, today: NaiveDate) -> Result<RateSnapshot> {
        let url = self.url_for(date, today);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RatesError::fetch_failed(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RatesError::NotFound { date });
        }
        if !status.is_success() {
            return Err(RatesError::fetch_failed(
                &url,
                format!("HTTP error: {status}"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RatesError::fetch_failed(&url, e))?;
        if body.trim().is_empty() {
            return Err(RatesError::EmptyResponse { url });
        }

        let snapshot = parse_snapshot(&body).map_err(|e| RatesError::fetch_failed(&url, e))?;
        debug!(
            "Fetched {} rates published for {}",
            snapshot.rates.len(),
            snapshot.date
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl RatesProvider for CbrProvider {
    async fn get_rates(&self, date: NaiveDate) -> Result<RateSnapshot> {
        let today = (self.today)();
        self.cache
            .get_or_create(
                cache_key(date),
                || self.resolve(date, today),
                Some(self.ttl_for(date, today)),
            )
            .await
    }
}

#[derive(Debug, Deserialize)]
struct CbrResponse {
    date: DateTime<FixedOffset>,
    #[serde(rename = "previousdate", default)]
    previous_date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    valute: HashMap<String, CbrValute>,
}

#[derive(Debug, Deserialize)]
struct CbrValute {
    #[serde(default)]
    id: String,
    #[serde(rename = "numcode", default)]
    num_code: String,
    #[serde(rename = "charcode")]
    char_code: String,
    nominal: NonZeroU32,
    #[serde(default)]
    name: String,
    value: Decimal,
    #[serde(default)]
    previous: Decimal,
}

impl From<CbrValute> for CurrencyRate {
    fn from(v: CbrValute) -> Self {
        CurrencyRate {
            id: v.id,
            num_code: v.num_code,
            code: v.char_code,
            nominal: v.nominal,
            name: v.name,
            value: v.value,
            previous: v.previous,
        }
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v))
                .collect(),
        ),
        other => other,
    }
}

/// Parses a daily rates document. Field names match case-insensitively;
/// currency codes used as map keys are left untouched.
fn parse_snapshot(body: &str) -> serde_json::Result<RateSnapshot> {
    let mut root = lowercase_keys(serde_json::from_str(body)?);
    if let Some(Value::Object(valute)) = root.get_mut("valute") {
        for rate in valute.values_mut() {
            *rate = lowercase_keys(rate.take());
        }
    }

    let response: CbrResponse = serde_json::from_value(root)?;
    let rates = response
        .valute
        .into_values()
        .map(CurrencyRate::from)
        .map(|rate| (rate.code.clone(), rate))
        .collect();

    Ok(RateSnapshot {
        date: response.date.date_naive(),
        previous_date: response.previous_date.map(|d| d.date_naive()),
        timestamp: response.timestamp,
        rates,
    })
}
