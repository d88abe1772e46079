//! Exchange rate snapshots and conversion

use crate::core::error::{RatesError, Result};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::num::NonZeroU32;

/// Currency every rate in the feed is quoted against.
pub const BASE_CURRENCY: &str = "RUB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRate {
    pub id: String,
    pub num_code: String,
    pub code: String,
    pub nominal: NonZeroU32,
    pub name: String,
    /// Price in base currency for `nominal` units.
    pub value: Decimal,
    pub previous: Decimal,
}

impl CurrencyRate {
    /// The synthesized entry for the base currency itself.
    pub fn base() -> Self {
        CurrencyRate {
            id: "R00000".to_string(),
            num_code: "643".to_string(),
            code: BASE_CURRENCY.to_string(),
            nominal: NonZeroU32::MIN,
            name: "Russian Ruble".to_string(),
            value: Decimal::ONE,
            previous: Decimal::ONE,
        }
    }

    pub fn is_base(&self) -> bool {
        self.code == BASE_CURRENCY
    }

    /// `(value, nominal)` as used for conversion; the base currency is always 1/1.
    fn quote(&self) -> (Decimal, Decimal) {
        if self.is_base() {
            (Decimal::ONE, Decimal::ONE)
        } else {
            (self.value, Decimal::from(self.nominal.get()))
        }
    }

    /// Price of a single unit in base currency.
    pub fn unit_rate(&self) -> Decimal {
        let (value, nominal) = self.quote();
        value / nominal
    }

    /// Per-unit change against the previous published rate.
    pub fn change(&self) -> Decimal {
        if self.is_base() {
            return Decimal::ZERO;
        }
        (self.value - self.previous) / Decimal::from(self.nominal.get())
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.code, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Day the rates were published for. May be earlier than the requested day.
    pub date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub rates: HashMap<String, CurrencyRate>,
}

impl RateSnapshot {
    pub fn currency_list(&self) -> Vec<CurrencyRate> {
        let mut currencies: Vec<CurrencyRate> = self.rates.values().cloned().collect();
        if !self.rates.contains_key(BASE_CURRENCY) {
            currencies.push(CurrencyRate::base());
        }
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        currencies
    }

    /// Looks up a currency by code, including the synthesized base currency.
    pub fn find_rate(&self, code: &str) -> Option<CurrencyRate> {
        match self.rates.get(code) {
            Some(rate) => Some(rate.clone()),
            None if code == BASE_CURRENCY => Some(CurrencyRate::base()),
            None => None,
        }
    }
}

/// All rates of `snapshot` plus the base currency, ordered by code.
pub fn currency_list(snapshot: Option<&RateSnapshot>) -> Vec<CurrencyRate> {
    snapshot.map(RateSnapshot::currency_list).unwrap_or_default()
}

/// Converts `amount` of `from` into `to`. No rounding is applied.
pub fn convert(
    amount: Decimal,
    from: Option<&CurrencyRate>,
    to: Option<&CurrencyRate>,
) -> Result<Decimal> {
    let (Some(from), Some(to)) = (from, to) else {
        return Err(RatesError::InvalidArgument(
            "source and target currencies are required".to_string(),
        ));
    };

    let (from_value, from_nominal) = from.quote();
    let (to_value, to_nominal) = to.quote();
    if to_value.is_zero() {
        return Err(RatesError::InvalidArgument(format!(
            "rate for {} is zero",
            to.code
        )));
    }

    // amount * (from_value / from_nominal) / (to_value / to_nominal), kept as a
    // single division so equal rates cancel exactly
    amount
        .checked_mul(from_value)
        .and_then(|v| v.checked_mul(to_nominal))
        .zip(from_nominal.checked_mul(to_value))
        .and_then(|(numerator, denominator)| numerator.checked_div(denominator))
        .ok_or_else(|| {
            RatesError::InvalidArgument(format!(
                "conversion of {amount} {} to {} overflows",
                from.code, to.code
            ))
        })
}

#[async_trait]
pub trait RatesProvider: Send + Sync {
    async fn get_rates(&self, date: NaiveDate) -> Result<RateSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rate(code: &str, nominal: u32, value: Decimal) -> CurrencyRate {
        CurrencyRate {
            id: format!("R-{code}"),
            num_code: "000".to_string(),
            code: code.to_string(),
            nominal: NonZeroU32::new(nominal).unwrap(),
            name: code.to_string(),
            value,
            previous: value,
        }
    }

    fn snapshot(rates: Vec<CurrencyRate>) -> RateSnapshot {
        RateSnapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
            previous_date: None,
            timestamp: None,
            rates: rates.into_iter().map(|r| (r.code.clone(), r)).collect(),
        }
    }

    #[test]
    fn test_convert_between_base_and_quoted_currency() {
        let usd = rate("USD", 1, dec!(90));
        let rub = CurrencyRate::base();

        assert_eq!(convert(dec!(100), Some(&usd), Some(&rub)).unwrap(), dec!(9000));
        assert_eq!(convert(dec!(9000), Some(&rub), Some(&usd)).unwrap(), dec!(100));
    }

    #[test]
    fn test_convert_same_currency_is_identity() {
        // 100 / 3 does not terminate
        let xdr = rate("XDR", 3, dec!(100));
        let jpy = rate("JPY", 100, dec!(57.7));
        let usd = rate("USD", 1, dec!(91.2673));

        for currency in [&xdr, &jpy, &usd] {
            let amount = dec!(1234.5678);
            assert_eq!(
                convert(amount, Some(currency), Some(currency)).unwrap(),
                amount
            );
        }
    }

    #[test]
    fn test_convert_respects_nominal() {
        // 100 JPY cost 60 RUB, 1 USD costs 90 RUB
        let jpy = rate("JPY", 100, dec!(60));
        let usd = rate("USD", 1, dec!(90));

        assert_eq!(convert(dec!(1), Some(&usd), Some(&jpy)).unwrap(), dec!(150));
        assert_eq!(convert(dec!(150), Some(&jpy), Some(&usd)).unwrap(), dec!(1));
    }

    #[test]
    fn test_base_currency_rate_is_one_regardless_of_feed_value() {
        let mut rub = CurrencyRate::base();
        rub.value = dec!(0);
        let usd = rate("USD", 1, dec!(90));

        assert_eq!(rub.unit_rate(), Decimal::ONE);
        assert_eq!(convert(dec!(90), Some(&rub), Some(&usd)).unwrap(), dec!(1));
    }

    #[test]
    fn test_convert_missing_currency() {
        let usd = rate("USD", 1, dec!(90));

        let err = convert(dec!(1), None, Some(&usd)).unwrap_err();
        assert!(matches!(err, RatesError::InvalidArgument(_)));
        let err = convert(dec!(1), Some(&usd), None).unwrap_err();
        assert!(matches!(err, RatesError::InvalidArgument(_)));
    }

    #[test]
    fn test_convert_to_zero_rate() {
        let usd = rate("USD", 1, dec!(90));
        let broken = rate("XXX", 1, dec!(0));

        let err = convert(dec!(1), Some(&usd), Some(&broken)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: rate for XXX is zero");

        // Converting *from* a zero rate is well defined
        assert_eq!(
            convert(dec!(5), Some(&broken), Some(&usd)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_convert_overflow() {
        let usd = rate("USD", 1, dec!(90));
        let rub = CurrencyRate::base();

        let err = convert(Decimal::MAX, Some(&usd), Some(&rub)).unwrap_err();
        assert!(matches!(err, RatesError::InvalidArgument(_)));
    }

    #[test]
    fn test_currency_list_sorted_with_base() {
        let snapshot = snapshot(vec![rate("USD", 1, dec!(90)), rate("EUR", 1, dec!(98))]);

        let list = currency_list(Some(&snapshot));
        let codes: Vec<_> = list.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "RUB", "USD"]);

        let rub = &list[1];
        assert_eq!(rub.value, Decimal::ONE);
        assert_eq!(rub.nominal.get(), 1);
    }

    #[test]
    fn test_currency_list_is_case_sensitive() {
        let snapshot = snapshot(vec![rate("abc", 1, dec!(1)), rate("XYZ", 1, dec!(1))]);

        let codes: Vec<_> = snapshot
            .currency_list()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["RUB", "XYZ", "abc"]);
    }

    #[test]
    fn test_currency_list_empty_snapshot() {
        assert!(currency_list(None).is_empty());

        let list = currency_list(Some(&snapshot(vec![])));
        assert_eq!(list.len(), 1);
        assert!(list[0].is_base());
    }

    #[test]
    fn test_find_rate() {
        let snapshot = snapshot(vec![rate("USD", 1, dec!(90))]);

        assert_eq!(snapshot.find_rate("USD").unwrap().value, dec!(90));
        assert!(snapshot.find_rate("RUB").unwrap().is_base());
        assert!(snapshot.find_rate("GBP").is_none());
    }

    #[test]
    fn test_change_per_unit() {
        let mut jpy = rate("JPY", 100, dec!(60));
        jpy.previous = dec!(58);

        assert_eq!(jpy.change(), dec!(0.02));
        assert_eq!(CurrencyRate::base().change(), Decimal::ZERO);
    }
}
