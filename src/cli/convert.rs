use super::{fallback_notice, fetch_snapshot, ui};
use crate::core::{RateSnapshot, RatesProvider, convert};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Converts `amount` between two currency codes using `snapshot`.
pub fn convert_codes(
    snapshot: &RateSnapshot,
    amount: Decimal,
    from: &str,
    to: &str,
) -> Result<Decimal> {
    let lookup = |code: &str| {
        let code = code.trim().to_uppercase();
        snapshot
            .find_rate(&code)
            .ok_or_else(|| anyhow!("Unknown currency {} for {}", code, snapshot.date))
    };
    let from_rate = lookup(from)?;
    let to_rate = lookup(to)?;

    Ok(convert(amount, Some(&from_rate), Some(&to_rate))?)
}

pub async fn run(
    provider: &dyn RatesProvider,
    date: NaiveDate,
    amount: Decimal,
    from: &str,
    to: &str,
) -> Result<()> {
    let snapshot = fetch_snapshot(provider, date).await?;
    let converted = convert_codes(&snapshot, amount, from, to)?;

    if let Some(notice) = fallback_notice(date, &snapshot) {
        println!("{}\n", ui::style_text(&notice, ui::StyleType::Warning));
    }
    println!(
        "{} {} = {} {}",
        amount,
        from.trim().to_uppercase(),
        ui::style_text(&ui::format_decimal(converted, 4), ui::StyleType::TotalValue),
        to.trim().to_uppercase()
    );
    println!(
        "{}",
        ui::style_text(
            &format!("Rates as of {}", snapshot.date),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
