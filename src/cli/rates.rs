use super::{fallback_notice, fetch_snapshot, ui};
use crate::core::{RateSnapshot, RatesProvider};
use anyhow::Result;
use chrono::NaiveDate;
use comfy_table::Cell;

impl RateSnapshot {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Code"),
            ui::header_cell("Nominal"),
            ui::header_cell("Currency"),
            ui::header_cell("Rate (RUB)"),
            ui::header_cell("Change"),
        ]);

        for rate in self.currency_list() {
            table.add_row(vec![
                Cell::new(&rate.code),
                Cell::new(rate.nominal),
                Cell::new(&rate.name),
                ui::number_cell(rate.value, 4),
                ui::change_cell(rate.change()),
            ]);
        }

        format!(
            "Rates for {}\n\n{}",
            ui::style_text(&self.date.to_string(), ui::StyleType::Title),
            table
        )
    }
}

pub async fn run(provider: &dyn RatesProvider, date: NaiveDate) -> Result<()> {
    let snapshot = fetch_snapshot(provider, date).await?;

    if let Some(notice) = fallback_notice(date, &snapshot) {
        println!("{}\n", ui::style_text(&notice, ui::StyleType::Warning));
    }
    println!("{}", snapshot.display_as_table());
    Ok(())
}
