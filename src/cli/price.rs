use super::ui;
use crate::core::{DataSource, QuoteClient};
use anyhow::{Context, Result};
use comfy_table::Cell;

pub async fn run(client: &QuoteClient, symbol: &str) -> Result<()> {
    let quote = client
        .current_price(symbol)
        .await
        .with_context(|| format!("Failed to fetch price for {symbol}"))?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
        ui::header_cell("Change %"),
        ui::header_cell("Source"),
        ui::header_cell("Updated"),
    ]);
    table.add_row(vec![
        Cell::new(&quote.symbol),
        ui::rate_cell(quote.price),
        ui::format_optional_cell(quote.change, ui::format_rate),
        quote
            .change_percent
            .map_or_else(|| ui::na_cell(false), ui::change_cell),
        ui::source_cell(quote.source),
        Cell::new(quote.updated_at.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    println!("{table}");

    if let Some(notice) = client.session().last_error {
        println!("{}", ui::style_text(&notice, ui::StyleType::Warning));
    }
    if quote.source == DataSource::Synthetic {
        println!(
            "{}",
            ui::style_text(
                "Provider unavailable, showing placeholder data",
                ui::StyleType::Warning
            )
        );
    }
    Ok(())
}
