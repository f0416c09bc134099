use super::ui;
use crate::core::{CurrencyPair, PriceQuote, QuoteClient, QuoteError};
use anyhow::Result;
use comfy_table::{Cell, Table};
use futures::future::join_all;

pub async fn run(client: &QuoteClient, pairs: &[CurrencyPair]) -> Result<()> {
    if pairs.is_empty() {
        println!("No pairs configured for the watchlist.");
        return Ok(());
    }

    // Fetch all quotes concurrently
    let pb = ui::new_progress_bar(pairs.len() as u64);
    let quote_futures = pairs.iter().map(|pair| {
        let pb_clone = pb.clone();
        let symbol = pair.to_string();
        async move {
            let res = client.current_price(&symbol).await;
            pb_clone.inc(1);
            (symbol, res)
        }
    });
    let results: Vec<(String, Result<PriceQuote, QuoteError>)> = join_all(quote_futures).await;
    pb.finish_and_clear();

    println!("{}", ui::style_text("Watchlist", ui::StyleType::Title));
    println!("{}", build_table(&results));

    let failures = results.iter().filter(|(_, r)| r.is_err()).count();
    if failures > 0 {
        println!(
            "{}",
            ui::style_text(
                &format!("{failures} of {} pairs could not be fetched", results.len()),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}

fn build_table(results: &[(String, Result<PriceQuote, QuoteError>)]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Price"),
        ui::header_cell("Change"),
        ui::header_cell("Change %"),
        ui::header_cell("Source"),
    ]);

    for (symbol, result) in results {
        match result {
            Ok(quote) => table.add_row(vec![
                Cell::new(symbol),
                ui::rate_cell(quote.price),
                ui::format_optional_cell(quote.change, ui::format_rate),
                quote
                    .change_percent
                    .map_or_else(|| ui::na_cell(false), ui::change_cell),
                ui::source_cell(quote.source),
            ]),
            Err(e) => table.add_row(vec![
                Cell::new(symbol),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                Cell::new(ui::style_text(&e.to_string(), ui::StyleType::Error)),
            ]),
        };
    }
    table
}
