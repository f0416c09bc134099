use super::ui;
use crate::core::{DataSource, PricePoint, QuoteClient};
use anyhow::{Context, Result};
use comfy_table::{Cell, CellAlignment};

#[derive(Debug, PartialEq)]
struct SeriesSummary {
    first_close: f64,
    last_close: f64,
    high: f64,
    low: f64,
    change_percent: Option<f64>,
}

fn summarize(points: &[PricePoint]) -> Option<SeriesSummary> {
    let first = points.first()?;
    let last = points.last()?;
    let high = points.iter().map(|p| p.high).fold(f64::MIN, f64::max);
    let low = points.iter().map(|p| p.low).fold(f64::MAX, f64::min);
    let change_percent =
        (first.close > 0.0).then(|| (last.close - first.close) / first.close * 100.0);

    Some(SeriesSummary {
        first_close: first.close,
        last_close: last.close,
        high,
        low,
        change_percent,
    })
}

pub async fn run(client: &QuoteClient, symbol: &str, days: usize) -> Result<()> {
    let series = client
        .historical_series(symbol)
        .await
        .with_context(|| format!("Failed to fetch history for {symbol}"))?;

    if series.points.is_empty() {
        println!("No price history available for {}.", series.symbol);
        return Ok(());
    }

    let shown = &series.points[series.points.len().saturating_sub(days)..];
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Close"),
        ui::header_cell("Volume"),
    ]);
    for point in shown {
        table.add_row(vec![
            Cell::new(point.date),
            ui::rate_cell(point.open),
            ui::rate_cell(point.high),
            ui::rate_cell(point.low),
            ui::rate_cell(point.close),
            Cell::new(format!("{:.0}", point.volume)).set_alignment(CellAlignment::Right),
        ]);
    }

    println!(
        "\n{} {}",
        ui::style_text(&series.symbol, ui::StyleType::Title),
        ui::style_text(&format!("({})", series.source), ui::StyleType::Subtle)
    );
    println!("{table}");

    if let Some(summary) = summarize(shown) {
        let change = summary
            .change_percent
            .map_or_else(|| "N/A".to_string(), |c| format!("{c:+.2}%"));
        println!(
            "Range {} - {}, close {} -> {} ({change})",
            ui::format_rate(summary.low),
            ui::format_rate(summary.high),
            ui::format_rate(summary.first_close),
            ui::format_rate(summary.last_close),
        );
    }

    if series.source == DataSource::Synthetic {
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
