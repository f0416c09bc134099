//! Placeholder data for when the provider is unavailable or throttled

use crate::core::quote::PricePoint;
use chrono::{Duration, NaiveDate};
use rand::Rng;

/// Number of daily points in a synthetic series.
pub const SERIES_DAYS: i64 = 30;

/// Base used when nothing is known about the pair.
pub const DEFAULT_BASE_PRICE: f64 = 1.0;

const PRICE_SPREAD: f64 = 0.10;
const DAILY_DRIFT: f64 = 0.02;
const INTRADAY_RANGE: f64 = 0.01;
const VOLUME_RANGE: (f64, f64) = (1_000.0, 100_000.0);

/// Base price perturbed by up to +/-10%.
pub fn price<R: Rng + ?Sized>(rng: &mut R, base: f64) -> f64 {
    base * (1.0 + rng.gen_range(-PRICE_SPREAD..=PRICE_SPREAD))
}

/// Thirty consecutive daily points ending at `today`, ascending. Each day
/// drifts up to +/-2% from the previous one; `low <= open, close <= high`.
pub fn series<R: Rng + ?Sized>(rng: &mut R, base: f64, today: NaiveDate) -> Vec<PricePoint> {
    let mut level = base;
    (0..SERIES_DAYS)
        .rev()
        .map(|days_back| {
            level *= 1.0 + rng.gen_range(-DAILY_DRIFT..=DAILY_DRIFT);
            let open = level;
            let high = open * (1.0 + rng.gen_range(0.0..=INTRADAY_RANGE));
            let low = open * (1.0 - rng.gen_range(0.0..=INTRADAY_RANGE));
            let close = rng.gen_range(low..=high);
            PricePoint {
                date: today - Duration::days(days_back),
                open,
                high,
                low,
                close,
                volume: rng.gen_range(VOLUME_RANGE.0..=VOLUME_RANGE.1).round(),
            }
        })
        .collect()
}
