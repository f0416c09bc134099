//! Quote abstractions and core types

use crate::core::error::QuoteError;
use crate::core::pair::CurrencyPair;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Date format used by the provider for daily series keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A daily record as the provider encodes it, all fields still strings.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

impl DailyRecord {
    /// Parses the record into a point. Returns `None` if the date or any of
    /// the numeric fields fail to parse. OHLC ordering is not checked.
    pub fn to_point(&self) -> Option<PricePoint> {
        Some(PricePoint {
            date: NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()?,
            open: finite(&self.open)?,
            high: finite(&self.high)?,
            low: finite(&self.low)?,
            close: finite(&self.close)?,
            volume: finite(&self.volume)?,
        })
    }
}

/// Parses a provider number, rejecting `NaN` and infinities.
pub fn finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A cached or persisted value plus whether it was generated locally.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled<T> {
    pub value: T,
    pub synthetic: bool,
}

impl<T> Labeled<T> {
    pub fn real(value: T) -> Self {
        Self {
            value,
            synthetic: false,
        }
    }

    pub fn synthetic(value: T) -> Self {
        Self {
            value,
            synthetic: true,
        }
    }

    /// Label for a fresh cache hit on this value.
    pub fn cached_source(&self) -> DataSource {
        if self.synthetic {
            DataSource::Synthetic
        } else {
            DataSource::Cached
        }
    }
}

/// The shape of a provider answer that was received and decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Data(T),
    /// Call frequency or quota advisory.
    Throttled(String),
    /// Explicit error message from the provider.
    Failed(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches the real-time exchange rate as the provider encodes it.
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<Reply<String>, QuoteError>;

    /// Fetches the compact daily series, most recent ~100 observations.
    async fn fetch_daily_series(
        &self,
        pair: &CurrencyPair,
    ) -> Result<Reply<Vec<DailyRecord>>, QuoteError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Live,
    /// Within TTL, either fetched earlier or loaded from the snapshot.
    Cached,
    /// Past TTL, served because the provider throttled the request.
    Stale,
    Synthetic,
}

impl Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataSource::Live => "live",
                DataSource::Cached => "cached",
                DataSource::Stale => "stale",
                DataSource::Synthetic => "synthetic",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub source: DataSource,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub points: Vec<PricePoint>,
    pub source: DataSource,
}
