//! Quote client: cached, snapshot-backed access to rates and daily series

use crate::core::cache::TimedCache;
use crate::core::error::QuoteError;
use crate::core::pair::CurrencyPair;
use crate::core::quote::{
    DataSource, Labeled, PricePoint, PriceQuote, QuoteProvider, Reply, Series, finite,
};
use crate::core::snapshot::Snapshot;
use crate::core::synthetic;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Informational error text set when a throttled request is answered from a
/// stale cache entry.
pub const STALE_DATA_NOTICE: &str = "API rate limit reached, serving cached data";

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub price_ttl: Duration,
    pub history_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            price_ttl: Duration::from_secs(5 * 60),
            history_ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Fields observed by the front-end. Only the two fetch operations write them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub is_synthetic: bool,
}

pub struct QuoteClient {
    provider: Arc<dyn QuoteProvider>,
    snapshot: Snapshot,
    prices: TimedCache<Labeled<f64>>,
    series: TimedCache<Labeled<Vec<PricePoint>>>,
    settings: CacheSettings,
    session: watch::Sender<SessionState>,
}

impl QuoteClient {
    /// Creates a client and seeds its caches from the snapshot of each
    /// tracked pair. Seeded entries are stamped with the load time and keep
    /// their synthetic label.
    pub async fn new(
        provider: Arc<dyn QuoteProvider>,
        snapshot: Snapshot,
        tracked: &[CurrencyPair],
        settings: CacheSettings,
    ) -> Self {
        let (session, _) = watch::channel(SessionState::default());
        let client = Self {
            provider,
            snapshot,
            prices: TimedCache::new(),
            series: TimedCache::new(),
            settings,
            session,
        };

        for pair in tracked {
            let symbol = pair.to_string();
            if let Some(points) = client.snapshot.load_series(&symbol).await
                && !points.value.is_empty()
            {
                debug!(
                    %symbol,
                    points = points.value.len(),
                    synthetic = points.synthetic,
                    "Loaded series snapshot"
                );
                client.series.put(&symbol, points).await;
            }
            if let Some(price) = client.snapshot.load_price(&symbol).await {
                debug!(
                    %symbol,
                    price = price.value,
                    synthetic = price.synthetic,
                    "Loaded price snapshot"
                );
                client.prices.put(&symbol, price).await;
            }
        }

        client
    }

    /// Current session fields.
    pub fn session(&self) -> SessionState {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// Runs [`QuoteClient::current_price`] on a background task. The result
    /// is also published to subscribers.
    pub fn spawn_current_price(
        self: &Arc<Self>,
        symbol: &str,
    ) -> JoinHandle<Result<PriceQuote, QuoteError>> {
        let client = Arc::clone(self);
        let symbol = symbol.to_string();
        tokio::spawn(async move { client.current_price(&symbol).await })
    }

    #[instrument(name = "CurrentPriceFetch", skip(self), fields(symbol = %symbol))]
    pub async fn current_price(&self, symbol: &str) -> Result<PriceQuote, QuoteError> {
        let pair = self.parse_pair(symbol)?;
        let key = pair.to_string();

        if let Some(cached) = self.prices.get_fresh(&key, self.settings.price_ttl).await {
            let now = Utc::now();
            self.session.send_modify(|s| {
                s.current_price = Some(cached.value);
                s.last_updated = Some(now);
                s.last_error = None;
                s.is_synthetic = cached.synthetic;
            });
            return Ok(PriceQuote {
                symbol: key,
                price: cached.value,
                change: None,
                change_percent: None,
                source: cached.cached_source(),
                updated_at: now,
            });
        }

        let previous = self.prices.get(&key).await.map(|entry| entry.value);
        match self.provider.fetch_rate(&pair).await {
            Err(e) => {
                warn!(error = %e, "Rate request failed");
                Err(self.record_error(e))
            }
            Ok(Reply::Failed(message)) => {
                warn!(%message, "Provider returned an error");
                Err(self.record_error(QuoteError::Upstream(message)))
            }
            Ok(Reply::Throttled(note)) => {
                info!(%note, "Rate request throttled");
                Ok(self.serve_throttled_price(key, previous).await)
            }
            Ok(Reply::Data(raw)) => match parse_rate(&raw) {
                Ok(rate) => Ok(self.store_live_price(key, rate, previous).await),
                Err(e) => Err(self.record_error(e)),
            },
        }
    }

    #[instrument(name = "HistoricalSeriesFetch", skip(self), fields(symbol = %symbol))]
    pub async fn historical_series(&self, symbol: &str) -> Result<Series, QuoteError> {
        let pair = self.parse_pair(symbol)?;
        let key = pair.to_string();

        if let Some(cached) = self.series.get_fresh(&key, self.settings.history_ttl).await {
            self.session.send_modify(|s| s.is_synthetic = cached.synthetic);
            return Ok(Series {
                symbol: key,
                source: cached.cached_source(),
                points: cached.value,
            });
        }

        match self.provider.fetch_daily_series(&pair).await {
            Err(e) => {
                warn!(error = %e, "Series request failed, using synthetic data");
                Ok(self.synthetic_series(key).await)
            }
            Ok(Reply::Failed(message)) => {
                warn!(%message, "Provider returned an error");
                Err(self.record_error(QuoteError::Upstream(message)))
            }
            Ok(Reply::Throttled(note)) => {
                info!(%note, "Series request throttled, using synthetic data");
                Ok(self.synthetic_series(key).await)
            }
            Ok(Reply::Data(records)) => {
                let total = records.len();
                let mut points: Vec<PricePoint> = records
                    .iter()
                    .filter_map(|record| {
                        let point = record.to_point();
                        if point.is_none() {
                            debug!(?record, "Dropping unparsable record");
                        }
                        point
                    })
                    .collect();
                points.sort_by_key(|p| p.date);

                if points.is_empty() {
                    warn!(records = total, "No usable records in series response");
                } else {
                    debug!(points = points.len(), records = total, "Parsed series");
                    let labeled = Labeled::real(points.clone());
                    self.series.put(&key, labeled.clone()).await;
                    self.snapshot.save_series(&key, &labeled).await;
                    self.session.send_modify(|s| {
                        s.is_synthetic = false;
                        s.last_error = None;
                    });
                }

                Ok(Series {
                    symbol: key,
                    points,
                    source: DataSource::Live,
                })
            }
        }
    }

    fn parse_pair(&self, symbol: &str) -> Result<CurrencyPair, QuoteError> {
        symbol.parse().map_err(|e| self.record_error(e))
    }

    fn record_error(&self, error: QuoteError) -> QuoteError {
        let message = error.to_string();
        self.session.send_modify(|s| s.last_error = Some(message));
        error
    }

    async fn store_live_price(
        &self,
        key: String,
        rate: f64,
        previous: Option<Labeled<f64>>,
    ) -> PriceQuote {
        let previous = previous.map(|p| p.value);
        let change = previous.map(|p| rate - p);
        let change_percent = previous
            .filter(|p| *p != 0.0)
            .map(|p| (rate - p) / p * 100.0);
        let now = Utc::now();

        self.session.send_modify(|s| {
            s.current_price = Some(rate);
            s.change = change;
            s.change_percent = change_percent;
            s.last_updated = Some(now);
            s.last_error = None;
            s.is_synthetic = false;
        });
        let labeled = Labeled::real(rate);
        self.prices.put(&key, labeled.clone()).await;
        self.snapshot.save_price(&key, &labeled).await;

        PriceQuote {
            symbol: key,
            price: rate,
            change,
            change_percent,
            source: DataSource::Live,
            updated_at: now,
        }
    }

    async fn serve_throttled_price(
        &self,
        key: String,
        previous: Option<Labeled<f64>>,
    ) -> PriceQuote {
        let now = Utc::now();

        if let Some(stale) = previous {
            self.session.send_modify(|s| {
                s.current_price = Some(stale.value);
                s.last_updated = Some(now);
                s.last_error = Some(STALE_DATA_NOTICE.to_string());
                s.is_synthetic = stale.synthetic;
            });
            return PriceQuote {
                symbol: key,
                price: stale.value,
                change: None,
                change_percent: None,
                source: if stale.synthetic {
                    DataSource::Synthetic
                } else {
                    DataSource::Stale
                },
                updated_at: now,
            };
        }

        let price = synthetic::price(&mut rand::thread_rng(), synthetic::DEFAULT_BASE_PRICE);
        warn!(price, "No cached price, using synthetic data");
        self.session.send_modify(|s| {
            s.current_price = Some(price);
            s.change = None;
            s.change_percent = None;
            s.last_updated = Some(now);
            s.last_error = None;
            s.is_synthetic = true;
        });
        let labeled = Labeled::synthetic(price);
        self.prices.put(&key, labeled.clone()).await;
        self.snapshot.save_price(&key, &labeled).await;

        PriceQuote {
            symbol: key,
            price,
            change: None,
            change_percent: None,
            source: DataSource::Synthetic,
            updated_at: now,
        }
    }

    async fn synthetic_series(&self, key: String) -> Series {
        let base = self
            .prices
            .get(&key)
            .await
            .map_or(synthetic::DEFAULT_BASE_PRICE, |entry| entry.value.value);
        let points = synthetic::series(&mut rand::thread_rng(), base, Utc::now().date_naive());

        let labeled = Labeled::synthetic(points.clone());
        self.series.put(&key, labeled.clone()).await;
        self.snapshot.save_series(&key, &labeled).await;
        self.session.send_modify(|s| s.is_synthetic = true);

        Series {
            symbol: key,
            points,
            source: DataSource::Synthetic,
        }
    }
}

fn parse_rate(raw: &str) -> Result<f64, QuoteError> {
    match finite(raw) {
        Some(rate) if rate > 0.0 => Ok(rate),
        _ => Err(QuoteError::Decode(format!("invalid exchange rate '{raw}'"))),
    }
}
