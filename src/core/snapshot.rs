//! Last-known-good snapshot of series and prices per pair

use crate::core::cache::KeyValueCollection;
use crate::core::quote::{Labeled, PricePoint};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

const SYNTHETIC_MARKER: &[u8] = b"true";

pub fn series_key(symbol: &str) -> String {
    format!("lastValidForexData_{symbol}")
}

pub fn price_key(symbol: &str) -> String {
    format!("lastValidForexPrice_{symbol}")
}

/// Present only while the persisted series for the pair is synthetic.
pub fn synthetic_series_key(symbol: &str) -> String {
    format!("syntheticForexData_{symbol}")
}

/// Present only while the persisted price for the pair is synthetic.
pub fn synthetic_price_key(symbol: &str) -> String {
    format!("syntheticForexPrice_{symbol}")
}

/// Durable snapshot store. Entries never expire; each successful fetch
/// overwrites the previous value for the pair.
#[derive(Clone)]
pub struct Snapshot {
    collection: Arc<dyn KeyValueCollection>,
}

impl Snapshot {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    pub async fn load_series(&self, symbol: &str) -> Option<Labeled<Vec<PricePoint>>> {
        self.load(&series_key(symbol), &synthetic_series_key(symbol))
            .await
    }

    pub async fn load_price(&self, symbol: &str) -> Option<Labeled<f64>> {
        self.load(&price_key(symbol), &synthetic_price_key(symbol))
            .await
    }

    pub async fn save_series(&self, symbol: &str, points: &Labeled<Vec<PricePoint>>) {
        self.save(&series_key(symbol), &synthetic_series_key(symbol), points)
            .await
    }

    pub async fn save_price(&self, symbol: &str, price: &Labeled<f64>) {
        self.save(&price_key(symbol), &synthetic_price_key(symbol), price)
            .await
    }

    async fn load<T: DeserializeOwned>(&self, key: &str, marker: &str) -> Option<Labeled<T>> {
        let raw = self.collection.get(key.as_bytes()).await?;
        let value = match serde_json::from_slice(&raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(%key, error = %e, "Ignoring undecodable snapshot");
                return None;
            }
        };
        let synthetic = self.collection.get(marker.as_bytes()).await.is_some();
        Some(Labeled { value, synthetic })
    }

    async fn save<T: Serialize>(&self, key: &str, marker: &str, labeled: &Labeled<T>) {
        let bytes = match serde_json::to_vec(&labeled.value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(%key, error = %e, "Failed to encode snapshot");
                return;
            }
        };

        // A synthetic value is never on disk without its marker
        if labeled.synthetic {
            self.collection
                .put(marker.as_bytes(), SYNTHETIC_MARKER)
                .await;
        }
        self.collection.put(key.as_bytes(), &bytes).await;
        if !labeled.synthetic {
            self.collection.remove(marker.as_bytes()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synthetic;
    use crate::store::memory::MemoryCollection;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[tokio::test]
    async fn test_series_round_trip() {
        let snapshot = Snapshot::new(Arc::new(MemoryCollection::new()));
        let points = vec![
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                open: 1.0 / 3.0,
                high: 2.0 / 3.0,
                low: 0.1 + 0.2,
                close: std::f64::consts::PI / 2.0,
                volume: 0.0,
            },
            PricePoint {
                date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                open: 1.0731,
                high: 1.079 + f64::EPSILON,
                low: f64::MIN_POSITIVE,
                close: 1.0781,
                volume: 1234.5,
            },
        ];

        assert!(snapshot.load_series("EUR/USD").await.is_none());
        snapshot
            .save_series("EUR/USD", &Labeled::real(points.clone()))
            .await;
        assert_eq!(
            snapshot.load_series("EUR/USD").await,
            Some(Labeled::real(points))
        );
    }

    #[tokio::test]
    async fn test_generated_values_round_trip_exactly() {
        let snapshot = Snapshot::new(Arc::new(MemoryCollection::new()));
        let mut rng = StdRng::seed_from_u64(42);
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

        for _ in 0..50 {
            let points = synthetic::series(&mut rng, 1.0 / 7.0, today);
            let price = synthetic::price(&mut rng, 151.0 / 3.0);

            snapshot
                .save_series("USD/JPY", &Labeled::synthetic(points.clone()))
                .await;
            snapshot
                .save_price("USD/JPY", &Labeled::synthetic(price))
                .await;

            let loaded = snapshot.load_series("USD/JPY").await.unwrap();
            assert_eq!(loaded.value, points);
            let loaded = snapshot.load_price("USD/JPY").await.unwrap();
            assert_eq!(loaded.value.to_bits(), price.to_bits());
        }
    }

    #[tokio::test]
    async fn test_price_is_stored_as_raw_number() {
        let collection = Arc::new(MemoryCollection::new());
        let snapshot = Snapshot::new(collection.clone());

        snapshot.save_price("GBP/USD", &Labeled::real(1.2634)).await;

        let raw = collection
            .get(b"lastValidForexPrice_GBP/USD")
            .await
            .unwrap();
        assert_eq!(raw, b"1.2634".to_vec());
        assert_eq!(
            snapshot.load_price("GBP/USD").await,
            Some(Labeled::real(1.2634))
        );
    }

    #[tokio::test]
    async fn test_synthetic_label_survives_until_real_data_replaces_it() {
        let collection = Arc::new(MemoryCollection::new());
        let snapshot = Snapshot::new(collection.clone());

        snapshot.save_price("EUR/USD", &Labeled::synthetic(0.97)).await;
        assert_eq!(
            snapshot.load_price("EUR/USD").await,
            Some(Labeled::synthetic(0.97))
        );
        // The data slot keeps its plain number format
        assert_eq!(
            collection.get(b"lastValidForexPrice_EUR/USD").await,
            Some(b"0.97".to_vec())
        );

        snapshot.save_price("EUR/USD", &Labeled::real(1.0851)).await;
        assert_eq!(
            snapshot.load_price("EUR/USD").await,
            Some(Labeled::real(1.0851))
        );
        assert!(
            collection
                .get(synthetic_price_key("EUR/USD").as_bytes())
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_ignored() {
        let collection = Arc::new(MemoryCollection::new());
        collection
            .put(series_key("EUR/USD").as_bytes(), b"not json")
            .await;

        let snapshot = Snapshot::new(collection);
        assert!(snapshot.load_series("EUR/USD").await.is_none());
        assert!(snapshot.load_price("EUR/USD").await.is_none());
    }
}
