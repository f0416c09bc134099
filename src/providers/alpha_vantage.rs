use crate::core::error::QuoteError;
use crate::core::pair::CurrencyPair;
use crate::core::quote::{DailyRecord, QuoteProvider, Reply};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};

const THROTTLE_PHRASES: [&str; 2] = ["API call frequency", "rate limit"];

#[derive(Debug, Deserialize)]
struct Advisory {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl Advisory {
    fn throttle_notice(&self) -> Option<&str> {
        [self.note.as_deref(), self.information.as_deref()]
            .into_iter()
            .flatten()
            .find(|text| is_throttle_notice(text))
    }
}

fn is_throttle_notice(text: &str) -> bool {
    let lowered = text.to_lowercase();
    THROTTLE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(&phrase.to_lowercase()))
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    #[serde(flatten)]
    advisory: Advisory,
    #[serde(rename = "Realtime Currency Exchange Rate")]
    rate: Option<RateBody>,
}

#[derive(Debug, Deserialize)]
struct RateBody {
    #[serde(rename = "5. Exchange Rate")]
    exchange_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(flatten)]
    advisory: Advisory,
    #[serde(rename = "Time Series FX (Daily)")]
    series: Option<BTreeMap<String, Map<String, Value>>>,
}

/// Reads a field as the provider's string-encoded number. Numbers are
/// accepted as well; anything else yields an empty string and fails to parse
/// later.
fn field(bar: &Map<String, Value>, key: &str) -> String {
    match bar.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn to_record(date: String, bar: &Map<String, Value>) -> DailyRecord {
    DailyRecord {
        date,
        open: field(bar, "1. open"),
        high: field(bar, "2. high"),
        low: field(bar, "3. low"),
        close: field(bar, "4. close"),
        // FX endpoints usually omit volume
        volume: if bar.contains_key("5. volume") {
            field(bar, "5. volume")
        } else {
            "0".to_string()
        },
    }
}

pub struct AlphaVantageProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent("fxwatch/1.0");
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(AlphaVantageProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: builder.build()?,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, QuoteError> {
        let url = format!("{}/query", self.base_url);
        debug!(?params, "Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        debug!(status = %response.status(), "Received Alpha Vantage response");
        if !response.status().is_success() {
            return Err(QuoteError::Status(response.status().as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| QuoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    #[instrument(name = "AlphaVantageRateFetch", skip(self), fields(pair = %pair))]
    async fn fetch_rate(&self, pair: &CurrencyPair) -> Result<Reply<String>, QuoteError> {
        let data: RateResponse = self
            .get_json(&[
                ("function", "CURRENCY_EXCHANGE_RATE"),
                ("from_currency", pair.base.as_str()),
                ("to_currency", pair.quote.as_str()),
            ])
            .await?;

        if let Some(message) = &data.advisory.error_message {
            return Ok(Reply::Failed(message.clone()));
        }
        if let Some(notice) = data.advisory.throttle_notice() {
            return Ok(Reply::Throttled(notice.to_string()));
        }

        data.rate
            .and_then(|body| body.exchange_rate)
            .map(Reply::Data)
            .ok_or_else(|| {
                QuoteError::Decode(format!("No exchange rate found for {}", pair.compact()))
            })
    }

    #[instrument(name = "AlphaVantageDailyFetch", skip(self), fields(pair = %pair))]
    async fn fetch_daily_series(
        &self,
        pair: &CurrencyPair,
    ) -> Result<Reply<Vec<DailyRecord>>, QuoteError> {
        let data: DailyResponse = self
            .get_json(&[
                ("function", "FX_DAILY"),
                ("from_symbol", pair.base.as_str()),
                ("to_symbol", pair.quote.as_str()),
                ("outputsize", "compact"),
            ])
            .await?;

        if let Some(message) = &data.advisory.error_message {
            return Ok(Reply::Failed(message.clone()));
        }
        if let Some(notice) = data.advisory.throttle_notice() {
            return Ok(Reply::Throttled(notice.to_string()));
        }

        let series = data.series.ok_or_else(|| {
            QuoteError::Decode(format!("No daily series found for {}", pair.compact()))
        })?;
        Ok(Reply::Data(
            series
                .into_iter()
                .map(|(date, bar)| to_record(date, &bar))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(function: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", function))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> AlphaVantageProvider {
        AlphaVantageProvider::new(&mock_server.uri(), "test-key", None).unwrap()
    }

    fn eur_usd() -> CurrencyPair {
        "EUR/USD".parse().unwrap()
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "Realtime Currency Exchange Rate": {
                "1. From_Currency Code": "EUR",
                "2. From_Currency Name": "Euro",
                "3. To_Currency Code": "USD",
                "4. To_Currency Name": "United States Dollar",
                "5. Exchange Rate": "1.08540000",
                "6. Last Refreshed": "2024-05-03 14:21:01",
                "7. Time Zone": "UTC",
                "8. Bid Price": "1.08536000",
                "9. Ask Price": "1.08544000"
            }
        }"#;
        let mock_server = create_mock_server("CURRENCY_EXCHANGE_RATE", 200, mock_response).await;

        let reply = provider(&mock_server).fetch_rate(&eur_usd()).await.unwrap();
        assert_eq!(reply, Reply::Data("1.08540000".to_string()));
    }

    #[tokio::test]
    async fn test_rate_request_uses_pair_codes() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("from_currency", "GBP"))
            .and(query_param("to_currency", "JPY"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Realtime Currency Exchange Rate": {"5. Exchange Rate": "191.2"}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let pair: CurrencyPair = "GBP/JPY".parse().unwrap();
        let reply = provider(&mock_server).fetch_rate(&pair).await.unwrap();
        assert_eq!(reply, Reply::Data("191.2".to_string()));
    }

    #[tokio::test]
    async fn test_api_key_is_url_encoded() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "CURRENCY_EXCHANGE_RATE"))
            .and(query_param("apikey", "a&b=c d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"Realtime Currency Exchange Rate": {"5. Exchange Rate": "1.1"}}"#,
            ))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = AlphaVantageProvider::new(&mock_server.uri(), "a&b=c d", None).unwrap();
        let reply = provider.fetch_rate(&eur_usd()).await.unwrap();
        assert_eq!(reply, Reply::Data("1.1".to_string()));
    }

    #[tokio::test]
    async fn test_daily_request_asks_for_compact_output() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "FX_DAILY"))
            .and(query_param("from_symbol", "USD"))
            .and(query_param("to_symbol", "CHF"))
            .and(query_param("outputsize", "compact"))
            .and(query_param("apikey", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"Time Series FX (Daily)": {}}"#),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let pair: CurrencyPair = "USD/CHF".parse().unwrap();
        let reply = provider(&mock_server)
            .fetch_daily_series(&pair)
            .await
            .unwrap();
        assert_eq!(reply, Reply::Data(Vec::new()));
    }

    #[tokio::test]
    async fn test_rate_throttled() {
        let mock_response = r#"{
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute and 500 calls per day."
        }"#;
        let mock_server = create_mock_server("CURRENCY_EXCHANGE_RATE", 200, mock_response).await;

        let reply = provider(&mock_server).fetch_rate(&eur_usd()).await.unwrap();
        assert!(matches!(reply, Reply::Throttled(note) if note.contains("API call frequency")));
    }

    #[tokio::test]
    async fn test_information_rate_limit_is_throttled() {
        let mock_response = r#"{
            "Information": "We have detected your API key and our standard API rate limit is 25 requests per day."
        }"#;
        let mock_server = create_mock_server("FX_DAILY", 200, mock_response).await;

        let reply = provider(&mock_server)
            .fetch_daily_series(&eur_usd())
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Throttled(_)));
    }

    #[tokio::test]
    async fn test_rate_error_message() {
        let mock_response = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
        let mock_server = create_mock_server("CURRENCY_EXCHANGE_RATE", 200, mock_response).await;

        let reply = provider(&mock_server).fetch_rate(&eur_usd()).await.unwrap();
        assert_eq!(
            reply,
            Reply::Failed("Invalid API call. Please retry or visit the documentation.".to_string())
        );
    }

    #[tokio::test]
    async fn test_unrelated_note_without_data_is_a_decode_error() {
        let mock_response = r#"{"Note": "Scheduled maintenance tonight."}"#;
        let mock_server = create_mock_server("CURRENCY_EXCHANGE_RATE", 200, mock_response).await;

        let result = provider(&mock_server).fetch_rate(&eur_usd()).await;
        assert_eq!(
            result,
            Err(QuoteError::Decode("No exchange rate found for EURUSD".to_string()))
        );
    }

    #[tokio::test]
    async fn test_rate_server_error() {
        let mock_server = create_mock_server("CURRENCY_EXCHANGE_RATE", 500, "").await;

        let result = provider(&mock_server).fetch_rate(&eur_usd()).await;
        assert_eq!(result, Err(QuoteError::Status(500)));
        assert_eq!(result.unwrap_err().to_string(), "HTTP error: 500");
    }

    #[tokio::test]
    async fn test_rate_malformed_response() {
        let mock_server =
            create_mock_server("CURRENCY_EXCHANGE_RATE", 200, "<html>oops</html>").await;

        let result = provider(&mock_server).fetch_rate(&eur_usd()).await;
        assert!(matches!(result, Err(QuoteError::Decode(_))));
    }

    #[tokio::test]
    async fn test_rate_transport_error() {
        // Nothing listens on the discard port
        let provider = AlphaVantageProvider::new("http://127.0.0.1:9", "test-key", None).unwrap();

        let result = provider.fetch_rate(&eur_usd()).await;
        assert!(matches!(result, Err(QuoteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_successful_daily_fetch() {
        let mock_response = r#"{
            "Meta Data": {
                "1. Information": "Forex Daily Prices (open, high, low, close)",
                "2. From Symbol": "EUR",
                "3. To Symbol": "USD",
                "4. Output Size": "Compact",
                "5. Last Refreshed": "2024-05-03 14:20:00",
                "6. Time Zone": "UTC"
            },
            "Time Series FX (Daily)": {
                "2024-05-03": {
                    "1. open": "1.07270",
                    "2. high": "1.08110",
                    "3. low": "1.07200",
                    "4. close": "1.07980",
                    "5. volume": "1520"
                },
                "2024-05-02": {
                    "1. open": "1.07120",
                    "2. high": "1.07300",
                    "3. low": "1.06800",
                    "4. close": "1.07270"
                }
            }
        }"#;
        let mock_server = create_mock_server("FX_DAILY", 200, mock_response).await;

        let reply = provider(&mock_server)
            .fetch_daily_series(&eur_usd())
            .await
            .unwrap();
        let Reply::Data(records) = reply else {
            panic!("Expected series data");
        };

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, "2024-05-02");
        assert_eq!(records[0].volume, "0");
        assert_eq!(records[1].open, "1.07270");
        assert_eq!(records[1].volume, "1520");
        assert!(records.iter().all(|r| r.to_point().is_some()));
    }

    #[tokio::test]
    async fn test_daily_fetch_keeps_malformed_records_as_strings() {
        let mock_response = r#"{
            "Time Series FX (Daily)": {
                "2024-05-03": {"1. open": "1.0", "2. high": "1.1", "3. low": null, "4. close": "1.05"},
                "2024-05-02": {"1. open": 1.0, "2. high": 1.1, "3. low": 0.9, "4. close": 1.05}
            }
        }"#;
        let mock_server = create_mock_server("FX_DAILY", 200, mock_response).await;

        let reply = provider(&mock_server)
            .fetch_daily_series(&eur_usd())
            .await
            .unwrap();
        let Reply::Data(records) = reply else {
            panic!("Expected series data");
        };

        assert!(records[0].to_point().is_some());
        assert_eq!(records[1].low, "");
        assert!(records[1].to_point().is_none());
    }

    // FX daily bars carry no volume field; those rows are kept with zero
    // volume instead of being dropped as incomplete.
    #[tokio::test]
    async fn test_missing_volume_defaults_to_zero_but_bad_volume_drops_record() {
        let mock_response = r#"{
            "Time Series FX (Daily)": {
                "2024-05-02": {"1. open": "1.07", "2. high": "1.08", "3. low": "1.06", "4. close": "1.075"},
                "2024-05-03": {"1. open": "1.07", "2. high": "1.08", "3. low": "1.06", "4. close": "1.075", "5. volume": "n/a"}
            }
        }"#;
        let mock_server = create_mock_server("FX_DAILY", 200, mock_response).await;

        let reply = provider(&mock_server)
            .fetch_daily_series(&eur_usd())
            .await
            .unwrap();
        let Reply::Data(records) = reply else {
            panic!("Expected series data");
        };

        assert_eq!(records[0].volume, "0");
        assert_eq!(records[0].to_point().map(|p| p.volume), Some(0.0));
        assert_eq!(records[1].volume, "n/a");
        assert!(records[1].to_point().is_none());
    }

    #[tokio::test]
    async fn test_daily_error_message() {
        let mock_response = r#"{"Error Message": "Invalid API call."}"#;
        let mock_server = create_mock_server("FX_DAILY", 200, mock_response).await;

        let reply = provider(&mock_server)
            .fetch_daily_series(&eur_usd())
            .await
            .unwrap();
        assert_eq!(reply, Reply::Failed("Invalid API call.".to_string()));
    }

    #[tokio::test]
    async fn test_daily_missing_series_is_a_decode_error() {
        let mock_server = create_mock_server("FX_DAILY", 200, r#"{"Meta Data": {}}"#).await;

        let result = provider(&mock_server).fetch_daily_series(&eur_usd()).await;
        assert_eq!(
            result,
            Err(QuoteError::Decode("No daily series found for EURUSD".to_string()))
        );
    }
}
