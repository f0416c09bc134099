//! Core business logic abstractions

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod log;
pub mod pair;
pub mod quote;
pub mod snapshot;
pub mod synthetic;

// Re-export main types for cleaner imports
pub use client::{CacheSettings, QuoteClient, SessionState};
pub use error::QuoteError;
pub use pair::CurrencyPair;
pub use quote::{DataSource, PricePoint, PriceQuote, QuoteProvider, Reply, Series};
