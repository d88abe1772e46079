//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use error::RatesError;
pub use rates::{BASE_CURRENCY, CurrencyRate, RateSnapshot, RatesProvider, convert, currency_list};
