pub mod cache;
pub mod currency;
pub mod error;
pub mod log;
pub mod rates;
