//! Spot price source implementations

pub mod coinbase;

pub use coinbase::CoinbaseSource;
