//! Core domain types and logic.

pub mod config_validation;
pub mod criteria;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod registry;
pub mod result;
pub mod scanner;
