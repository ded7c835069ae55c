//! Common types used across the application.

pub mod currency;
pub mod id;

#[cfg(test)]
mod id_tests;

pub use currency::{CurrencyCode, InvalidCurrencyCode};
pub use id::*;
