//! Mortgage marketplace service: lender offers, borrower applications, eligibility,
//! match scoring, and amortization quotes.

pub mod config;
pub mod error;
pub mod marketplace;
pub mod telemetry;
