//! Pricing Engine
//!
//! Fee-aware price solver for marketplace sellers. Given a product's cost and
//! shipping, a platform's fee rules (fixed, percentage, conditional,
//! prioritized) and a target net margin, it solves for the sale price and
//! returns the full breakdown: fees charged, net profit and realized margin.
//!
//! The solver is a pure function of its request. Batch and comparative
//! variants fan out over independent requests; memoization and reporting
//! are layered on top without touching the core computation.

pub mod batch;
pub mod cache;
pub mod calculator;
pub mod condition;
pub mod config;
pub mod error;
pub mod models;
pub mod report;

#[cfg(test)]
mod tests;

pub use cache::{CacheStats, PricingCache};
pub use calculator::{
    accumulate_fees, order_by_priority, round_half_up, solve, FeeTotals, PriceSolver,
};
pub use condition::{evaluate_condition, ConditionExpr};
pub use config::PricingConfig;
pub use error::{ConditionError, ConfigError, PricingError, Result};
pub use models::*;
pub use report::{rank_platforms, BatchSummary, ComparisonInsight, RankedPlatform};

/// Current version of the pricing engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default decimal places for currency outputs
pub const DEFAULT_CURRENCY_DP: u32 = 2;

/// Default decimal places for percentage outputs
pub const DEFAULT_PERCENT_DP: u32 = 2;

/// Default batch size below which work stays on the calling thread
pub const DEFAULT_MIN_PARALLEL_LEN: usize = 16;

/// Default number of memoized results
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;
