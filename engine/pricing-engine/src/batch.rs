//! Batch and comparative pricing.
//!
//! Both variants are repeated applications of [`PriceSolver::solve`]; each
//! request is independent, so large inputs are spread across the rayon pool.
//! Output order always matches input order.

use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::info;

use crate::calculator::PriceSolver;
use crate::models::*;

impl PriceSolver {
    /// Price several products against one shared fee set and margin
    pub fn solve_batch(
        &self,
        items: &[BatchItem],
        fees: &[FeeRule],
        target_margin: Decimal,
    ) -> Vec<BatchLine> {
        let price_one = |item: &BatchItem| {
            let request = PricingRequest {
                cost: item.cost,
                shipping: item.shipping,
                fees: fees.to_vec(),
                target_margin,
            };
            BatchLine { product: item.product.clone(), outcome: self.solve(&request) }
        };

        let lines: Vec<BatchLine> = if self.run_parallel(items.len()) {
            items.par_iter().map(price_one).collect()
        } else {
            items.iter().map(price_one).collect()
        };

        let priced = lines
            .iter()
            .filter(|line| matches!(&line.outcome, Ok(result) if !result.is_infeasible()))
            .count();
        info!("Batch completed: {} products, {} priced", lines.len(), priced);

        lines
    }

    /// Price one product on every platform, one quote per platform
    pub fn compare_platforms(
        &self,
        cost: Decimal,
        shipping: Decimal,
        platforms: &[PlatformFees],
        target_margin: Decimal,
    ) -> Vec<PlatformQuote> {
        let quote_one = |platform: &PlatformFees| {
            let request = PricingRequest {
                cost,
                shipping,
                fees: platform.fees.clone(),
                target_margin,
            };
            PlatformQuote { platform: platform.platform.clone(), outcome: self.solve(&request) }
        };

        let quotes: Vec<PlatformQuote> = if self.run_parallel(platforms.len()) {
            platforms.par_iter().map(quote_one).collect()
        } else {
            platforms.iter().map(quote_one).collect()
        };

        info!("Compared {} platforms", quotes.len());
        quotes
    }

    fn run_parallel(&self, len: usize) -> bool {
        let batch = &self.config().batch;
        batch.parallel && len >= batch.min_parallel_len.max(2)
    }
}
