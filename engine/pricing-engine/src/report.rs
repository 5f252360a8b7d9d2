//! Reporting over solver output.
//!
//! Summaries and rankings built on top of batch and comparative results.
//! None of this feeds back into the solver.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculator::round_half_up;
use crate::models::{BatchLine, PlatformQuote, PricingResult};

/// Realized margin may drift this far (in percentage points) from the target
/// before callers should flag it
pub const MARGIN_DRIFT_WARN_PCT: Decimal = Decimal::ONE;

/// Aggregate figures for a priced batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Lines that produced a feasible price
    pub priced: usize,
    /// Lines rejected by validation or infeasible
    pub skipped: usize,
    pub total_net_profit: Decimal,
    pub average_margin_pct: Decimal,
    pub average_price: Decimal,
}

impl BatchSummary {
    pub fn from_lines(lines: &[BatchLine]) -> Self {
        let feasible: Vec<&PricingResult> = lines
            .iter()
            .filter_map(|line| line.outcome.as_ref().ok())
            .filter(|result| !result.is_infeasible())
            .collect();

        let priced = feasible.len();
        let total_net_profit: Decimal = feasible.iter().map(|r| r.net_profit).sum();
        let (average_margin_pct, average_price) = if priced == 0 {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            let count = Decimal::from(priced);
            let margin_sum: Decimal = feasible.iter().map(|r| r.realized_margin_pct).sum();
            let price_sum: Decimal = feasible.iter().map(|r| r.suggested_price).sum();
            (round_half_up(margin_sum / count, 2), round_half_up(price_sum / count, 2))
        };

        Self {
            priced,
            skipped: lines.len() - priced,
            total_net_profit,
            average_margin_pct,
            average_price,
        }
    }
}

/// A feasible platform quote, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlatform {
    pub platform: String,
    pub result: PricingResult,
}

/// Feasible quotes ordered by net profit, best first.
///
/// Ties keep the input order. Infeasible and invalid quotes are left out.
pub fn rank_platforms(quotes: &[PlatformQuote]) -> Vec<RankedPlatform> {
    let mut ranked: Vec<RankedPlatform> = quotes
        .iter()
        .filter_map(|quote| match &quote.outcome {
            Ok(result) if !result.is_infeasible() => Some(RankedPlatform {
                platform: quote.platform.clone(),
                result: result.clone(),
            }),
            _ => None,
        })
        .collect();
    ranked.sort_by(|a, b| b.result.net_profit.cmp(&a.result.net_profit));
    ranked
}

/// Best-versus-worst comparison across ranked platforms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonInsight {
    pub best_platform: String,
    pub worst_platform: String,
    pub profit_difference: Decimal,
    /// Difference relative to the worst platform's profit; zero when that profit is not positive
    pub difference_pct: Decimal,
    pub average_fee_pct: Decimal,
}

impl ComparisonInsight {
    /// `None` when no platform produced a feasible price
    pub fn from_ranked(ranked: &[RankedPlatform]) -> Option<Self> {
        let best = ranked.first()?;
        let worst = ranked.last()?;

        let profit_difference = best.result.net_profit - worst.result.net_profit;
        let difference_pct = if worst.result.net_profit > Decimal::ZERO {
            round_half_up(profit_difference / worst.result.net_profit * Decimal::ONE_HUNDRED, 2)
        } else {
            Decimal::ZERO
        };
        let fee_sum: Decimal = ranked.iter().map(|r| r.result.percentage_fee_pct).sum();
        let average_fee_pct = round_half_up(fee_sum / Decimal::from(ranked.len()), 2);

        Some(Self {
            best_platform: best.platform.clone(),
            worst_platform: worst.platform.clone(),
            profit_difference,
            difference_pct,
            average_fee_pct,
        })
    }
}

/// Realized minus target margin, in percentage points
pub fn margin_drift(result: &PricingResult, target_margin: Decimal) -> Decimal {
    result.realized_margin_pct - target_margin * Decimal::ONE_HUNDRED
}

/// Whether the realized margin drifted past [`MARGIN_DRIFT_WARN_PCT`]
pub fn margin_drifted(result: &PricingResult, target_margin: Decimal) -> bool {
    !result.is_infeasible() && margin_drift(result, target_margin).abs() > MARGIN_DRIFT_WARN_PCT
}
