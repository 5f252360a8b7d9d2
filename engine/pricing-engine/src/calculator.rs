use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use crate::condition::evaluate_condition;
use crate::config::{PricingConfig, RoundingConfig};
use crate::error::{PricingError, Result};
use crate::models::*;

/// Fee-aware price solver.
///
/// Solves `price = total_cost + fixed_fees + price * percent_fees + price * margin`
/// for `price`, i.e. `price = (total_cost + fixed_fees) / (1 - margin - percent_fees)`.
/// All accumulation happens at full precision; outputs are rounded once at the end.
#[derive(Debug, Clone, Default)]
pub struct PriceSolver {
    config: PricingConfig,
}

/// Solve with the default configuration
pub fn solve(request: &PricingRequest) -> Result<PricingResult> {
    PriceSolver::default().solve(request)
}

/// Fee rules in evaluation order, paired with their input position.
///
/// Ascending priority; rules without a priority come after every explicit
/// one. The sort is stable so ties keep input order.
pub fn order_by_priority(fees: &[FeeRule]) -> Vec<(usize, &FeeRule)> {
    let mut ordered: Vec<(usize, &FeeRule)> = fees.iter().enumerate().collect();
    ordered.sort_by_key(|(_, fee)| (fee.priority.is_none(), fee.priority));
    ordered
}

/// Fee totals after filtering by activity and condition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeTotals {
    pub fixed: Decimal,
    /// Fraction, not percentage points
    pub percentage: Decimal,
    /// Input positions of the applied rules, in evaluation order
    pub applied: Vec<usize>,
    pub warnings: Vec<FeeWarning>,
}

/// Walk the rules in priority order and accumulate the ones that apply.
///
/// A rule whose condition cannot be parsed or evaluated is skipped and
/// reported as a warning; it is never applied.
pub fn accumulate_fees(fees: &[FeeRule], total_cost: Decimal) -> Result<FeeTotals> {
    let mut totals = FeeTotals::default();

    for (index, fee) in order_by_priority(fees) {
        if !fee.active {
            debug!("Skipping inactive fee #{} ({})", index, fee.label);
            continue;
        }

        if let Some(condition) = fee.condition_text() {
            match evaluate_condition(condition, total_cost) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        "Fee #{} ({}) not applied: condition {:?} is false for {}",
                        index, fee.label, condition, total_cost
                    );
                    continue;
                }
                Err(err) => {
                    warn!(
                        "Fee #{} ({}) skipped: condition {:?} failed to evaluate: {}",
                        index, fee.label, condition, err
                    );
                    totals.warnings.push(FeeWarning {
                        index,
                        label: fee.label.clone(),
                        condition: condition.to_string(),
                        message: err.to_string(),
                    });
                    continue;
                }
            }
        }

        match fee.kind {
            FeeKind::Fixed => {
                totals.fixed = totals.fixed.checked_add(fee.amount).ok_or(PricingError::Overflow)?;
            }
            FeeKind::Percentage => {
                totals.percentage =
                    totals.percentage.checked_add(fee.rate()).ok_or(PricingError::Overflow)?;
            }
        }
        totals.applied.push(index);
    }

    Ok(totals)
}

impl PriceSolver {
    /// Create a new price solver
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Solve a pricing request.
    ///
    /// Malformed input fails with a [`PricingError`]; a request whose margin and
    /// percentage fees reach 100% returns an infeasible result instead.
    pub fn solve(&self, request: &PricingRequest) -> Result<PricingResult> {
        request.validate()?;

        let total_cost = request.cost.checked_add(request.shipping).ok_or(PricingError::Overflow)?;
        let totals = accumulate_fees(&request.fees, total_cost)?;

        let denominator = Decimal::ONE - request.target_margin - totals.percentage;
        if denominator <= Decimal::ZERO {
            debug!(
                "Infeasible request: margin {} + percentage fees {} >= 1",
                request.target_margin, totals.percentage
            );
            return Ok(self.infeasible(request, total_cost, totals));
        }

        let suggested_price = total_cost
            .checked_add(totals.fixed)
            .and_then(|numerator| numerator.checked_div(denominator))
            .ok_or(PricingError::Overflow)?;
        let fee_amount = suggested_price
            .checked_mul(totals.percentage)
            .and_then(|variable| variable.checked_add(totals.fixed))
            .ok_or(PricingError::Overflow)?;
        let net_profit = suggested_price - total_cost - fee_amount;
        let realized_margin_pct = if suggested_price > Decimal::ZERO {
            net_profit
                .checked_div(suggested_price)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or(PricingError::Overflow)?
        } else {
            Decimal::ZERO
        };

        let mut applied_fees = Vec::with_capacity(totals.applied.len());
        for &index in &totals.applied {
            let fee = &request.fees[index];
            let charge = match fee.kind {
                FeeKind::Fixed => fee.amount,
                FeeKind::Percentage => {
                    suggested_price.checked_mul(fee.rate()).ok_or(PricingError::Overflow)?
                }
            };
            applied_fees.push(AppliedFee {
                label: fee.label.clone(),
                kind: fee.kind,
                amount: fee.amount,
                priority: fee.priority,
                charge: self.currency(charge),
            });
        }

        let result = PricingResult {
            total_cost: self.currency(total_cost),
            fixed_fee_total: self.currency(totals.fixed),
            percentage_fee_total: totals.percentage,
            percentage_fee_pct: self
                .percent(totals.percentage.saturating_mul(Decimal::ONE_HUNDRED)),
            suggested_price: self.currency(suggested_price),
            fee_amount: self.currency(fee_amount),
            net_profit: self.currency(net_profit),
            realized_margin_pct: self.percent(realized_margin_pct),
            infeasibility: None,
            applied_fees,
            warnings: totals.warnings,
        };

        debug!(
            "Solved price {} (total cost {}, fees {}, profit {}, margin {}%)",
            result.suggested_price,
            result.total_cost,
            result.fee_amount,
            result.net_profit,
            result.realized_margin_pct
        );

        Ok(result)
    }

    fn infeasible(
        &self,
        request: &PricingRequest,
        total_cost: Decimal,
        totals: FeeTotals,
    ) -> PricingResult {
        let applied_fees = totals
            .applied
            .iter()
            .map(|&index| {
                let fee = &request.fees[index];
                AppliedFee {
                    label: fee.label.clone(),
                    kind: fee.kind,
                    amount: fee.amount,
                    priority: fee.priority,
                    charge: Decimal::ZERO,
                }
            })
            .collect();

        PricingResult {
            total_cost: self.currency(total_cost),
            fixed_fee_total: self.currency(totals.fixed),
            percentage_fee_total: totals.percentage,
            percentage_fee_pct: self
                .percent(totals.percentage.saturating_mul(Decimal::ONE_HUNDRED)),
            suggested_price: Decimal::ZERO,
            fee_amount: Decimal::ZERO,
            net_profit: Decimal::ZERO,
            realized_margin_pct: Decimal::ZERO,
            infeasibility: Some(Infeasibility {
                reason: INFEASIBLE_REASON.to_string(),
                target_margin: request.target_margin,
                percentage_fee_total: totals.percentage,
            }),
            applied_fees,
            warnings: totals.warnings,
        }
    }

    fn currency(&self, value: Decimal) -> Decimal {
        round_half_up(value, self.config.rounding.currency_dp)
    }

    fn percent(&self, value: Decimal) -> Decimal {
        round_half_up(value, self.config.rounding.percent_dp)
    }
}

impl From<RoundingConfig> for PriceSolver {
    fn from(rounding: RoundingConfig) -> Self {
        Self::new(PricingConfig { rounding, ..PricingConfig::default() })
    }
}

/// Standard half-up rounding (midpoints away from zero)
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}
