use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Reason attached to every infeasible result
pub const INFEASIBLE_REASON: &str = "target margin plus percentage fees meet or exceed 100%";

/// How a fee rule charges the seller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeKind {
    /// Flat amount in currency units
    #[serde(alias = "fixa")]
    Fixed,
    /// Percentage points of the sale price (15 = 15%)
    #[serde(alias = "percentual")]
    Percentage,
}

/// One fee a sales platform may charge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeeRule {
    #[serde(default)]
    pub label: String,
    pub kind: FeeKind,
    pub amount: Decimal,
    /// Predicate over the total cost; absent or blank means "always"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Lower values are evaluated first; unset sorts after every explicit priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl FeeRule {
    /// Flat fee in currency units
    pub fn fixed(amount: Decimal) -> Self {
        Self {
            label: String::new(),
            kind: FeeKind::Fixed,
            amount,
            condition: None,
            priority: None,
            active: true,
        }
    }

    /// Percentage fee, given in percentage points
    pub fn percentage(points: Decimal) -> Self {
        Self { kind: FeeKind::Percentage, ..Self::fixed(points) }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// The condition text, if one is present and not blank
    pub fn condition_text(&self) -> Option<&str> {
        self.condition.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Contribution to the percentage total, as a fraction
    pub fn rate(&self) -> Decimal {
        match self.kind {
            FeeKind::Fixed => Decimal::ZERO,
            FeeKind::Percentage => self.amount / Decimal::ONE_HUNDRED,
        }
    }
}

/// The solver's single input unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingRequest {
    pub cost: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
    #[serde(default)]
    pub fees: Vec<FeeRule>,
    /// Desired net margin as a fraction of the final sale price
    pub target_margin: Decimal,
}

impl PricingRequest {
    pub fn new(cost: Decimal, shipping: Decimal, target_margin: Decimal) -> Self {
        Self { cost, shipping, fees: Vec::new(), target_margin }
    }

    pub fn with_fees(mut self, fees: Vec<FeeRule>) -> Self {
        self.fees = fees;
        self
    }

    pub fn total_cost(&self) -> Decimal {
        self.cost + self.shipping
    }

    /// Reject malformed input before any computation
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.cost < Decimal::ZERO {
            return Err(PricingError::NegativeCost);
        }
        if self.shipping < Decimal::ZERO {
            return Err(PricingError::NegativeShipping);
        }
        if self.target_margin < Decimal::ZERO || self.target_margin >= Decimal::ONE {
            return Err(PricingError::MarginOutOfRange);
        }
        for (index, fee) in self.fees.iter().enumerate() {
            if fee.amount < Decimal::ZERO {
                return Err(PricingError::NegativeFeeAmount { index, label: fee.label.clone() });
            }
        }
        Ok(())
    }
}

/// A rule that contributed to the price, with its charge at the suggested price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedFee {
    pub label: String,
    pub kind: FeeKind,
    pub amount: Decimal,
    pub priority: Option<i32>,
    pub charge: Decimal,
}

/// A rule skipped because its condition could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeWarning {
    /// Position of the rule in the request's fee list
    pub index: usize,
    pub label: String,
    pub condition: String,
    pub message: String,
}

/// Why no finite price satisfies the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infeasibility {
    pub reason: String,
    pub target_margin: Decimal,
    pub percentage_fee_total: Decimal,
}

/// Solver output; every field is derived from the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub total_cost: Decimal,
    pub fixed_fee_total: Decimal,
    /// Sum of applied percentage fees as a fraction (two 10% fees -> 0.20)
    pub percentage_fee_total: Decimal,
    /// Same total in percentage points, rounded for display
    pub percentage_fee_pct: Decimal,
    pub suggested_price: Decimal,
    pub fee_amount: Decimal,
    pub net_profit: Decimal,
    pub realized_margin_pct: Decimal,
    pub infeasibility: Option<Infeasibility>,
    pub applied_fees: Vec<AppliedFee>,
    pub warnings: Vec<FeeWarning>,
}

impl PricingResult {
    pub fn is_infeasible(&self) -> bool {
        self.infeasibility.is_some()
    }
}

/// Identifies a product in batch output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductRef {
    pub sku: String,
    #[serde(default)]
    pub name: String,
}

/// One product in a batch sharing a fee set and margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub product: ProductRef,
    pub cost: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
}

/// Batch output for one product, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLine {
    pub product: ProductRef,
    pub outcome: Result<PricingResult, PricingError>,
}

/// Fee set of a single sales platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformFees {
    pub platform: String,
    #[serde(default)]
    pub fees: Vec<FeeRule>,
}

/// Comparative output for one platform
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformQuote {
    pub platform: String,
    pub outcome: Result<PricingResult, PricingError>,
}

/// A commonly charged fee, offered as a starting point when configuring a platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeSuggestion {
    pub name: &'static str,
    pub kind: FeeKind,
    pub description: &'static str,
}

/// Fees sellers usually have to configure on marketplaces
pub fn fee_suggestions() -> Vec<FeeSuggestion> {
    vec![
        FeeSuggestion {
            name: "Comissão da Plataforma",
            kind: FeeKind::Percentage,
            description: "Base commission charged by the platform",
        },
        FeeSuggestion {
            name: "Taxa por Venda",
            kind: FeeKind::Fixed,
            description: "Flat amount charged per transaction",
        },
        FeeSuggestion {
            name: "Taxa de Anúncio Premium",
            kind: FeeKind::Percentage,
            description: "Extra charge for featured listings",
        },
        FeeSuggestion {
            name: "Taxa de Processamento",
            kind: FeeKind::Percentage,
            description: "Payment processing fee",
        },
        FeeSuggestion {
            name: "Frete Grátis",
            kind: FeeKind::Fixed,
            description: "Cost of offering free shipping",
        },
        FeeSuggestion {
            name: "Desconto Nível Vendedor",
            kind: FeeKind::Percentage,
            description: "Seller-level adjustment",
        },
    ]
}
