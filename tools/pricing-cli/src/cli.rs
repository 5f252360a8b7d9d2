//! # Command Line Interface
//!
//! Quote, batch and compare prices for a product catalog, and check fee
//! conditions before putting them in a catalog.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use pricing_engine::report::margin_drifted;
use pricing_engine::{
    fee_suggestions, rank_platforms, BatchSummary, ComparisonInsight, ConditionExpr, FeeKind,
    PriceSolver, PricingCache, PricingConfig, PricingRequest, PricingResult,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::format::{format_currency, format_percentage};
use crate::logging::LogFormat;

/// Fee-aware price calculator for marketplace sellers
#[derive(Parser)]
#[command(name = "pricing-cli")]
#[command(about = "Suggest sale prices that hit a target margin after platform fees")]
#[command(version)]
pub struct Cli {
    /// Pricing configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Price one product on one platform
    Quote {
        /// Catalog file (TOML)
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        sku: String,
        #[arg(long)]
        platform: String,
        /// Target margin in percent (0-100)
        #[arg(long)]
        margin: Option<Decimal>,
    },
    /// Price several products on one platform
    Batch {
        /// Catalog file (TOML)
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        platform: String,
        /// Products to price; every product in the catalog when omitted
        #[arg(long)]
        sku: Vec<String>,
        /// Target margin in percent (0-100)
        #[arg(long)]
        margin: Option<Decimal>,
    },
    /// Price one product on every platform and rank by net profit
    Compare {
        /// Catalog file (TOML)
        #[arg(long)]
        catalog: PathBuf,
        #[arg(long)]
        sku: String,
        /// Target margin in percent (0-100)
        #[arg(long)]
        margin: Option<Decimal>,
    },
    /// Validate a fee condition and optionally evaluate it
    Check {
        condition: String,
        /// Total cost to evaluate the condition against
        #[arg(long)]
        value: Option<Decimal>,
    },
    /// List fees marketplaces commonly charge
    Fees,
}

/// Load the pricing configuration: file when given, then `PRICING_*` overrides
pub fn load_config(path: Option<&Path>) -> Result<PricingConfig> {
    let config = match path {
        Some(path) => PricingConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env_overrides()?,
        None => PricingConfig::from_env()?,
    };
    Ok(config)
}

/// Convert a margin entered in percent into the solver's fraction
pub fn margin_fraction(percent: Option<Decimal>, default: Decimal) -> Result<Decimal> {
    match percent {
        Some(percent) => {
            ensure!(
                percent >= Decimal::ZERO && percent < Decimal::ONE_HUNDRED,
                "margin must be at least 0 and below 100, got {percent}"
            );
            Ok(percent / Decimal::ONE_HUNDRED)
        }
        None => Ok(default),
    }
}

/// CLI handler
pub struct CliHandler {
    config: PricingConfig,
    cache: PricingCache,
}

impl CliHandler {
    pub fn new(config: PricingConfig) -> Self {
        let cache = PricingCache::new(PriceSolver::new(config.clone()));
        Self { config, cache }
    }

    fn solver(&self) -> &PriceSolver {
        self.cache.solver()
    }

    /// Handle CLI commands
    pub fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Quote { catalog, sku, platform, margin } => {
                self.quote(&catalog, &sku, &platform, margin)
            }
            Commands::Batch { catalog, platform, sku, margin } => {
                self.batch(&catalog, &platform, &sku, margin)
            }
            Commands::Compare { catalog, sku, margin } => self.compare(&catalog, &sku, margin),
            Commands::Check { condition, value } => self.check(&condition, value),
            Commands::Fees => {
                self.fees();
                Ok(())
            }
        }
    }

    fn load_catalog(&self, path: &Path) -> Result<Catalog> {
        let catalog = Catalog::from_file(path)?;
        info!(
            "Loaded catalog {} ({} products, {} platforms)",
            path.display(),
            catalog.products.len(),
            catalog.platforms.len()
        );
        Ok(catalog)
    }

    fn quote(
        &self,
        catalog: &Path,
        sku: &str,
        platform: &str,
        margin: Option<Decimal>,
    ) -> Result<()> {
        let target_margin = margin_fraction(margin, self.config.defaults.target_margin)?;
        let catalog = self.load_catalog(catalog)?;
        let product = catalog.product(sku)?;
        let platform = catalog.platform(platform)?;

        let request = PricingRequest::new(product.cost, product.shipping, target_margin)
            .with_fees(platform.fees.clone());
        let result = self
            .cache
            .solve(&request)
            .with_context(|| format!("Cannot price {} on {}", product.sku, platform.name))?;

        let heading = format!("{} on {}", display_name(&product.sku, &product.name), platform.name);
        println!("{}", heading.as_str().bold());
        print_result(&result, target_margin);
        debug!("Cache: {:?}", self.cache.stats());
        Ok(())
    }

    fn batch(
        &self,
        catalog: &Path,
        platform: &str,
        skus: &[String],
        margin: Option<Decimal>,
    ) -> Result<()> {
        let target_margin = margin_fraction(margin, self.config.defaults.target_margin)?;
        let catalog = self.load_catalog(catalog)?;
        let platform = catalog.platform(platform)?;
        let items = catalog.batch_items(skus)?;

        let lines = self.solver().solve_batch(&items, &platform.fees, target_margin);

        let heading = format!(
            "{} products on {} at {} margin",
            lines.len(),
            platform.name,
            percent(target_margin)
        );
        println!("{}", heading.as_str().bold());
        for line in &lines {
            let name = display_name(&line.product.sku, &line.product.name);
            match &line.outcome {
                Ok(result) if result.is_infeasible() => {
                    println!("  {:<32} {}", name, "infeasible".red());
                }
                Ok(result) => {
                    let drift = if margin_drifted(result, target_margin) {
                        " (margin drift)".yellow()
                    } else {
                        "".normal()
                    };
                    println!(
                        "  {:<32} {:>16} profit {:>14} margin {:>7}{}",
                        name,
                        format_currency(result.suggested_price).as_str().green(),
                        format_currency(result.net_profit),
                        format_percentage(result.realized_margin_pct),
                        drift
                    );
                }
                Err(err) => println!("  {:<32} {}", name, err.to_string().as_str().red()),
            }
        }

        let summary = BatchSummary::from_lines(&lines);
        println!();
        println!("{}", "Summary".bold());
        println!("  Priced:           {}", summary.priced);
        println!("  Skipped:          {}", summary.skipped);
        println!("  Total profit:     {}", format_currency(summary.total_net_profit));
        println!("  Average margin:   {}", format_percentage(summary.average_margin_pct));
        println!("  Average price:    {}", format_currency(summary.average_price));
        Ok(())
    }

    fn compare(&self, catalog: &Path, sku: &str, margin: Option<Decimal>) -> Result<()> {
        let target_margin = margin_fraction(margin, self.config.defaults.target_margin)?;
        let catalog = self.load_catalog(catalog)?;
        let product = catalog.product(sku)?;

        let quotes = self.solver().compare_platforms(
            product.cost,
            product.shipping,
            &catalog.platform_fees(),
            target_margin,
        );
        let ranked = rank_platforms(&quotes);

        let heading = format!(
            "{} across {} platforms",
            display_name(&product.sku, &product.name),
            quotes.len()
        );
        println!("{}", heading.as_str().bold());
        for (position, entry) in ranked.iter().enumerate() {
            println!(
                "  {}. {:<24} {:>16} profit {:>14} fees {:>7}",
                position + 1,
                entry.platform,
                format_currency(entry.result.suggested_price).as_str().green(),
                format_currency(entry.result.net_profit),
                format_percentage(entry.result.percentage_fee_pct)
            );
        }
        for quote in &quotes {
            match &quote.outcome {
                Ok(result) if result.is_infeasible() => {
                    println!("  -  {:<24} {}", quote.platform, "infeasible".red());
                }
                Err(err) => {
                    println!("  -  {:<24} {}", quote.platform, err.to_string().as_str().red())
                }
                Ok(_) => {}
            }
        }

        if let Some(insight) = ComparisonInsight::from_ranked(&ranked) {
            println!();
            println!("{}", "Insights".bold());
            println!("  Best platform:    {}", insight.best_platform.as_str().green());
            println!("  Worst platform:   {}", insight.worst_platform);
            println!(
                "  Profit gap:       {} ({})",
                format_currency(insight.profit_difference),
                format_percentage(insight.difference_pct)
            );
            println!("  Average fees:     {}", format_percentage(insight.average_fee_pct));
        }
        Ok(())
    }

    fn check(&self, condition: &str, value: Option<Decimal>) -> Result<()> {
        let expr = ConditionExpr::parse(condition)
            .with_context(|| format!("Invalid condition {condition:?}"))?;
        println!("{} {}", "Valid:".green(), expr);
        if !expr.references_cost() {
            println!("  {}", "does not depend on the total cost".yellow());
        }

        if let Some(value) = value {
            let holds = expr
                .evaluate(value)
                .with_context(|| format!("Cannot evaluate {condition:?} at {value}"))?;
            let verdict = if holds { "applies".green() } else { "skipped".red() };
            println!("  at {}: {}", format_currency(value), verdict);
        }
        Ok(())
    }

    fn fees(&self) {
        println!("{}", "Common marketplace fees".bold());
        for suggestion in fee_suggestions() {
            let kind = match suggestion.kind {
                FeeKind::Fixed => "fixed",
                FeeKind::Percentage => "percentage",
            };
            println!("  {:<28} {:<11} {}", suggestion.name, kind, suggestion.description);
        }
    }
}

fn display_name(sku: &str, name: &str) -> String {
    if name.is_empty() {
        sku.to_string()
    } else {
        format!("{sku} {name}")
    }
}

fn percent(fraction: Decimal) -> String {
    format_percentage(fraction * Decimal::ONE_HUNDRED)
}

fn print_result(result: &PricingResult, target_margin: Decimal) {
    if let Some(infeasibility) = &result.infeasibility {
        println!("  {} {}", "Infeasible:".red().bold(), infeasibility.reason);
        println!("  Target margin:    {}", percent(infeasibility.target_margin));
        println!("  Percentage fees:  {}", format_percentage(result.percentage_fee_pct));
    } else {
        println!("  Total cost:       {}", format_currency(result.total_cost));
        println!("  Fixed fees:       {}", format_currency(result.fixed_fee_total));
        println!("  Percentage fees:  {}", format_percentage(result.percentage_fee_pct));
        println!("  Fees charged:     {}", format_currency(result.fee_amount));
        let price = format_currency(result.suggested_price);
        println!("  Suggested price:  {}", price.as_str().green().bold());
        println!("  Net profit:       {}", format_currency(result.net_profit));
        println!("  Realized margin:  {}", format_percentage(result.realized_margin_pct));
        if margin_drifted(result, target_margin) {
            let note = format!("Realized margin drifted from target {}", percent(target_margin));
            println!("  {}", note.as_str().yellow());
        }
    }

    if !result.applied_fees.is_empty() {
        println!("  Applied fees:");
        for fee in &result.applied_fees {
            let label = if fee.label.is_empty() { "(unnamed)" } else { fee.label.as_str() };
            let rate = match fee.kind {
                FeeKind::Fixed => format_currency(fee.amount),
                FeeKind::Percentage => format_percentage(fee.amount),
            };
            println!("    {:<28} {:>12} -> {}", label, rate, format_currency(fee.charge));
        }
    }
    for warning in &result.warnings {
        println!(
            "  {} fee #{} ({}) skipped, condition {:?}: {}",
            "Warning:".yellow(),
            warning.index,
            warning.label,
            warning.condition,
            warning.message
        );
    }
}
