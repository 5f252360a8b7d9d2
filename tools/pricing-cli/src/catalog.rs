//! Product and platform catalog loaded from TOML.
//!
//! ```toml
//! [[products]]
//! sku = "CAM-001"
//! name = "Camiseta básica"
//! cost = 35.0
//! shipping = 8.5
//!
//! [[platforms]]
//! name = "Shopee"
//!
//! [[platforms.fees]]
//! label = "Comissão"
//! kind = "percentage"
//! amount = 14
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use pricing_engine::{BatchItem, FeeRule, PlatformFees, ProductRef};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub cost: Decimal,
    #[serde(default)]
    pub shipping: Decimal,
}

impl Product {
    pub fn product_ref(&self) -> ProductRef {
        ProductRef { sku: self.sku.clone(), name: self.name.clone() }
    }

    pub fn batch_item(&self) -> BatchItem {
        BatchItem { product: self.product_ref(), cost: self.cost, shipping: self.shipping }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Platform {
    pub name: String,
    #[serde(default)]
    pub fees: Vec<FeeRule>,
}

impl Platform {
    pub fn platform_fees(&self) -> PlatformFees {
        PlatformFees { platform: self.name.clone(), fees: self.fees.clone() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

impl Catalog {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// SKUs and platform names must be unique; platform names case-insensitively
    fn validate(&self) -> Result<()> {
        let mut skus = HashSet::new();
        for product in &self.products {
            if !skus.insert(product.sku.as_str()) {
                bail!("duplicate SKU {:?}", product.sku);
            }
        }
        let mut names = HashSet::new();
        for platform in &self.platforms {
            if !names.insert(platform.name.to_lowercase()) {
                bail!("duplicate platform {:?}", platform.name);
            }
        }
        Ok(())
    }

    pub fn product(&self, sku: &str) -> Result<&Product> {
        self.products
            .iter()
            .find(|p| p.sku == sku)
            .ok_or_else(|| anyhow!("unknown SKU {sku:?}"))
    }

    pub fn platform(&self, name: &str) -> Result<&Platform> {
        self.platforms
            .iter()
            .find(|p| p.name.to_lowercase() == name.to_lowercase())
            .ok_or_else(|| anyhow!("unknown platform {name:?}"))
    }

    /// Products for a batch run; every product when `skus` is empty
    pub fn batch_items(&self, skus: &[String]) -> Result<Vec<BatchItem>> {
        if skus.is_empty() {
            return Ok(self.products.iter().map(Product::batch_item).collect());
        }
        skus.iter().map(|sku| self.product(sku).map(Product::batch_item)).collect()
    }

    pub fn platform_fees(&self) -> Vec<PlatformFees> {
        self.platforms.iter().map(Platform::platform_fees).collect()
    }
}
