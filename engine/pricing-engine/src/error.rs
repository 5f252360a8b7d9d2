//! Error types for the pricing engine

use thiserror::Error;

/// Result type for pricing operations
pub type Result<T> = std::result::Result<T, PricingError>;

/// Malformed requests rejected before any computation happens
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Product cost must not be negative")]
    NegativeCost,

    #[error("Shipping cost must not be negative")]
    NegativeShipping,

    #[error("Target margin must be within [0, 1)")]
    MarginOutOfRange,

    #[error("Fee rule #{index} ({label:?}) has a negative amount")]
    NegativeFeeAmount { index: usize, label: String },

    #[error("Arithmetic overflow while solving for the price")]
    Overflow,
}

/// Failures while parsing or evaluating a fee condition.
///
/// These never reach the caller of the solver; the affected rule is skipped
/// and the error is reported as a warning on the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    #[error("Empty condition expression")]
    Empty,

    #[error("Unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Invalid number literal {0:?}")]
    InvalidNumber(String),

    #[error("Unknown identifier {0:?}")]
    UnknownIdentifier(String),

    #[error("Unexpected token {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Expression longer than {0} tokens")]
    TooLong(usize),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    Overflow,
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}
