use crate::types::SlotKey;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// No rule exists at the exact key. `missing` names the first level
    /// (location, group, month or day) that was absent.
    #[error("No pricing rule configured for {key} (missing {missing})")]
    NotConfigured { key: SlotKey, missing: &'static str },

    #[error("Invalid reference price: {0}")]
    InvalidReference(f64),

    #[error("Persisted document is structurally corrupt: {0}")]
    StructuralCorruption(String),

    /// No usable competitor quote exists to derive a reference price from.
    #[error("No competitor price available for group {0}")]
    NoReferencePrice(String),

    #[error("Rule has no strategies")]
    EmptyRule,

    #[error("Unsupported strategy type: {0}")]
    UnsupportedStrategy(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}
