//! The error taxonomy of §7: most failures in this engine are reported
//! through `log::warn!` and repaired in place (programmer errors, data
//! invariant violations that have an obvious tolerant fallback); only the
//! subset that must actually stop a caller is a `LedgerError`.

use crate::numeric::Numeric;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("numeric overflow")]
    Overflow,

    #[error("value cannot be represented exactly at the requested denominator")]
    InexactConversion,

    #[error("transaction does not balance: imbalance = {imbalance:?}")]
    Unbalanced { imbalance: Numeric },

    #[error("'{0}' is not a valid reconcile flag")]
    InvalidReconcileFlag(char),

    #[error("transaction is read-only: {reason}")]
    ReadOnly { reason: String },

    #[error("back-end reports this transaction was modified by another user")]
    BackendModified,

    #[error("back-end reports this transaction was deleted by another user")]
    BackendModDestroy,

    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
