//! Key-value property frames (§3 C4): a nested bag of named slots used to
//! carry the handful of out-of-band facts the core needs without a full
//! schema — due dates, void metadata, gains linkage, SX templates. spec
//! §1's Non-goals exclude a query/registration layer; this is direct
//! get/set by slash-separated path, mirroring the flat accessor style
//! `commodities.rs`/`accounts.rs` use for their own fields rather than
//! GnuCash's full `kvp_frame` query API.
//!
//! A handful of slot names are part of the on-disk format this core's
//! ancestor persists and are preserved bit-for-bit (§9): `trans-date-due`,
//! `trans-txn-type`, `trans-read-only`, `notes`, `void-reason`,
//! `void-time`, `void-former-amount`, `void-former-value`,
//! `void-former-notes`, `gains-source`, `split-type`. The SX template
//! namespace is *not* preserved verbatim — `GNC_SX_ID` and its siblings in
//! `examples/original_source/src/engine/SchedXaction.c` are GnuCash's own
//! concrete file-format strings, meaningless outside the persistence layer
//! this crate doesn't implement, so they're renamed to `sx-template/*`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::guid::Guid;
use crate::numeric::Numeric;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KvpValue {
    Str(String),
    Numeric(Numeric),
    Timespec(DateTime<Utc>),
    Guid(Guid),
    Frame(KvpFrame),
}

/// A nested, path-addressed property bag. Paths are slash-separated,
/// e.g. `"sx-template/credit-formula"` addresses the `credit-formula` slot
/// of the nested frame at `sx-template`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KvpFrame {
    slots: BTreeMap<String, KvpValue>,
}

impl KvpFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn set(&mut self, path: &str, value: KvpValue) {
        match path.split_once('/') {
            None => {
                self.slots.insert(path.to_string(), value);
            }
            Some((head, rest)) => {
                let entry = self
                    .slots
                    .entry(head.to_string())
                    .or_insert_with(|| KvpValue::Frame(KvpFrame::new()));
                if let KvpValue::Frame(frame) = entry {
                    frame.set(rest, value);
                } else {
                    let mut frame = KvpFrame::new();
                    frame.set(rest, value);
                    *entry = KvpValue::Frame(frame);
                }
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&KvpValue> {
        match path.split_once('/') {
            None => self.slots.get(path),
            Some((head, rest)) => match self.slots.get(head) {
                Some(KvpValue::Frame(frame)) => frame.get(rest),
                _ => None,
            },
        }
    }

    /// Removes a slot; returns whether anything was present. Clearing a
    /// slot is how void/unvoid discard their stashed `void-former-*` trio.
    pub fn remove(&mut self, path: &str) -> bool {
        match path.split_once('/') {
            None => self.slots.remove(path).is_some(),
            Some((head, rest)) => match self.slots.get_mut(head) {
                Some(KvpValue::Frame(frame)) => frame.remove(rest),
                _ => false,
            },
        }
    }

    pub fn get_string(&self, path: &str) -> Option<&str> {
        match self.get(path) {
            Some(KvpValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_numeric(&self, path: &str) -> Option<Numeric> {
        match self.get(path) {
            Some(KvpValue::Numeric(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn get_timespec(&self, path: &str) -> Option<DateTime<Utc>> {
        match self.get(path) {
            Some(KvpValue::Timespec(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Preserved bit-for-bit per §9 — these name the on-disk slots this
/// core's void/reverse/gains logic must keep spelling exactly this way.
pub mod slots {
    pub const TRANS_DATE_DUE: &str = "trans-date-due";
    pub const TRANS_TXN_TYPE: &str = "trans-txn-type";
    pub const TRANS_READ_ONLY: &str = "trans-read-only";
    pub const NOTES: &str = "notes";
    pub const VOID_REASON: &str = "void-reason";
    pub const VOID_TIME: &str = "void-time";
    pub const VOID_FORMER_AMOUNT: &str = "void-former-amount";
    pub const VOID_FORMER_VALUE: &str = "void-former-value";
    pub const VOID_FORMER_NOTES: &str = "void-former-notes";
    pub const GAINS_SOURCE: &str = "gains-source";
    pub const SPLIT_TYPE: &str = "split-type";
    pub const SPLIT_TYPE_STOCK_SPLIT: &str = "stock-split";

    // SX template namespace, renamed from GnuCash's `GNC_SX_ID` family
    // (§9) — not a persisted format outside this core.
    pub const SX_TEMPLATE_CREDIT_FORMULA: &str = "sx-template/credit-formula";
    pub const SX_TEMPLATE_DEBIT_FORMULA: &str = "sx-template/debit-formula";
    pub const SX_TEMPLATE_ACCOUNT: &str = "sx-template/account";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_set_get() {
        let mut frame = KvpFrame::new();
        frame.set(slots::NOTES, KvpValue::Str("hello".into()));
        assert_eq!(frame.get_string(slots::NOTES), Some("hello"));
    }

    #[test]
    fn test_nested_set_get() {
        let mut frame = KvpFrame::new();
        frame.set(
            slots::SX_TEMPLATE_CREDIT_FORMULA,
            KvpValue::Str("42.00".into()),
        );
        assert_eq!(
            frame.get_string(slots::SX_TEMPLATE_CREDIT_FORMULA),
            Some("42.00")
        );
    }

    #[test]
    fn test_remove() {
        let mut frame = KvpFrame::new();
        frame.set(slots::VOID_REASON, KvpValue::Str("entry error".into()));
        assert!(frame.remove(slots::VOID_REASON));
        assert_eq!(frame.get(slots::VOID_REASON), None);
        assert!(!frame.remove(slots::VOID_REASON));
    }

    #[test]
    fn test_missing_path_returns_none() {
        let frame = KvpFrame::new();
        assert_eq!(frame.get("sx-template/account"), None);
    }
}
