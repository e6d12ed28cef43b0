//! One leg of a transaction (§3 C5, §4.2). Splits live inside the
//! `Vec<Split>` their parent `Transaction` owns (§9 "Cyclic parent/split
//! references" redesign — Transaction uniquely owns its splits; the
//! `parent`/`account`/`lot` fields below are non-owning handles resolved
//! through `Book`'s identity index, never `Rc`/`Weak`).

use chrono::{DateTime, Utc};

use crate::account::AccountId;
use crate::guid::Guid;
use crate::kvp::{slots, KvpFrame, KvpValue};
use crate::numeric::{Denom, Numeric, Rounding};

/// Smallest denominator `xaccSplitGetSharePrice` rounds computed (not
/// stored) share prices to when neither operand pins a better one.
pub const PRICE_SIGFIGS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    NotReconciled,
    Cleared,
    YesReconciled,
    Frozen,
    Voided,
}

impl ReconcileState {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'n' | 'N' => Some(ReconcileState::NotReconciled),
            'c' | 'C' => Some(ReconcileState::Cleared),
            'y' | 'Y' => Some(ReconcileState::YesReconciled),
            'f' | 'F' => Some(ReconcileState::Frozen),
            'v' | 'V' => Some(ReconcileState::Voided),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            ReconcileState::NotReconciled => 'n',
            ReconcileState::Cleared => 'c',
            ReconcileState::YesReconciled => 'y',
            ReconcileState::Frozen => 'f',
            ReconcileState::Voided => 'v',
        }
    }
}

/// Explicit state machine replacing the source's GAINS/VDIRTY/DATE_DIRTY
/// bitset (§9 "Gains linkage" redesign note).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainsStatus {
    Unknown,
    NotGains { value_dirty: bool, date_dirty: bool },
    GainsOf(Guid),
}

impl Default for GainsStatus {
    fn default() -> Self {
        GainsStatus::Unknown
    }
}

#[derive(Debug, Clone)]
pub struct Split {
    id: Guid,
    parent: Option<Guid>,
    account: Option<AccountId>,
    lot: Option<Guid>,
    memo: String,
    action: String,
    reconciled: ReconcileState,
    date_reconciled: Option<DateTime<Utc>>,
    amount: Numeric,
    value: Numeric,
    balance: Numeric,
    cleared_balance: Numeric,
    reconciled_balance: Numeric,
    kvp: KvpFrame,
    gains_status: GainsStatus,
    gains_peer: Option<Guid>,
}

fn warn_if_closed(is_open: bool, what: &str) {
    if !is_open {
        log::warn!("split mutator '{what}' called outside an open edit; proceeding anyway");
    }
}

impl Split {
    pub fn new(id: Guid) -> Self {
        Split {
            id,
            parent: None,
            account: None,
            lot: None,
            memo: String::new(),
            action: String::new(),
            reconciled: ReconcileState::NotReconciled,
            date_reconciled: None,
            amount: Numeric::zero(),
            value: Numeric::zero(),
            balance: Numeric::zero(),
            cleared_balance: Numeric::zero(),
            reconciled_balance: Numeric::zero(),
            kvp: KvpFrame::new(),
            gains_status: GainsStatus::Unknown,
            gains_peer: None,
        }
    }

    pub fn id(&self) -> Guid {
        self.id
    }

    pub fn parent(&self) -> Option<Guid> {
        self.parent
    }

    pub fn set_parent(&mut self, parent: Option<Guid>) {
        self.parent = parent;
    }

    pub fn account(&self) -> Option<AccountId> {
        self.account
    }

    pub fn set_account(&mut self, account: Option<AccountId>) {
        self.account = account;
    }

    pub fn lot(&self) -> Option<Guid> {
        self.lot
    }

    pub fn memo(&self) -> &str {
        &self.memo
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn set_memo(&mut self, memo: &str) {
        self.memo = memo.to_string();
    }

    pub fn set_action(&mut self, action: &str) {
        self.action = action.to_string();
    }

    pub fn reconciled(&self) -> ReconcileState {
        self.reconciled
    }

    pub fn date_reconciled(&self) -> Option<DateTime<Utc>> {
        self.date_reconciled
    }

    pub fn amount(&self) -> Numeric {
        self.amount
    }

    pub fn value(&self) -> Numeric {
        self.value
    }

    pub fn balance(&self) -> Numeric {
        self.balance
    }

    pub fn cleared_balance(&self) -> Numeric {
        self.cleared_balance
    }

    pub fn reconciled_balance(&self) -> Numeric {
        self.reconciled_balance
    }

    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }

    pub fn kvp_mut(&mut self) -> &mut KvpFrame {
        &mut self.kvp
    }

    pub fn gains_status(&self) -> GainsStatus {
        self.gains_status
    }

    pub fn set_gains_status(&mut self, status: GainsStatus) {
        self.gains_status = status;
    }

    pub fn gains_peer(&self) -> Option<Guid> {
        self.gains_peer
    }

    pub fn set_gains_peer(&mut self, peer: Option<Guid>) {
        self.gains_peer = peer;
    }

    pub fn apply_balances(&mut self, balance: Numeric, cleared: Numeric, reconciled: Numeric) {
        self.balance = balance;
        self.cleared_balance = cleared;
        self.reconciled_balance = reconciled;
    }

    /// `xaccSplitSetAmount` (§4.2): stores `amount` rounded to the
    /// account's fraction and marks the gains value dirty.
    pub fn set_amount(&mut self, n: Numeric, account_fraction: u64, is_open: bool) {
        warn_if_closed(is_open, "set_amount");
        match n.convert(Denom::Fixed(account_fraction), Rounding::Round) {
            Ok(v) => self.amount = v,
            Err(e) => log::warn!("set_amount: {e}"),
        }
        self.mark_gains_value_dirty();
    }

    /// `xaccSplitSetValue`.
    pub fn set_value(&mut self, n: Numeric, currency_fraction: u64, is_open: bool) {
        warn_if_closed(is_open, "set_value");
        match n.convert(Denom::Fixed(currency_fraction), Rounding::Round) {
            Ok(v) => self.value = v,
            Err(e) => log::warn!("set_value: {e}"),
        }
        self.mark_gains_value_dirty();
    }

    /// `xaccSplitSetSharePrice`: `value = amount * price`.
    pub fn set_share_price(&mut self, price: Numeric, currency_fraction: u64, is_open: bool) {
        warn_if_closed(is_open, "set_share_price");
        match self.amount.mul(&price, Denom::Fixed(currency_fraction), Rounding::Round) {
            Ok(v) => self.value = v,
            Err(e) => log::warn!("set_share_price: {e}"),
        }
        self.mark_gains_value_dirty();
    }

    /// `xaccSplitSetSharePriceAndAmount`: amount then value atomically.
    pub fn set_share_price_and_amount(
        &mut self,
        price: Numeric,
        amount: Numeric,
        account_fraction: u64,
        currency_fraction: u64,
        is_open: bool,
    ) {
        self.set_amount(amount, account_fraction, is_open);
        self.set_share_price(price, currency_fraction, is_open);
    }

    /// `xaccSplitSetBaseValue` (§4.2): dispatch by which commodity `n` is
    /// denominated in.
    pub fn set_base_value(
        &mut self,
        n: Numeric,
        base_matches_currency: bool,
        base_matches_account: bool,
        currency_fraction: u64,
        account_fraction: u64,
        has_account: bool,
        strict_mode: bool,
        is_open: bool,
    ) {
        warn_if_closed(is_open, "set_base_value");
        if base_matches_currency {
            self.set_value(n, currency_fraction, is_open);
        } else if base_matches_account {
            self.set_amount(n, account_fraction, is_open);
        } else if !has_account && !strict_mode {
            match n.convert(Denom::Fixed(currency_fraction), Rounding::Round) {
                Ok(v) => {
                    self.value = v;
                    self.amount = v;
                }
                Err(e) => log::warn!("set_base_value: {e}"),
            }
        } else {
            log::warn!("set_base_value: commodity does not match currency or account, ignored");
        }
        self.mark_gains_value_dirty();
    }

    /// `xaccSplitSetReconcile`: rejects anything outside {N,C,Y,F,V}.
    pub fn set_reconcile(&mut self, c: char, is_open: bool) -> bool {
        warn_if_closed(is_open, "set_reconcile");
        match ReconcileState::from_char(c) {
            Some(state) => {
                let changed = state != self.reconciled;
                self.reconciled = state;
                changed
            }
            None => {
                log::warn!("'{c}' is not a valid reconcile flag, ignoring set_reconcile");
                false
            }
        }
    }

    pub fn set_date_reconciled(&mut self, date: Option<DateTime<Utc>>) {
        self.date_reconciled = date;
    }

    /// `xaccSplitMakeStockSplit`.
    pub fn make_stock_split(&mut self) {
        self.value = Numeric::zero();
        self.kvp.set(
            slots::SPLIT_TYPE,
            KvpValue::Str(slots::SPLIT_TYPE_STOCK_SPLIT.to_string()),
        );
    }

    pub fn is_stock_split(&self) -> bool {
        self.kvp.get_string(slots::SPLIT_TYPE) == Some(slots::SPLIT_TYPE_STOCK_SPLIT)
    }

    /// `xaccSplitGetSharePrice`: 1/1 when both amount and value are zero
    /// (undetermined price, treat as par), 0/1 when amount is zero but
    /// value is not (degenerate), else `value / amount` rounded to
    /// `PRICE_SIGFIGS` significant figures.
    pub fn share_price(&self) -> Numeric {
        if self.amount.zero_p() {
            return if self.value.zero_p() {
                Numeric::create(1, 1)
            } else {
                Numeric::create(0, 1)
            };
        }
        self.value
            .div(&self.amount, Denom::SigFigs(PRICE_SIGFIGS), Rounding::Round)
            .unwrap_or_else(|_| Numeric::create(0, 1))
    }

    fn mark_gains_value_dirty(&mut self) {
        self.gains_status = match self.gains_status {
            GainsStatus::GainsOf(source) => GainsStatus::GainsOf(source),
            GainsStatus::NotGains { date_dirty, .. } => {
                GainsStatus::NotGains { value_dirty: true, date_dirty }
            }
            GainsStatus::Unknown => GainsStatus::NotGains { value_dirty: true, date_dirty: true },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GuidGenerator;

    fn new_split() -> Split {
        let gen = GuidGenerator::new();
        Split::new(gen.new_guid())
    }

    #[test]
    fn test_set_amount_rounds_to_account_fraction() {
        let mut s = new_split();
        s.set_amount(Numeric::create(1, 3), 100, true);
        assert_eq!(s.amount(), Numeric::create(33, 100));
    }

    #[test]
    fn test_set_share_price_computes_value() {
        let mut s = new_split();
        s.set_amount(Numeric::create(10, 1), 1, true);
        s.set_share_price(Numeric::create(150, 100), 100, true);
        assert_eq!(s.value(), Numeric::create(1500, 100));
    }

    #[test]
    fn test_set_reconcile_rejects_bad_flag() {
        let mut s = new_split();
        assert!(!s.set_reconcile('Z', true));
        assert_eq!(s.reconciled(), ReconcileState::NotReconciled);
    }

    #[test]
    fn test_set_reconcile_reports_change() {
        let mut s = new_split();
        assert!(s.set_reconcile('y', true));
        assert!(!s.set_reconcile('y', true));
    }

    #[test]
    fn test_make_stock_split() {
        let mut s = new_split();
        s.set_value(Numeric::create(10, 100), 100, true);
        s.make_stock_split();
        assert!(s.value().zero_p());
        assert!(s.is_stock_split());
    }

    #[test]
    fn test_share_price_sentinels() {
        let s = new_split();
        assert_eq!(s.share_price(), Numeric::create(1, 1));

        let mut s2 = new_split();
        s2.set_value(Numeric::create(5, 100), 100, true);
        assert_eq!(s2.share_price(), Numeric::create(0, 1));
    }
}
