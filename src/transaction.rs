//! Ordered collection of splits sharing a posting date and currency
//! (§3 C6). The edit-level state machine itself (§4.3) is orchestrated
//! by `Book`, which alone has the cross-entity data (accounts, other
//! transactions) the protocol needs; this module owns the data and the
//! snapshot shape.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::account::AccountId;
use crate::guid::Guid;
use crate::kvp::KvpFrame;
use crate::commodity::Commodity;
use crate::split::Split;

/// `orig`, redesigned per §9 "Rollback snapshot": a typed record of prior
/// scalar fields plus split snapshots addressed by identity, instead of a
/// shallow-duped shadow transaction sharing GUIDs with the live data.
/// Rollback restores by identity directly — no brute-force splice is
/// needed, since added/removed splits are just set differences against
/// this snapshot's split-id set (see `Book::rollback_transaction`).
#[derive(Debug, Clone)]
pub struct TransactionSnapshot {
    pub num: String,
    pub description: String,
    pub currency: Option<Commodity>,
    pub date_posted: Option<DateTime<Utc>>,
    pub date_entered: Option<DateTime<Utc>>,
    pub kvp: KvpFrame,
    pub version: u64,
    pub splits: Vec<SplitSnapshot>,
}

#[derive(Debug, Clone)]
pub struct SplitSnapshot {
    pub id: Guid,
    pub account: Option<AccountId>,
    pub memo: String,
    pub action: String,
    pub amount: crate::numeric::Numeric,
    pub value: crate::numeric::Numeric,
    pub reconciled: crate::split::ReconcileState,
    pub date_reconciled: Option<DateTime<Utc>>,
    pub kvp: KvpFrame,
}

impl From<&Split> for SplitSnapshot {
    fn from(s: &Split) -> Self {
        SplitSnapshot {
            id: s.id(),
            account: s.account(),
            memo: s.memo().to_string(),
            action: s.action().to_string(),
            amount: s.amount(),
            value: s.value(),
            reconciled: s.reconciled(),
            date_reconciled: s.date_reconciled(),
            kvp: s.kvp().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    id: Guid,
    num: String,
    description: String,
    currency: Option<Commodity>,
    splits: Vec<Split>,
    date_posted: Option<DateTime<Utc>>,
    date_entered: Option<DateTime<Utc>>,
    edit_level: u32,
    do_free: bool,
    orig: Option<TransactionSnapshot>,
    version: u64,
    version_check: u64,
    kvp: KvpFrame,
    /// Accounts touched by mutations during the current open edit, so
    /// `commit` can emit one coalesced event per affected account even
    /// for accounts a split was removed from. Scratch state, not part of
    /// the persisted shape and never snapshotted into `orig`.
    touched_accounts: HashSet<AccountId>,
}

impl Transaction {
    pub fn new(id: Guid) -> Self {
        Transaction {
            id,
            num: String::new(),
            description: String::new(),
            currency: None,
            splits: Vec::new(),
            date_posted: None,
            date_entered: None,
            edit_level: 0,
            do_free: false,
            orig: None,
            version: 0,
            version_check: 0,
            kvp: KvpFrame::new(),
            touched_accounts: HashSet::new(),
        }
    }

    pub fn mark_account_touched(&mut self, account: AccountId) {
        self.touched_accounts.insert(account);
    }

    pub fn take_touched_accounts(&mut self) -> HashSet<AccountId> {
        std::mem::take(&mut self.touched_accounts)
    }

    pub fn id(&self) -> Guid {
        self.id
    }

    pub fn num(&self) -> &str {
        &self.num
    }

    pub fn set_num(&mut self, num: &str) {
        self.num = num.to_string();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn currency(&self) -> Option<Commodity> {
        self.currency
    }

    pub fn set_currency(&mut self, currency: Option<Commodity>) {
        self.currency = currency;
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn splits_mut(&mut self) -> &mut Vec<Split> {
        &mut self.splits
    }

    pub fn date_posted(&self) -> Option<DateTime<Utc>> {
        self.date_posted
    }

    pub fn set_date_posted(&mut self, date: Option<DateTime<Utc>>) {
        self.date_posted = date;
    }

    pub fn date_entered(&self) -> Option<DateTime<Utc>> {
        self.date_entered
    }

    pub fn set_date_entered(&mut self, date: Option<DateTime<Utc>>) {
        self.date_entered = date;
    }

    pub fn edit_level(&self) -> u32 {
        self.edit_level
    }

    pub fn is_open(&self) -> bool {
        self.edit_level > 0
    }

    pub fn do_free(&self) -> bool {
        self.do_free
    }

    pub fn set_do_free(&mut self, value: bool) {
        self.do_free = value;
    }

    pub fn orig(&self) -> Option<&TransactionSnapshot> {
        self.orig.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn version_check(&self) -> u64 {
        self.version_check
    }

    pub fn kvp(&self) -> &KvpFrame {
        &self.kvp
    }

    pub fn kvp_mut(&mut self) -> &mut KvpFrame {
        &mut self.kvp
    }

    /// `begin` transition (§4.3): CLOSED -> OPEN(1) captures `orig`;
    /// OPEN(n) -> OPEN(n+1) is just the counter bump.
    pub fn begin_edit(&mut self) {
        if self.edit_level == 0 {
            self.orig = Some(TransactionSnapshot {
                num: self.num.clone(),
                description: self.description.clone(),
                currency: self.currency,
                date_posted: self.date_posted,
                date_entered: self.date_entered,
                kvp: self.kvp.clone(),
                version: self.version,
                splits: self.splits.iter().map(SplitSnapshot::from).collect(),
            });
        }
        self.edit_level += 1;
    }

    /// Decrement the edit level; returns the level after decrementing.
    /// Imbalanced begin/commit/rollback pairs are reset to 0 with a
    /// warning rather than underflowing (§5 "Resource discipline").
    pub fn decrement_edit_level(&mut self) -> u32 {
        if self.edit_level == 0 {
            log::warn!("edit level underflow on transaction, resetting to 0");
            return 0;
        }
        self.edit_level -= 1;
        self.edit_level
    }

    pub fn clear_orig(&mut self) {
        self.orig = None;
    }

    pub fn append_split(&mut self, split: Split) {
        self.splits.push(split);
    }

    pub fn remove_split_by_id(&mut self, id: Guid) -> Option<Split> {
        let pos = self.splits.iter().position(|s| s.id() == id)?;
        Some(self.splits.remove(pos))
    }

    pub fn find_split(&self, id: Guid) -> Option<&Split> {
        self.splits.iter().find(|s| s.id() == id)
    }

    pub fn find_split_mut(&mut self, id: Guid) -> Option<&mut Split> {
        self.splits.iter_mut().find(|s| s.id() == id)
    }
}

/// `xaccTransOrder` (§4.4): the total order used to place transactions in
/// accounts and ledgers. `num_a`/`num_b` are `atoi(num)`-style parses
/// (invalid text parses as 0, per source).
pub fn trans_order(
    a: (Option<DateTime<Utc>>, &str, Option<DateTime<Utc>>, &str, Guid),
    b: (Option<DateTime<Utc>>, &str, Option<DateTime<Utc>>, &str, Guid),
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    let (a_posted, a_num, a_entered, a_desc, a_guid) = a;
    let (b_posted, b_num, b_entered, b_desc, b_guid) = b;

    match a_posted.cmp(&b_posted) {
        Ordering::Equal => {}
        other => return other,
    }

    let a_atoi: i64 = a_num.trim().parse().unwrap_or(0);
    let b_atoi: i64 = b_num.trim().parse().unwrap_or(0);
    match a_atoi.cmp(&b_atoi) {
        Ordering::Equal => {}
        other => return other,
    }

    match a_entered.cmp(&b_entered) {
        Ordering::Equal => {}
        other => return other,
    }

    // null-safe: empty description sorts before non-empty, matching the
    // source's "null sorts before non-null" rule for a null-safe strcmp.
    match (a_desc.is_empty(), b_desc.is_empty()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    match a_desc.cmp(b_desc) {
        Ordering::Equal => {}
        other => return other,
    }

    a_guid.cmp(&b_guid)
}

/// The internal split sort applied at commit (§4.4): debits (value >= 0)
/// before credits (value < 0), stable within each group.
pub fn sort_splits_for_commit(splits: &mut [Split]) {
    splits.sort_by_key(|s| s.value().negative_p());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GuidGenerator;

    #[test]
    fn test_begin_edit_captures_snapshot_once() {
        let gen = GuidGenerator::new();
        let mut t = Transaction::new(gen.new_guid());
        t.set_description("first");
        t.begin_edit();
        t.set_description("second");
        t.begin_edit();
        assert_eq!(t.edit_level(), 2);
        assert_eq!(t.orig().unwrap().description, "first");
    }

    #[test]
    fn test_trans_order_by_date_posted() {
        use chrono::TimeZone;
        let gen = GuidGenerator::new();
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let ordering = trans_order(
            (Some(earlier), "", None, "", gen.new_guid()),
            (Some(later), "", None, "", gen.new_guid()),
        );
        assert_eq!(ordering, std::cmp::Ordering::Less);
    }

    #[test]
    fn test_sort_splits_debits_first() {
        let gen = GuidGenerator::new();
        let mut credit = Split::new(gen.new_guid());
        credit.set_value(crate::numeric::Numeric::create(-5, 1), 1, true);
        let mut debit = Split::new(gen.new_guid());
        debit.set_value(crate::numeric::Numeric::create(5, 1), 1, true);

        let mut splits = vec![credit.clone(), debit.clone()];
        sort_splits_for_commit(&mut splits);
        assert!(splits[0].value().positive_p());
        assert!(splits[1].value().negative_p());
    }
}
