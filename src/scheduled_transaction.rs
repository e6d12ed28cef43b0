//! Scheduled-transaction template plus recurrence (§3 C10, §4.9): the
//! projection half of the core. `Book` owns the template transaction's
//! contents (it needs the same entity index as everything else); this
//! module owns the recurrence fields and the pure `get_next_instance`/
//! `get_instance_after` algebra.

use chrono::{Days, NaiveDate};

use crate::account::AccountId;
use crate::freq::FreqSpec;
use crate::temporal_state::{DeferredList, TemporalState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SxId(u32);

impl SxId {
    pub fn new(id: u32) -> Self {
        SxId(id)
    }
}

#[derive(Debug)]
pub struct ScheduledTransaction {
    id: SxId,
    name: String,
    freq: FreqSpec,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    last_occur_date: Option<NaiveDate>,
    num_occurrences_total: u32,
    num_occurrences_remain: u32,
    advance_create_days: u32,
    advance_remind_days: u32,
    auto_create: bool,
    auto_create_notify: bool,
    instance_num: u32,
    template_account: AccountId,
    deferred_list: DeferredList,
    dirty: bool,
}

impl ScheduledTransaction {
    pub fn new(id: SxId, name: &str, freq: FreqSpec, start_date: NaiveDate, template_account: AccountId) -> Self {
        ScheduledTransaction {
            id,
            name: name.to_string(),
            freq,
            start_date,
            end_date: None,
            last_occur_date: None,
            num_occurrences_total: 0,
            num_occurrences_remain: 0,
            advance_create_days: 0,
            advance_remind_days: 0,
            auto_create: false,
            auto_create_notify: false,
            instance_num: 0,
            template_account,
            deferred_list: DeferredList::new(),
            dirty: false,
        }
    }

    pub fn id(&self) -> SxId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn last_occur_date(&self) -> Option<NaiveDate> {
        self.last_occur_date
    }

    pub fn num_occurrences_total(&self) -> u32 {
        self.num_occurrences_total
    }

    pub fn num_occurrences_remain(&self) -> u32 {
        self.num_occurrences_remain
    }

    pub fn instance_num(&self) -> u32 {
        self.instance_num
    }

    pub fn set_instance_num(&mut self, n: u32) {
        self.instance_num = n;
        self.dirty = true;
    }

    pub fn template_account(&self) -> AccountId {
        self.template_account
    }

    pub fn deferred_list(&self) -> &DeferredList {
        &self.deferred_list
    }

    pub fn deferred_list_mut(&mut self) -> &mut DeferredList {
        &mut self.deferred_list
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_auto_create(&mut self, create: bool, notify: bool) {
        self.auto_create = create;
        self.auto_create_notify = notify;
        self.dirty = true;
    }

    pub fn auto_create(&self) -> bool {
        self.auto_create
    }

    pub fn auto_create_notify(&self) -> bool {
        self.auto_create_notify
    }

    pub fn set_advance_days(&mut self, create_days: u32, remind_days: u32) {
        self.advance_create_days = create_days;
        self.advance_remind_days = remind_days;
        self.dirty = true;
    }

    /// `xaccSchedXactionSetEndDate`: rejects (no mutation, just a warning)
    /// when `end < start_date`; equal is accepted (§8 boundary behavior).
    pub fn set_end_date(&mut self, end: NaiveDate) -> bool {
        if end < self.start_date {
            log::warn!("SX set_end_date: end date before start date, rejected");
            return false;
        }
        self.end_date = Some(end);
        self.dirty = true;
        true
    }

    pub fn set_num_occurrences(&mut self, n: u32) {
        self.num_occurrences_total = n;
        self.num_occurrences_remain = n;
        self.dirty = true;
    }

    /// `xaccSchedXactionSetRemOccur`. Open Question (spec §9): the source
    /// only `PWARN`s and leaves `num_occurrences_remain` untouched when
    /// `remain > total`
    /// (`examples/original_source/src/engine/SchedXaction.c`); we mirror
    /// that and reject rather than silently accepting an inconsistent
    /// state (see DESIGN.md).
    pub fn set_num_occurrences_remain(&mut self, remain: u32) -> bool {
        if remain > self.num_occurrences_total {
            log::warn!(
                "SX set_num_occurrences_remain: {remain} exceeds total {}, rejected",
                self.num_occurrences_total
            );
            return false;
        }
        self.num_occurrences_remain = remain;
        self.dirty = true;
        true
    }

    fn bounded(&self) -> bool {
        self.num_occurrences_total != 0
    }

    fn remaining(&self, state: Option<&TemporalState>) -> u32 {
        state
            .and_then(|s| s.num_occur_rem)
            .unwrap_or(self.num_occurrences_remain)
    }

    fn resolve_last(&self, override_date: Option<NaiveDate>, state: Option<&TemporalState>) -> NaiveDate {
        let last = override_date
            .or_else(|| state.and_then(|s| s.last_date))
            .or(self.last_occur_date);
        match last {
            Some(l) => l.max(self.start_date),
            None => self
                .start_date
                .checked_sub_days(Days::new(1))
                .unwrap_or(self.start_date),
        }
    }

    fn compute_instance(
        &self,
        override_date: Option<NaiveDate>,
        state: Option<&TemporalState>,
    ) -> Option<NaiveDate> {
        let last = self.resolve_last(override_date, state);
        let next = self.freq.next_instance(last);
        if let Some(end) = self.end_date {
            if next > end {
                return None;
            }
        }
        if self.bounded() && self.remaining(state) == 0 {
            return None;
        }
        Some(next)
    }

    /// `get_next_instance` (§4.9).
    pub fn get_next_instance(&self, state: Option<&TemporalState>) -> Option<NaiveDate> {
        self.compute_instance(None, state)
    }

    /// `get_instance_after` (§4.9).
    pub fn get_instance_after(&self, date: Option<NaiveDate>, state: Option<&TemporalState>) -> Option<NaiveDate> {
        self.compute_instance(date, state)
    }

    pub fn create_temporal_state(&self, gen: &crate::guid::GuidGenerator) -> TemporalState {
        TemporalState::new(
            gen,
            self.last_occur_date,
            if self.bounded() { Some(self.num_occurrences_remain) } else { None },
            self.instance_num,
        )
    }

    /// `gnc_sx_incr_temporal_state`: produces the *next* snapshot without
    /// mutating `self` — the live SX is only updated via `revert_to`.
    pub fn incr_temporal_state(&self, state: &TemporalState, gen: &crate::guid::GuidGenerator) -> TemporalState {
        let next_date = self.get_instance_after(None, Some(state));
        let remain = if self.bounded() {
            Some(state.num_occur_rem.unwrap_or(self.num_occurrences_remain).saturating_sub(1))
        } else {
            None
        };
        TemporalState::new(gen, next_date, remain, state.num_inst + 1)
    }

    /// `gnc_sx_revert_to_temporal_state`: writes a snapshot back into the
    /// live SX fields and marks it dirty.
    pub fn revert_to_temporal_state(&mut self, state: &TemporalState) {
        self.last_occur_date = state.last_date;
        if let Some(remain) = state.num_occur_rem {
            self.num_occurrences_remain = remain;
        }
        self.instance_num = state.num_inst;
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GuidGenerator;

    fn monthly_sx() -> ScheduledTransaction {
        ScheduledTransaction::new(
            SxId::new(1),
            "Rent",
            FreqSpec::Monthly { day: 15 },
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            AccountId::new(1),
        )
    }

    #[test]
    fn test_s5_next_instance_then_incr() {
        let gen = GuidGenerator::new();
        let sx = monthly_sx();
        assert_eq!(
            sx.get_next_instance(None),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        let state = sx.create_temporal_state(&gen);
        let state = sx.incr_temporal_state(&state, &gen);
        assert_eq!(state.last_date, Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert_eq!(
            sx.get_next_instance(Some(&state)),
            Some(NaiveDate::from_ymd_opt(2024, 2, 15).unwrap())
        );
    }

    #[test]
    fn test_s6_bounded_exhausted() {
        let mut sx = monthly_sx();
        sx.set_num_occurrences(2);
        sx.set_num_occurrences_remain(0);
        assert_eq!(sx.get_next_instance(None), None);
    }

    #[test]
    fn test_set_end_date_rejects_before_start() {
        let mut sx = monthly_sx();
        assert!(!sx.set_end_date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()));
        assert_eq!(sx.end_date(), None);
    }

    #[test]
    fn test_set_end_date_accepts_equal_to_start() {
        let mut sx = monthly_sx();
        assert!(sx.set_end_date(sx.start_date()));
        assert_eq!(sx.end_date(), Some(sx.start_date()));
    }

    #[test]
    fn test_set_rem_occur_rejects_over_total() {
        let mut sx = monthly_sx();
        sx.set_num_occurrences(2);
        assert!(!sx.set_num_occurrences_remain(5));
        assert_eq!(sx.num_occurrences_remain(), 2);
    }
}
