//! Immutable projection snapshot for a scheduled transaction (§3 C11,
//! §4.9): `{last_date, num_occur_rem, num_inst}`, used to walk future
//! instances without mutating the live `ScheduledTransaction` until an
//! explicit `revert_to` call.

use chrono::NaiveDate;

use crate::guid::{Guid, GuidGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalState {
    id: Guid,
    pub last_date: Option<NaiveDate>,
    pub num_occur_rem: Option<u32>,
    pub num_inst: u32,
}

impl TemporalState {
    pub fn new(
        gen: &GuidGenerator,
        last_date: Option<NaiveDate>,
        num_occur_rem: Option<u32>,
        num_inst: u32,
    ) -> Self {
        TemporalState { id: gen.new_guid(), last_date, num_occur_rem, num_inst }
    }

    pub fn id(&self) -> Guid {
        self.id
    }
}

/// Date-sorted list of deferred temporal-state snapshots (§3, §4.9).
/// Ascending by `last_date`; a state with no `last_date` sorts after
/// every dated one (spec's explicit tie-break, pinned down from
/// `_temporal_state_data_cmp` in `examples/original_source/src/engine/
/// SchedXaction.c`, since spec §4.9 names the comparator but not this
/// edge).
#[derive(Debug, Default)]
pub struct DeferredList {
    states: Vec<TemporalState>,
}

fn compare_last_date(a: Option<NaiveDate>, b: Option<NaiveDate>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl DeferredList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: TemporalState) {
        let pos = self
            .states
            .binary_search_by(|existing| compare_last_date(existing.last_date, state.last_date))
            .unwrap_or_else(|i| i);
        self.states.insert(pos, state);
    }

    pub fn remove(&mut self, id: Guid) -> Option<TemporalState> {
        let pos = self.states.iter().position(|s| s.id() == id)?;
        Some(self.states.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TemporalState> {
        self.states.iter()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_ascending_order() {
        let gen = GuidGenerator::new();
        let mut list = DeferredList::new();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        list.insert(TemporalState::new(&gen, Some(d1), None, 0));
        list.insert(TemporalState::new(&gen, Some(d2), None, 0));
        let dates: Vec<_> = list.iter().map(|s| s.last_date).collect();
        assert_eq!(dates, vec![Some(d2), Some(d1)]);
    }

    #[test]
    fn test_none_sorts_after_dated() {
        let gen = GuidGenerator::new();
        let mut list = DeferredList::new();
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        list.insert(TemporalState::new(&gen, None, None, 0));
        list.insert(TemporalState::new(&gen, Some(d1), None, 0));
        let dates: Vec<_> = list.iter().map(|s| s.last_date).collect();
        assert_eq!(dates, vec![Some(d1), None]);
    }

    #[test]
    fn test_remove_by_identity() {
        let gen = GuidGenerator::new();
        let mut list = DeferredList::new();
        let state = TemporalState::new(&gen, None, None, 0);
        let id = state.id();
        list.insert(state);
        assert!(list.remove(id).is_some());
        assert!(list.is_empty());
    }
}
