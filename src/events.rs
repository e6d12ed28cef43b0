//! Event bus (§5, §6): `commit` is the only place events are generated,
//! coalesced so each entity is reported at most once. spec's Non-goals
//! keep this a minimal in-process log rather than a real subscriber
//! registry — a caller wanting push notification would drain
//! `Book::drain_events` after each commit.

use crate::guid::Guid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Account,
    Transaction,
    Lot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Modify,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub entity: Guid,
    pub kind: EntityKind,
    pub event: EventKind,
}

/// Accumulates events during a commit and coalesces duplicates before
/// they're appended to the book's event log, satisfying §5's "observers
/// see each entity at most once per commit" guarantee.
#[derive(Debug, Default)]
pub struct EventBatch {
    events: Vec<Event>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: Guid, entity_kind: EntityKind, event: EventKind) {
        if self
            .events
            .iter()
            .any(|e| e.entity == entity && e.kind == entity_kind)
        {
            return;
        }
        self.events.push(Event { entity, kind: entity_kind, event });
    }

    pub fn into_vec(self) -> Vec<Event> {
        self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GuidGenerator;

    #[test]
    fn test_coalesces_duplicate_entity() {
        let gen = GuidGenerator::new();
        let id = gen.new_guid();
        let mut batch = EventBatch::new();
        batch.push(id, EntityKind::Account, EventKind::Modify);
        batch.push(id, EntityKind::Account, EventKind::Modify);
        assert_eq!(batch.into_vec().len(), 1);
    }
}
