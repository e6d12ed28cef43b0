//! Stand-in for GnuCash's GUID/entity-table layer (§6). Real GUIDs are
//! 128-bit random identifiers minted by a persistence backend; this core
//! has no backend; spec §1's Non-goals explicitly exclude "GUID minting
//! beyond a stand-in", so a monotonic per-`Book` counter is sufficient —
//! it only has to be stable and unique for the lifetime of one `Book`.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid(u64);

impl Guid {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Mints unique `Guid`s for one `Book`. Not `Clone`: every `Book` owns
/// exactly one, the identity-index analogue of GnuCash's per-session
/// entity table.
#[derive(Debug, Default)]
pub struct GuidGenerator {
    next: Cell<u64>,
}

impl GuidGenerator {
    pub fn new() -> Self {
        Self { next: Cell::new(1) }
    }

    pub fn new_guid(&self) -> Guid {
        let id = self.next.get();
        self.next.set(id + 1);
        Guid(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guids_are_unique() {
        let gen = GuidGenerator::new();
        let a = gen.new_guid();
        let b = gen.new_guid();
        assert_ne!(a, b);
    }
}
