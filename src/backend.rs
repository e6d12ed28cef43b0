//! The back-end collaborator contract (§6): `begin`/`commit`/`rollback`
//! hooks invoked synchronously inside the edit protocol, plus the two
//! error codes a back-end can use to veto a commit or rollback.
//! Persistence itself is explicitly out of scope (§1); this crate ships
//! only the trait and a no-op implementation good enough to drive the
//! edit protocol without a real store attached.

use crate::guid::Guid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendError {
    /// Another session already changed this transaction.
    Modified,
    /// Another session already deleted this transaction.
    ModDestroy,
}

pub trait Backend: std::fmt::Debug {
    fn begin(&mut self, trans: Guid) {
        let _ = trans;
    }

    fn commit(&mut self, trans: Guid) -> Result<(), BackendError> {
        let _ = trans;
        Ok(())
    }

    fn rollback(&mut self, trans: Guid) -> Result<(), BackendError> {
        let _ = trans;
        Ok(())
    }
}

/// The default back-end: no persistence, every hook succeeds. Suitable
/// whenever a caller only needs the in-memory edit protocol.
#[derive(Debug, Default)]
pub struct NullBackend;

impl Backend for NullBackend {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::GuidGenerator;

    #[test]
    fn test_null_backend_always_succeeds() {
        let gen = GuidGenerator::new();
        let mut backend = NullBackend;
        let id = gen.new_guid();
        backend.begin(id);
        assert!(backend.commit(id).is_ok());
        assert!(backend.rollback(id).is_ok());
    }
}
