//! In-memory transactional core for a double-entry accounting engine:
//! exact rational arithmetic, a `Split`/`Transaction` edit-commit-rollback
//! protocol enforcing double-entry balance, and a scheduled-transaction
//! recurrence engine projecting future instances of a template.
//!
//! `Book` (see [`book`]) is the entry point: it owns every account and
//! transaction by identity and mediates every mutation through the edit
//! protocol described in the crate's design notes.

pub mod account;
pub mod backend;
pub mod book;
pub mod commodity;
pub mod errors;
pub mod events;
pub mod freq;
pub mod guid;
pub mod interner;
pub mod journal;
pub mod kvp;
pub mod numeric;
pub mod scheduled_transaction;
pub mod split;
pub mod temporal_state;
pub mod transaction;

pub use account::{Account, AccountId};
pub use book::{Book, BalanceMode, TemplateInfo, TemplateSplitInfo};
pub use commodity::{Commodity, CommodityId};
pub use errors::{LedgerError, Result};
pub use guid::Guid;
pub use numeric::{Denom, Numeric, Rounding};
pub use scheduled_transaction::{ScheduledTransaction, SxId};
pub use split::{GainsStatus, ReconcileState, Split};
pub use transaction::Transaction;
